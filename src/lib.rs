// Cinder - CSS asset pipeline for modern web bundlers
//
// One CssAsset per tracked source file: a cheap textual pre-check gates
// the structural walk that extracts @import dependencies and rewrites
// url() references to content-addressed names, an async transform
// pipeline mutates the dirty-tracked document, and generation emits the
// final CSS plus an optional CSS-module export object.

pub mod cli;
pub mod core;
pub mod css;
pub mod transforms;
pub mod utils;

pub use crate::core::models::{Asset, DependencyRecord, Generated};
pub use crate::core::transform::{Transform, TransformPipeline};
pub use crate::css::{CssAsset, Document};
