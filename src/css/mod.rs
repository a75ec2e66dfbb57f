// CSS asset handling: structural parsing, the dirty-tracked document
// model, value expressions, and the asset lifecycle
pub mod asset;
pub mod document;
pub mod parser;
pub mod value;

pub use asset::CssAsset;
pub use document::Document;
