// Built-in transform steps for the asset pipeline
pub mod css_modules;
pub mod minify;

pub use css_modules::CssModulesTransform;
pub use minify::MinifyTransform;
