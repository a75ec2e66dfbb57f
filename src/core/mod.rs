// Core domain: asset records and the transform pipeline
pub mod models;
pub mod transform;
