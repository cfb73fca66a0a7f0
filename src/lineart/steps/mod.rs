//! Individual pipeline stages, in execution order

pub mod resize;
pub mod grayscale;
pub mod smooth;
pub mod binarize;
pub mod clean;
