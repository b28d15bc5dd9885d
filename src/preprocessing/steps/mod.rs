//! Individual pixel transforms. Each takes a raster and returns a new one.

pub mod contrast;
pub mod grayscale;
pub mod scale;
pub mod threshold;
