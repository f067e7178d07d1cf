pub mod adjust;
pub mod loader;
pub mod resize;
pub mod writer;
