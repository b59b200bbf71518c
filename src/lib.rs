pub mod color;
pub mod compositor;
pub mod config;
pub mod curve;
pub mod document;
pub mod math;
pub mod rand;
pub mod sampler;
pub mod screen;
pub mod texture;
