//! rlod - quadtree terrain engine with view-dependent level of detail

pub mod core;
pub mod math;
pub mod render;
pub mod terrain;
