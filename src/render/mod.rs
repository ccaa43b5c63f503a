//! GPU buffer management and draw submission

pub mod backend;
pub mod wgpu_backend;

pub use backend::{BufferHandle, RenderBackend, HeadlessBackend};
pub use wgpu_backend::WgpuBackend;
