//! wgpu implementation of the terrain render backend
//!
//! Buffers are created eagerly on upload; draw calls are recorded during
//! `update`/`render` and replayed into a caller-owned render pass with
//! `encode`. Pipeline and shader setup stay outside this crate.

use std::collections::HashMap;
use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::terrain::patch::Vertex;
use super::backend::{BufferHandle, RenderBackend};

struct DrawCall {
    vertices: BufferHandle,
    indices: BufferHandle,
    index_count: u32,
}

/// Render backend backed by a wgpu device
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    buffers: HashMap<u32, wgpu::Buffer>,
    next_handle: u32,
    draws: Vec<DrawCall>,
}

impl WgpuBackend {
    pub fn new(device: Arc<wgpu::Device>) -> Self {
        Self {
            device,
            buffers: HashMap::new(),
            next_handle: 0,
            draws: Vec::new(),
        }
    }

    /// Vertex buffer layout matching [`Vertex`] (position + normal)
    pub fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
            0 => Float32x3,
            1 => Float32x3,
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }

    /// Drop all recorded draw calls; call once at the start of each frame
    pub fn begin_frame(&mut self) {
        self.draws.clear();
    }

    /// Replay the recorded draw calls into a render pass.
    ///
    /// The caller is responsible for having bound a pipeline whose vertex
    /// state matches [`Self::vertex_layout`].
    pub fn encode<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        for call in &self.draws {
            let (Some(vb), Some(ib)) = (
                self.buffers.get(&call.vertices.0),
                self.buffers.get(&call.indices.0),
            ) else {
                log::warn!("draw references a released buffer, skipping");
                continue;
            };
            pass.set_vertex_buffer(0, vb.slice(..));
            pass.set_index_buffer(ib.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..call.index_count, 0, 0..1);
        }
    }

    /// Number of live GPU buffers
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    fn insert(&mut self, buffer: wgpu::Buffer) -> BufferHandle {
        self.next_handle += 1;
        self.buffers.insert(self.next_handle, buffer);
        BufferHandle(self.next_handle)
    }
}

impl RenderBackend for WgpuBackend {
    fn upload_vertices(&mut self, vertices: &[Vertex]) -> Option<BufferHandle> {
        if vertices.is_empty() {
            log::warn!("refusing to upload an empty vertex buffer");
            return None;
        }
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("terrain_patch_vertices"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        Some(self.insert(buffer))
    }

    fn upload_indices(&mut self, indices: &[u32]) -> Option<BufferHandle> {
        if indices.is_empty() {
            log::warn!("refusing to upload an empty index buffer");
            return None;
        }
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("terrain_patch_indices"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        Some(self.insert(buffer))
    }

    fn release(&mut self, handle: BufferHandle) {
        if let Some(buffer) = self.buffers.remove(&handle.0) {
            buffer.destroy();
        } else {
            log::warn!("release of unknown buffer handle {:?}", handle);
        }
    }

    fn draw_indexed(&mut self, vertices: BufferHandle, indices: BufferHandle, index_count: u32) {
        self.draws.push(DrawCall {
            vertices,
            indices,
            index_count,
        });
    }
}
