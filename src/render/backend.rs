//! Abstract buffer upload and indexed-draw interface
//!
//! The terrain traversal commits and releases GPU buffers while it walks
//! the patch hierarchy, so it talks to the graphics API through this
//! trait rather than a concrete device. Any backend offering buffer
//! upload plus indexed draws suffices.

use std::collections::HashSet;

use crate::terrain::patch::Vertex;

/// Opaque handle to a committed GPU buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// Buffer upload and draw capability consumed by the terrain models.
///
/// Uploads return `None` when the backend cannot allocate; callers treat
/// the buffer as not committed and skip drawing it rather than failing
/// the frame.
pub trait RenderBackend {
    /// Upload a vertex array and return its handle
    fn upload_vertices(&mut self, vertices: &[Vertex]) -> Option<BufferHandle>;

    /// Upload an index array and return its handle
    fn upload_indices(&mut self, indices: &[u32]) -> Option<BufferHandle>;

    /// Free a previously uploaded buffer
    fn release(&mut self, handle: BufferHandle);

    /// Record an indexed draw over an uploaded vertex/index buffer pair
    fn draw_indexed(&mut self, vertices: BufferHandle, indices: BufferHandle, index_count: u32);
}

/// A recorded draw call (headless backend bookkeeping)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawRecord {
    pub vertices: BufferHandle,
    pub indices: BufferHandle,
    pub index_count: u32,
}

/// Backend that tracks buffer lifecycle without a GPU.
///
/// Used by unit tests to verify commit/release behavior and by tooling
/// that wants to run a selection pass without a graphics device.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_handle: u32,
    live: HashSet<BufferHandle>,
    /// Total number of successful uploads
    pub uploads: u32,
    /// Total number of releases
    pub releases: u32,
    /// Draw calls recorded since the last `clear_draws`
    pub draws: Vec<DrawRecord>,
    /// When true, every upload fails (simulates an unavailable backend)
    pub fail_uploads: bool,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> Option<BufferHandle> {
        if self.fail_uploads {
            return None;
        }
        self.next_handle += 1;
        let handle = BufferHandle(self.next_handle);
        self.live.insert(handle);
        self.uploads += 1;
        Some(handle)
    }

    /// Number of buffers currently allocated and not released
    pub fn live_buffers(&self) -> usize {
        self.live.len()
    }

    /// Whether a handle refers to a live buffer
    pub fn is_live(&self, handle: BufferHandle) -> bool {
        self.live.contains(&handle)
    }

    pub fn clear_draws(&mut self) {
        self.draws.clear();
    }
}

impl RenderBackend for HeadlessBackend {
    fn upload_vertices(&mut self, _vertices: &[Vertex]) -> Option<BufferHandle> {
        self.allocate()
    }

    fn upload_indices(&mut self, _indices: &[u32]) -> Option<BufferHandle> {
        self.allocate()
    }

    fn release(&mut self, handle: BufferHandle) {
        if self.live.remove(&handle) {
            self.releases += 1;
        } else {
            log::warn!("release of unknown buffer handle {:?}", handle);
        }
    }

    fn draw_indexed(&mut self, vertices: BufferHandle, indices: BufferHandle, index_count: u32) {
        self.draws.push(DrawRecord {
            vertices,
            indices,
            index_count,
        });
    }
}
