//! Quadtree patch storage and the per-frame cut selection
//!
//! Patches live in an arena (`PatchTree`) and are addressed by index, so
//! parent, child and neighbor links carry no ownership. Topology, bounds,
//! error and vertex data are fixed after load; only GPU residency and the
//! per-frame tessellation level mutate.

use bytemuck::{Pod, Zeroable};

use crate::math::{Aabb, Frustum};
use crate::render::backend::{BufferHandle, RenderBackend};
use super::metric::ErrorMetric;

/// Terrain vertex: position + normal
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Index of a patch within its arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PatchId(pub u32);

/// One node of the terrain quadtree
#[derive(Debug)]
pub struct Patch {
    /// Node label from the asset; the low two bits of `label - 1` encode
    /// the child slot within the parent
    pub label: u32,
    /// World-space bounds enclosing this node and all descendants
    pub bounds: Aabb,
    /// Object-space geometric error of this node's simplification
    pub error: f32,
    /// Vertex data, authored at load time, immutable afterward
    pub vertices: Vec<Vertex>,
    /// Per-patch connectivity; empty when the model shares a global
    /// tessellation index table instead
    pub indices: Vec<u32>,
    pub parent: Option<PatchId>,
    pub children: [Option<PatchId>; 4],
    pub child_mask: u8,
    /// Same-depth neighbors on the two outward edges, resolved once
    /// after load (see `terrain::neighbors`)
    pub neighbors: [Option<PatchId>; 2],
    /// Subdivision depth below the active cut, refreshed every update
    pub tess_level: u32,
    vertex_buffer: Option<BufferHandle>,
    index_buffer: Option<BufferHandle>,
}

impl Patch {
    pub fn new(parent: Option<PatchId>) -> Self {
        Self {
            label: 0,
            bounds: Aabb::default(),
            error: 0.0,
            vertices: Vec::new(),
            indices: Vec::new(),
            parent,
            children: [None; 4],
            child_mask: 0,
            neighbors: [None; 2],
            tess_level: 0,
            vertex_buffer: None,
            index_buffer: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.child_mask == 0
    }

    /// Whether this patch currently holds a GPU vertex buffer
    pub fn is_committed(&self) -> bool {
        self.vertex_buffer.is_some()
    }

    /// Child slot of this node within its parent (0-3)
    pub fn quadrant(&self) -> usize {
        (self.label.wrapping_sub(1) & 0x3) as usize
    }

    pub fn vertex_buffer(&self) -> Option<BufferHandle> {
        self.vertex_buffer
    }

    pub fn index_buffer(&self) -> Option<BufferHandle> {
        self.index_buffer
    }
}

/// Arena holding a complete patch hierarchy
#[derive(Debug, Default)]
pub struct PatchTree {
    patches: Vec<Patch>,
}

impl PatchTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a patch and return its id
    pub fn add(&mut self, patch: Patch) -> PatchId {
        let id = PatchId(self.patches.len() as u32);
        self.patches.push(patch);
        id
    }

    pub fn patch(&self, id: PatchId) -> &Patch {
        &self.patches[id.0 as usize]
    }

    pub fn patch_mut(&mut self, id: PatchId) -> &mut Patch {
        &mut self.patches[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Upload this patch's buffers; a no-op when already committed.
    ///
    /// A failed upload leaves the patch uncommitted and is logged; the
    /// patch is simply skipped at render time.
    pub fn commit(&mut self, id: PatchId, backend: &mut dyn RenderBackend) {
        if self.patch(id).is_committed() {
            return;
        }
        let Some(vb) = backend.upload_vertices(&self.patch(id).vertices) else {
            log::warn!("vertex upload failed for patch {}, skipping commit", id.0);
            return;
        };
        let ib = if self.patch(id).indices.is_empty() {
            None
        } else {
            match backend.upload_indices(&self.patch(id).indices) {
                Some(ib) => Some(ib),
                None => {
                    log::warn!("index upload failed for patch {}, skipping commit", id.0);
                    backend.release(vb);
                    return;
                }
            }
        };
        let patch = self.patch_mut(id);
        patch.vertex_buffer = Some(vb);
        patch.index_buffer = ib;
    }

    /// Free this patch's GPU buffers; a no-op when not committed
    pub fn release(&mut self, id: PatchId, backend: &mut dyn RenderBackend) {
        let patch = self.patch_mut(id);
        let vb = patch.vertex_buffer.take();
        let ib = patch.index_buffer.take();
        if let Some(vb) = vb {
            backend.release(vb);
        }
        if let Some(ib) = ib {
            backend.release(ib);
        }
    }

    /// Release every committed descendant of `id` without touching `id`
    /// itself. Recurses through uncommitted interior nodes as well, so
    /// no buffer survives below the node even when the cut jumps several
    /// levels in one frame.
    pub fn release_children(&mut self, id: PatchId, backend: &mut dyn RenderBackend) {
        let children = self.patch(id).children;
        for child in children.into_iter().flatten() {
            if self.patch(child).is_committed() {
                self.release(child, backend);
            }
            self.release_children(child, backend);
        }
    }

    /// Release every committed patch in the tree (model teardown)
    pub fn release_all(&mut self, backend: &mut dyn RenderBackend) {
        for i in 0..self.patches.len() {
            self.release(PatchId(i as u32), backend);
        }
    }

    /// Set the tessellation level of `id` and `level + 1` down its subtree
    pub fn propagate_tess_level(&mut self, id: PatchId, level: u32) {
        self.patch_mut(id).tess_level = level;
        let children = self.patch(id).children;
        for child in children.into_iter().flatten() {
            self.propagate_tess_level(child, level + 1);
        }
    }

    /// Per-frame selection traversal: walk the subtree under `id`,
    /// decide the active cut, and commit/release GPU buffers to match.
    ///
    /// Invariants upheld:
    /// - `active` receives exactly one ancestor per visible root-to-leaf path
    /// - no patch in `active` ever has a committed ancestor or descendant
    /// - entirely culled subtrees lose all GPU residency
    pub fn select_cut(
        &mut self,
        id: PatchId,
        metric: &ErrorMetric,
        frustum: &Frustum,
        backend: &mut dyn RenderBackend,
        active: &mut Vec<PatchId>,
    ) {
        self.patch_mut(id).tess_level = 0;
        let (bounds, error, is_leaf, children) = {
            let p = self.patch(id);
            (p.bounds, p.error, p.is_leaf(), p.children)
        };

        if !frustum.intersects_aabb(&bounds) {
            self.release(id, backend);
            self.release_children(id, backend);
            return;
        }

        if metric.needs_refinement(&bounds, error) && !is_leaf {
            // This node was the active representative last frame if the
            // cut just descended past it; its buffers go before the
            // children take over
            self.release(id, backend);
            for child in children.into_iter().flatten() {
                self.select_cut(child, metric, frustum, backend, active);
            }
        } else {
            self.commit(id, backend);
            self.release_children(id, backend);
            self.propagate_tess_level(id, 0);
            active.push(id);
        }
    }
}
