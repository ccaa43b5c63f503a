//! Raster terrain model: regular-grid patches with shared tessellation
//! index buffers
//!
//! Every patch stores the same `(patch_size + 1)^2` vertex grid layout,
//! so connectivity lives in a global table of index buffers keyed by the
//! tessellation levels of the two outward-edge neighbors and the child
//! quadrant. Picking the matching buffer per active patch stitches
//! adjacent patches of different depth without T-junction cracks.

use std::path::Path;

use crate::core::types::Result;
use crate::math::{Aabb, Frustum};
use crate::render::backend::{BufferHandle, RenderBackend};
use super::format::{self, RasterAsset};
use super::metric::ErrorMetric;
use super::neighbors;
use super::patch::{PatchId, PatchTree};

/// Quadtree terrain over a regular height grid
pub struct RasterTerrainModel {
    tree: PatchTree,
    root: PatchId,
    /// Cut selected by the last `update`, in traversal order
    active: Vec<PatchId>,
    /// Shared index data, `tess_levels^2 * 4` configurations
    tess_index_buffers: Vec<Vec<u32>>,
    /// GPU residency of the shared index data, uploaded lazily
    tess_buffers: Vec<Option<BufferHandle>>,
    outline_indices: Vec<u32>,
    outline_buffer: Option<BufferHandle>,
    patch_size: u32,
    tess_levels: u32,
    bounds: Aabb,
    /// Indices submitted by the last `render`
    rendered_indices: u64,
}

impl RasterTerrainModel {
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::from_asset(format::load_raster(path)?))
    }

    pub fn from_asset(asset: RasterAsset) -> Self {
        let RasterAsset {
            patch_size,
            tess_levels,
            tess_index_buffers,
            mut tree,
            root,
            bounds,
        } = asset;
        neighbors::assign_neighbors(&mut tree, root);

        let config_count = tess_index_buffers.len();
        Self {
            tree,
            root,
            active: Vec::new(),
            tess_index_buffers,
            tess_buffers: vec![None; config_count],
            outline_indices: build_outline_indices(patch_size),
            outline_buffer: None,
            patch_size,
            tess_levels,
            bounds,
            rendered_indices: 0,
        }
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn patch_size(&self) -> u32 {
        self.patch_size
    }

    pub fn tess_levels(&self) -> u32 {
        self.tess_levels
    }

    pub fn patch_count(&self) -> usize {
        self.tree.len()
    }

    /// Patches selected by the last `update`
    pub fn active_patches(&self) -> &[PatchId] {
        &self.active
    }

    pub fn rendered_indices(&self) -> u64 {
        self.rendered_indices
    }

    /// Upload the shared index buffers on first use. Failed uploads stay
    /// unresident and the affected configurations are skipped at render
    /// time; the next update retries.
    fn ensure_shared_buffers(&mut self, backend: &mut dyn RenderBackend) {
        for (indices, slot) in self.tess_index_buffers.iter().zip(&mut self.tess_buffers) {
            if slot.is_none() && !indices.is_empty() {
                *slot = backend.upload_indices(indices);
            }
        }
        if self.outline_buffer.is_none() && !self.outline_indices.is_empty() {
            self.outline_buffer = backend.upload_indices(&self.outline_indices);
        }
    }

    /// Reselect the active cut for the given view and commit/release
    /// patch buffers to match
    pub fn update(
        &mut self,
        metric: &ErrorMetric,
        frustum: &Frustum,
        backend: &mut dyn RenderBackend,
    ) {
        self.ensure_shared_buffers(backend);
        self.active.clear();
        self.tree
            .select_cut(self.root, metric, frustum, backend, &mut self.active);
        log::trace!("active cut holds {} patches", self.active.len());
    }

    /// Index-buffer configuration for an active patch, keyed by the
    /// tessellation levels of its outward-edge neighbors and its child
    /// quadrant. A missing neighbor (terrain boundary) counts as level 0.
    ///
    /// The table is baked with the south/north neighbor's level on the
    /// `tess_levels` stride and the west/east neighbor's level on the
    /// unit stride.
    fn tess_config(&self, id: PatchId) -> usize {
        let patch = self.tree.patch(id);
        let level = |n: Option<PatchId>| {
            n.map_or(0, |n| self.tree.patch(n).tess_level)
                .min(self.tess_levels - 1) as usize
        };
        let hlv = level(patch.neighbors[0]);
        let vlv = level(patch.neighbors[1]);
        let tess_levels = self.tess_levels as usize;
        vlv + hlv * tess_levels + patch.quadrant() * tess_levels * tess_levels
    }

    /// Record one indexed draw per committed active patch
    pub fn render(&mut self, backend: &mut dyn RenderBackend) {
        self.rendered_indices = 0;
        for i in 0..self.active.len() {
            let id = self.active[i];
            let Some(vb) = self.tree.patch(id).vertex_buffer() else {
                continue;
            };
            let config = self.tess_config(id);
            let Some(ib) = self.tess_buffers[config] else {
                continue;
            };
            let count = self.tess_index_buffers[config].len() as u32;
            backend.draw_indexed(vb, ib, count);
            self.rendered_indices += u64::from(count);
        }
    }

    /// Record a boundary-loop draw per committed active patch. The bound
    /// pipeline decides the primitive topology (typically a line strip).
    pub fn render_outline(&mut self, backend: &mut dyn RenderBackend) {
        let Some(ib) = self.outline_buffer else {
            return;
        };
        let count = self.outline_indices.len() as u32;
        for i in 0..self.active.len() {
            if let Some(vb) = self.tree.patch(self.active[i]).vertex_buffer() {
                backend.draw_indexed(vb, ib, count);
            }
        }
    }

    /// Release every GPU buffer held by the model
    pub fn clear(&mut self, backend: &mut dyn RenderBackend) {
        self.tree.release_all(backend);
        self.active.clear();
        for slot in &mut self.tess_buffers {
            if let Some(ib) = slot.take() {
                backend.release(ib);
            }
        }
        if let Some(ib) = self.outline_buffer.take() {
            backend.release(ib);
        }
    }
}

/// Counter-clockwise loop over the boundary vertices of a
/// `(patch_size + 1)^2` grid stored row-major from the south-west corner
fn build_outline_indices(patch_size: u32) -> Vec<u32> {
    let size = patch_size + 1;
    let mut indices = Vec::with_capacity((4 * patch_size) as usize);
    for i in 0..patch_size {
        indices.push(i); // south edge, west to east
    }
    for i in 0..patch_size {
        indices.push(patch_size + i * size); // east edge, south to north
    }
    for i in 0..patch_size {
        indices.push(patch_size - i + patch_size * size); // north edge
    }
    for i in 0..patch_size {
        indices.push((patch_size - i) * size); // west edge, back down
    }
    indices
}
