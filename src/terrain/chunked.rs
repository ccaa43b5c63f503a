//! Chunked terrain model: irregular meshes with per-patch connectivity
//!
//! Unlike the raster variant there is no shared index table; every patch
//! carries its own triangulation, and several root patches may tile the
//! terrain. Cracks between adjacent chunks are hidden by the authoring
//! tool (skirts), so no neighbor bookkeeping is needed at runtime.

use std::path::Path;

use crate::core::types::Result;
use crate::math::{Aabb, Frustum};
use crate::render::backend::RenderBackend;
use super::format::{self, ChunkedAsset};
use super::metric::ErrorMetric;
use super::patch::{PatchId, PatchTree};

/// Terrain assembled from independently triangulated chunks
pub struct ChunkedTerrainModel {
    tree: PatchTree,
    roots: Vec<PatchId>,
    /// Cut selected by the last `update`, across all roots
    active: Vec<PatchId>,
    bounds: Aabb,
    rendered_indices: u64,
}

impl ChunkedTerrainModel {
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::from_asset(format::load_chunked(path)?))
    }

    pub fn from_asset(asset: ChunkedAsset) -> Self {
        let ChunkedAsset { tree, roots, bounds } = asset;
        Self {
            tree,
            roots,
            active: Vec::new(),
            bounds,
            rendered_indices: 0,
        }
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn patch_count(&self) -> usize {
        self.tree.len()
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    pub fn active_patches(&self) -> &[PatchId] {
        &self.active
    }

    pub fn rendered_indices(&self) -> u64 {
        self.rendered_indices
    }

    /// Reselect the active cut for the given view and commit/release
    /// patch buffers to match
    pub fn update(
        &mut self,
        metric: &ErrorMetric,
        frustum: &Frustum,
        backend: &mut dyn RenderBackend,
    ) {
        self.active.clear();
        for i in 0..self.roots.len() {
            let root = self.roots[i];
            self.tree
                .select_cut(root, metric, frustum, backend, &mut self.active);
        }
        log::trace!("active cut holds {} patches", self.active.len());
    }

    /// Record one indexed draw per committed active patch
    pub fn render(&mut self, backend: &mut dyn RenderBackend) {
        self.rendered_indices = 0;
        for i in 0..self.active.len() {
            let patch = self.tree.patch(self.active[i]);
            let (Some(vb), Some(ib)) = (patch.vertex_buffer(), patch.index_buffer()) else {
                continue;
            };
            let count = patch.indices.len() as u32;
            backend.draw_indexed(vb, ib, count);
            self.rendered_indices += u64::from(count);
        }
    }

    /// Release every GPU buffer held by the model
    pub fn clear(&mut self, backend: &mut dyn RenderBackend) {
        self.tree.release_all(backend);
        self.active.clear();
    }
}
