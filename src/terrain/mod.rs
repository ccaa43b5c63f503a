//! Terrain patch hierarchy, refinement and rendering

pub mod chunked;
pub mod config;
pub mod format;
pub mod metric;
pub mod neighbors;
pub mod patch;
pub mod raster;

pub use chunked::ChunkedTerrainModel;
pub use config::LodSettings;
pub use metric::ErrorMetric;
pub use neighbors::Direction;
pub use patch::{Patch, PatchId, PatchTree, Vertex};
pub use raster::RasterTerrainModel;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::core::types::Result;
use crate::math::{Aabb, Frustum};
use crate::render::backend::RenderBackend;

/// A loaded terrain of either layout, dispatching the common operations
pub enum TerrainModel {
    Raster(RasterTerrainModel),
    Chunked(ChunkedTerrainModel),
}

impl TerrainModel {
    /// Load a terrain file, picking the layout from its leading bytes:
    /// the raster signature selects the raster reader, anything else is
    /// treated as a chunked file
    pub fn load(path: &Path) -> Result<Self> {
        let mut magic = [0u8; 4];
        File::open(path)?.read_exact(&mut magic)?;
        if magic == format::RASTER_MAGIC {
            log::info!("loading raster terrain from {}", path.display());
            Ok(Self::Raster(RasterTerrainModel::load(path)?))
        } else {
            log::info!("loading chunked terrain from {}", path.display());
            Ok(Self::Chunked(ChunkedTerrainModel::load(path)?))
        }
    }

    pub fn bounds(&self) -> Aabb {
        match self {
            Self::Raster(m) => m.bounds(),
            Self::Chunked(m) => m.bounds(),
        }
    }

    pub fn patch_count(&self) -> usize {
        match self {
            Self::Raster(m) => m.patch_count(),
            Self::Chunked(m) => m.patch_count(),
        }
    }

    pub fn active_patches(&self) -> &[PatchId] {
        match self {
            Self::Raster(m) => m.active_patches(),
            Self::Chunked(m) => m.active_patches(),
        }
    }

    pub fn rendered_indices(&self) -> u64 {
        match self {
            Self::Raster(m) => m.rendered_indices(),
            Self::Chunked(m) => m.rendered_indices(),
        }
    }

    pub fn update(
        &mut self,
        metric: &ErrorMetric,
        frustum: &Frustum,
        backend: &mut dyn RenderBackend,
    ) {
        match self {
            Self::Raster(m) => m.update(metric, frustum, backend),
            Self::Chunked(m) => m.update(metric, frustum, backend),
        }
    }

    pub fn render(&mut self, backend: &mut dyn RenderBackend) {
        match self {
            Self::Raster(m) => m.render(backend),
            Self::Chunked(m) => m.render(backend),
        }
    }

    pub fn clear(&mut self, backend: &mut dyn RenderBackend) {
        match self {
            Self::Raster(m) => m.clear(backend),
            Self::Chunked(m) => m.clear(backend),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use byteorder::{LittleEndian, WriteBytesExt};

    #[test]
    fn test_load_dispatches_on_magic() {
        let dir = tempfile::tempdir().unwrap();

        let raster_path = dir.path().join("terrain.rlod");
        std::fs::write(
            &raster_path,
            format::test_data::two_level_raster_bytes(8.0, 1.0),
        )
        .unwrap();
        let model = TerrainModel::load(&raster_path).unwrap();
        assert!(matches!(model, TerrainModel::Raster(_)));
        assert_eq!(model.patch_count(), 5);

        let chunked_path = dir.path().join("terrain.chunks");
        let mut bytes = Vec::new();
        bytes.write_u32::<LittleEndian>(1).unwrap();
        format::test_data::write_chunked_patch(
            &mut bytes,
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 1.0],
            1.0,
            &[([0.0, 0.0, 0.0], [0.0, 1.0, 0.0])],
            &[0],
            0,
        );
        std::fs::write(&chunked_path, bytes).unwrap();
        let model = TerrainModel::load(&chunked_path).unwrap();
        assert!(matches!(model, TerrainModel::Chunked(_)));
        assert_eq!(model.patch_count(), 1);
    }
}
