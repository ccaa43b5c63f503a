//! Terrain asset deserialization
//!
//! Two on-disk layouts are supported, both little-endian, both storing
//! the patch hierarchy depth-first with parents before children:
//!
//! - raster (`RLOD` magic): global header with patch grid size and the
//!   shared tessellation index-buffer table, then per node a label,
//!   bounding box, error, vertex array (optionally quantized to 16-bit
//!   float components) and a 4-bit child-presence mask.
//! - chunked (no magic): root count, then per node a bounding box,
//!   error, private vertex + index arrays and a child count.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use half::f16;

use crate::core::types::{Result, Vec3};
use crate::core::Error;
use crate::math::Aabb;
use super::patch::{Patch, PatchId, PatchTree, Vertex};

/// Signature of raster terrain files
pub const RASTER_MAGIC: [u8; 4] = *b"RLOD";

/// Header sanity bounds; values beyond these indicate a corrupt stream
const MAX_TESS_LEVELS: u32 = 32;
const MAX_PATCH_SIZE: u32 = 1024;

/// Deserialized raster terrain data
#[derive(Debug)]
pub struct RasterAsset {
    /// Grid resolution per patch edge
    pub patch_size: u32,
    /// Number of tessellation levels in the shared index table
    pub tess_levels: u32,
    /// `tess_levels * tess_levels * 4` index buffers, keyed by
    /// (horizontal level, vertical level, child quadrant)
    pub tess_index_buffers: Vec<Vec<u32>>,
    pub tree: PatchTree,
    pub root: PatchId,
    /// Union of all patch bounds
    pub bounds: Aabb,
}

/// Deserialized chunked terrain data
#[derive(Debug)]
pub struct ChunkedAsset {
    pub tree: PatchTree,
    pub roots: Vec<PatchId>,
    pub bounds: Aabb,
}

fn read_vec3<R: Read>(r: &mut R) -> Result<Vec3> {
    let x = r.read_f32::<LittleEndian>()?;
    let y = r.read_f32::<LittleEndian>()?;
    let z = r.read_f32::<LittleEndian>()?;
    Ok(Vec3::new(x, y, z))
}

/// Load a raster terrain asset from disk
pub fn load_raster(path: &Path) -> Result<RasterAsset> {
    let file = File::open(path)?;
    read_raster(&mut BufReader::new(file))
}

/// Read a raster terrain asset from a byte stream
pub fn read_raster<R: Read>(r: &mut R) -> Result<RasterAsset> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != RASTER_MAGIC {
        return Err(Error::Format("not a raster terrain file".into()));
    }

    let compressed = r.read_u32::<LittleEndian>()? == 1;

    // Horizontal extent header; the authoritative bounds are accumulated
    // from the per-node boxes below
    let mut extent = [0f32; 4];
    for v in &mut extent {
        *v = r.read_f32::<LittleEndian>()?;
    }
    log::debug!(
        "terrain extent: x [{}, {}], z [{}, {}]",
        extent[0], extent[1], extent[2], extent[3]
    );

    let patch_size = r.read_u32::<LittleEndian>()?;
    if patch_size == 0 || patch_size > MAX_PATCH_SIZE {
        return Err(Error::Format(format!("implausible patch size {patch_size}")));
    }

    let tess_levels = r.read_u32::<LittleEndian>()?;
    if tess_levels == 0 || tess_levels > MAX_TESS_LEVELS {
        return Err(Error::Format(format!(
            "implausible tessellation level count {tess_levels}"
        )));
    }

    // One configuration per (horizontal, vertical) level pair and child
    // quadrant
    let config_count = (tess_levels * tess_levels * 4) as usize;
    let mut tess_index_buffers = Vec::with_capacity(config_count);
    for _ in 0..config_count {
        let count = r.read_u32::<LittleEndian>()? as usize;
        let mut indices = Vec::new();
        for _ in 0..count {
            indices.push(r.read_u32::<LittleEndian>()?);
        }
        tess_index_buffers.push(indices);
    }
    log::info!(
        "loaded {} tessellation index buffers, patch size {}",
        config_count, patch_size
    );

    let mut tree = PatchTree::new();
    let mut bounds = Aabb::inverted();
    let root = read_raster_patch(r, &mut tree, None, compressed, &mut bounds)?;
    log::info!("loaded patch hierarchy with {} nodes", tree.len());

    Ok(RasterAsset {
        patch_size,
        tess_levels,
        tess_index_buffers,
        tree,
        root,
        bounds,
    })
}

fn read_raster_patch<R: Read>(
    r: &mut R,
    tree: &mut PatchTree,
    parent: Option<PatchId>,
    compressed: bool,
    bounds: &mut Aabb,
) -> Result<PatchId> {
    let mut patch = Patch::new(parent);
    patch.label = r.read_u32::<LittleEndian>()?;
    patch.bounds = Aabb::new(read_vec3(r)?, read_vec3(r)?);
    patch.error = r.read_f32::<LittleEndian>()?;
    bounds.expand(patch.bounds.min);
    bounds.expand(patch.bounds.max);

    if compressed {
        // Vertex components quantized to 16-bit floats: positions in
        // [0, 1] scaled by the box extent, normals in [0, 1] mapped to
        // [-1, 1]
        let component_count = r.read_u32::<LittleEndian>()? as usize;
        if component_count % 6 != 0 {
            return Err(Error::Format(format!(
                "quantized vertex stream length {component_count} is not a multiple of 6"
            )));
        }
        let origin = patch.bounds.min;
        let extent = patch.bounds.size();
        for _ in 0..component_count / 6 {
            let mut c = [0f32; 6];
            for v in &mut c {
                *v = f16::from_bits(r.read_u16::<LittleEndian>()?).to_f32();
            }
            patch.vertices.push(Vertex {
                position: [
                    origin.x + extent.x * c[0],
                    origin.y + extent.y * c[1],
                    origin.z + extent.z * c[2],
                ],
                normal: [
                    2.0 * c[3] - 1.0,
                    2.0 * c[4] - 1.0,
                    2.0 * c[5] - 1.0,
                ],
            });
        }
    } else {
        let vertex_count = r.read_u32::<LittleEndian>()? as usize;
        for _ in 0..vertex_count {
            let mut c = [0f32; 6];
            for v in &mut c {
                *v = r.read_f32::<LittleEndian>()?;
            }
            patch.vertices.push(Vertex {
                position: [c[0], c[1], c[2]],
                normal: [c[3], c[4], c[5]],
            });
        }
    }

    let child_mask = r.read_u32::<LittleEndian>()?;
    if child_mask > 0xF {
        return Err(Error::Format(format!("invalid child mask {child_mask:#x}")));
    }
    patch.child_mask = child_mask as u8;

    let id = tree.add(patch);
    for slot in 0..4 {
        if child_mask & (1 << slot) != 0 {
            let child = read_raster_patch(r, tree, Some(id), compressed, bounds)?;
            tree.patch_mut(id).children[slot] = Some(child);
        }
    }
    Ok(id)
}

/// Load a chunked terrain asset from disk
pub fn load_chunked(path: &Path) -> Result<ChunkedAsset> {
    let file = File::open(path)?;
    read_chunked(&mut BufReader::new(file))
}

/// Read a chunked terrain asset from a byte stream
pub fn read_chunked<R: Read>(r: &mut R) -> Result<ChunkedAsset> {
    let root_count = r.read_u32::<LittleEndian>()? as usize;
    if root_count == 0 {
        return Err(Error::Format("terrain has no root patches".into()));
    }
    log::info!("terrain has {root_count} root patches");

    let mut tree = PatchTree::new();
    let mut bounds = Aabb::inverted();
    let mut roots = Vec::with_capacity(root_count);
    for _ in 0..root_count {
        roots.push(read_chunked_patch(r, &mut tree, None, &mut bounds)?);
    }
    log::info!("loaded patch hierarchy with {} nodes", tree.len());

    Ok(ChunkedAsset { tree, roots, bounds })
}

fn read_chunked_patch<R: Read>(
    r: &mut R,
    tree: &mut PatchTree,
    parent: Option<PatchId>,
    bounds: &mut Aabb,
) -> Result<PatchId> {
    let mut patch = Patch::new(parent);
    patch.bounds = Aabb::new(read_vec3(r)?, read_vec3(r)?);
    patch.error = r.read_f32::<LittleEndian>()?;
    bounds.expand(patch.bounds.min);
    bounds.expand(patch.bounds.max);

    let vertex_count = r.read_u32::<LittleEndian>()? as usize;
    let index_count = r.read_u32::<LittleEndian>()? as usize;
    for _ in 0..vertex_count {
        let mut c = [0f32; 6];
        for v in &mut c {
            *v = r.read_f32::<LittleEndian>()?;
        }
        patch.vertices.push(Vertex {
            position: [c[0], c[1], c[2]],
            normal: [c[3], c[4], c[5]],
        });
    }
    for _ in 0..index_count {
        patch.indices.push(r.read_u32::<LittleEndian>()?);
    }

    let child_count = r.read_u32::<LittleEndian>()? as usize;
    if child_count > 4 {
        return Err(Error::Format(format!("invalid child count {child_count}")));
    }
    patch.child_mask = ((1u32 << child_count) - 1) as u8;

    let id = tree.add(patch);
    for slot in 0..child_count {
        let child = read_chunked_patch(r, tree, Some(id), bounds)?;
        tree.patch_mut(id).children[slot] = Some(child);
    }
    Ok(id)
}

#[cfg(test)]
pub(crate) mod test_data {
    //! Synthetic asset writers shared by the loader and model tests

    use std::io::Write;

    use byteorder::{LittleEndian, WriteBytesExt};
    use half::f16;

    /// Serialize one raster patch record (leaf unless `child_mask` says
    /// otherwise; children must be appended by the caller)
    pub fn write_raster_patch(
        w: &mut impl Write,
        label: u32,
        bbmin: [f32; 3],
        bbmax: [f32; 3],
        error: f32,
        vertices: &[([f32; 3], [f32; 3])],
        child_mask: u32,
    ) {
        w.write_u32::<LittleEndian>(label).unwrap();
        for v in bbmin.iter().chain(bbmax.iter()) {
            w.write_f32::<LittleEndian>(*v).unwrap();
        }
        w.write_f32::<LittleEndian>(error).unwrap();
        w.write_u32::<LittleEndian>(vertices.len() as u32).unwrap();
        for (p, n) in vertices {
            for c in p.iter().chain(n.iter()) {
                w.write_f32::<LittleEndian>(*c).unwrap();
            }
        }
        w.write_u32::<LittleEndian>(child_mask).unwrap();
    }

    /// Serialize the raster header with `tess_levels^2 * 4` copies of a
    /// single shared index buffer
    pub fn write_raster_header(
        w: &mut impl Write,
        compressed: bool,
        patch_size: u32,
        tess_levels: u32,
        indices: &[u32],
    ) {
        w.write_all(b"RLOD").unwrap();
        w.write_u32::<LittleEndian>(u32::from(compressed)).unwrap();
        for v in [0.0f32, 2.0, 0.0, 2.0] {
            w.write_f32::<LittleEndian>(v).unwrap();
        }
        w.write_u32::<LittleEndian>(patch_size).unwrap();
        w.write_u32::<LittleEndian>(tess_levels).unwrap();
        for _ in 0..tess_levels * tess_levels * 4 {
            w.write_u32::<LittleEndian>(indices.len() as u32).unwrap();
            for i in indices {
                w.write_u32::<LittleEndian>(*i).unwrap();
            }
        }
    }

    /// Serialize a quantized vertex stream for one patch record
    pub fn write_raster_patch_compressed(
        w: &mut impl Write,
        label: u32,
        bbmin: [f32; 3],
        bbmax: [f32; 3],
        error: f32,
        components: &[f32],
        child_mask: u32,
    ) {
        w.write_u32::<LittleEndian>(label).unwrap();
        for v in bbmin.iter().chain(bbmax.iter()) {
            w.write_f32::<LittleEndian>(*v).unwrap();
        }
        w.write_f32::<LittleEndian>(error).unwrap();
        w.write_u32::<LittleEndian>(components.len() as u32).unwrap();
        for c in components {
            w.write_u16::<LittleEndian>(f16::from_f32(*c).to_bits()).unwrap();
        }
        w.write_u32::<LittleEndian>(child_mask).unwrap();
    }

    /// Serialize one chunked patch record
    pub fn write_chunked_patch(
        w: &mut impl Write,
        bbmin: [f32; 3],
        bbmax: [f32; 3],
        error: f32,
        vertices: &[([f32; 3], [f32; 3])],
        indices: &[u32],
        child_count: u32,
    ) {
        for v in bbmin.iter().chain(bbmax.iter()) {
            w.write_f32::<LittleEndian>(*v).unwrap();
        }
        w.write_f32::<LittleEndian>(error).unwrap();
        w.write_u32::<LittleEndian>(vertices.len() as u32).unwrap();
        w.write_u32::<LittleEndian>(indices.len() as u32).unwrap();
        for (p, n) in vertices {
            for c in p.iter().chain(n.iter()) {
                w.write_f32::<LittleEndian>(*c).unwrap();
            }
        }
        for i in indices {
            w.write_u32::<LittleEndian>(*i).unwrap();
        }
        w.write_u32::<LittleEndian>(child_count).unwrap();
    }

    /// A two-level raster terrain: one root over four leaf quadrants
    /// tiling [0,2]x[0,2] on the ground plane
    pub fn two_level_raster_bytes(root_error: f32, leaf_error: f32) -> Vec<u8> {
        let mut bytes = Vec::new();
        write_raster_header(&mut bytes, false, 2, 1, &[0, 1, 2]);

        let quad = |x0: f32, z0: f32| {
            vec![
                ([x0, 0.0, z0], [0.0, 1.0, 0.0]),
                ([x0 + 1.0, 0.0, z0], [0.0, 1.0, 0.0]),
                ([x0, 0.0, z0 + 1.0], [0.0, 1.0, 0.0]),
            ]
        };

        write_raster_patch(
            &mut bytes,
            1,
            [0.0, 0.0, 0.0],
            [2.0, 1.0, 2.0],
            root_error,
            &quad(0.0, 0.0),
            0xF,
        );
        // Children in slot order: SW, SE, NW, NE
        let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)];
        for (slot, (x0, z0)) in corners.iter().enumerate() {
            write_raster_patch(
                &mut bytes,
                slot as u32 + 1,
                [*x0, 0.0, *z0],
                [*x0 + 1.0, 1.0, *z0 + 1.0],
                leaf_error,
                &quad(*x0, *z0),
                0,
            );
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use byteorder::WriteBytesExt;

    #[test]
    fn test_raster_round_trip() {
        let bytes = test_data::two_level_raster_bytes(8.0, 1.0);
        let asset = read_raster(&mut Cursor::new(bytes)).unwrap();

        assert_eq!(asset.patch_size, 2);
        assert_eq!(asset.tess_levels, 1);
        assert_eq!(asset.tess_index_buffers.len(), 4);
        assert_eq!(asset.tree.len(), 5);

        let root = asset.tree.patch(asset.root);
        assert_eq!(root.error, 8.0);
        assert_eq!(root.child_mask, 0xF);
        assert!(root.parent.is_none());

        let sw = asset.tree.patch(root.children[0].unwrap());
        assert_eq!(sw.error, 1.0);
        assert!(sw.is_leaf());
        assert_eq!(sw.parent, Some(asset.root));
        assert_eq!(sw.quadrant(), 0);

        assert_eq!(asset.bounds.min, Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(asset.bounds.max, Vec3::new(2.0, 1.0, 2.0));
    }

    #[test]
    fn test_raster_bad_magic() {
        let mut bytes = test_data::two_level_raster_bytes(8.0, 1.0);
        bytes[0] = b'X';
        let err = read_raster(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_raster_truncated() {
        let bytes = test_data::two_level_raster_bytes(8.0, 1.0);
        let cut = bytes.len() / 2;
        let err = read_raster(&mut Cursor::new(&bytes[..cut])).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_raster_implausible_header() {
        let mut bytes = Vec::new();
        test_data::write_raster_header(&mut bytes, false, 2, MAX_TESS_LEVELS + 1, &[]);
        let err = read_raster(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_raster_compressed_vertices() {
        let mut bytes = Vec::new();
        test_data::write_raster_header(&mut bytes, true, 2, 1, &[0, 1, 2]);
        // Single vertex at the box center with an up normal:
        // components are (position in box fractions, normal in [0,1])
        test_data::write_raster_patch_compressed(
            &mut bytes,
            1,
            [0.0, 0.0, 0.0],
            [4.0, 2.0, 4.0],
            1.0,
            &[0.5, 0.5, 0.5, 0.5, 1.0, 0.5],
            0,
        );

        let asset = read_raster(&mut Cursor::new(bytes)).unwrap();
        let root = asset.tree.patch(asset.root);
        assert_eq!(root.vertices.len(), 1);
        let v = root.vertices[0];
        assert!((v.position[0] - 2.0).abs() < 1e-2);
        assert!((v.position[1] - 1.0).abs() < 1e-2);
        assert!((v.position[2] - 2.0).abs() < 1e-2);
        assert!((v.normal[0] - 0.0).abs() < 1e-2);
        assert!((v.normal[1] - 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_raster_compressed_stream_misaligned() {
        let mut bytes = Vec::new();
        test_data::write_raster_header(&mut bytes, true, 2, 1, &[]);
        test_data::write_raster_patch_compressed(
            &mut bytes,
            1,
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 1.0],
            1.0,
            &[0.5; 5], // not a multiple of 6
            0,
        );
        let err = read_raster(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_chunked_round_trip() {
        let quad = vec![
            ([0.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ];
        let mut bytes = Vec::new();
        bytes.write_u32::<LittleEndian>(2).unwrap(); // two roots
        for x0 in [0.0f32, 1.0] {
            test_data::write_chunked_patch(
                &mut bytes,
                [x0, 0.0, 0.0],
                [x0 + 1.0, 1.0, 1.0],
                4.0,
                &quad,
                &[0, 1, 2],
                1,
            );
            test_data::write_chunked_patch(
                &mut bytes,
                [x0, 0.0, 0.0],
                [x0 + 0.5, 1.0, 0.5],
                1.0,
                &quad,
                &[0, 1, 2],
                0,
            );
        }

        let asset = read_chunked(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(asset.roots.len(), 2);
        assert_eq!(asset.tree.len(), 4);

        let first = asset.tree.patch(asset.roots[0]);
        assert_eq!(first.indices, vec![0, 1, 2]);
        assert!(!first.is_leaf());
        let child = asset.tree.patch(first.children[0].unwrap());
        assert!(child.is_leaf());
        assert_eq!(asset.bounds.max, Vec3::new(2.0, 1.0, 1.0));
    }

    #[test]
    fn test_chunked_empty_is_error() {
        let mut bytes = Vec::new();
        bytes.write_u32::<LittleEndian>(0).unwrap();
        let err = read_chunked(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terrain.rlod");
        std::fs::write(&path, test_data::two_level_raster_bytes(8.0, 1.0)).unwrap();

        let asset = load_raster(&path).unwrap();
        assert_eq!(asset.tree.len(), 5);

        let missing = load_raster(&dir.path().join("missing.rlod"));
        assert!(matches!(missing.unwrap_err(), Error::Io(_)));
    }
}
