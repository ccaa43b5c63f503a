//! Inspect a terrain file and run one refinement pass without a GPU
//!
//! Usage: cargo run --release --bin terrain_info <terrain-file>

use std::path::Path;
use std::process::ExitCode;

use rlod::core::types::Vec3;
use rlod::core::logging;
use rlod::render::HeadlessBackend;
use rlod::terrain::{LodSettings, TerrainModel};

fn main() -> ExitCode {
    logging::init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: terrain_info <terrain-file>");
        return ExitCode::FAILURE;
    };

    let mut model = match TerrainModel::load(Path::new(&path)) {
        Ok(model) => model,
        Err(err) => {
            log::error!("failed to load {path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let bounds = model.bounds();
    println!("terrain:  {path}");
    println!("layout:   {}", match model {
        TerrainModel::Raster(_) => "raster",
        TerrainModel::Chunked(_) => "chunked",
    });
    println!("patches:  {}", model.patch_count());
    println!("bounds:   {:?} .. {:?}", bounds.min, bounds.max);
    if let TerrainModel::Raster(ref raster) = model {
        println!("patch size:  {}", raster.patch_size());
        println!("tess levels: {}", raster.tess_levels());
    }

    // One selection pass from a vantage point above the terrain center
    let settings = LodSettings::default();
    let center = bounds.center();
    let extent = bounds.size();
    let eye = center + Vec3::new(0.0, extent.y + 0.25 * extent.x.max(extent.z), 0.0);
    let metric = settings.metric(eye);
    let frustum = settings.frustum(eye, center, Vec3::X, 16.0 / 9.0);

    let mut backend = HeadlessBackend::new();
    model.update(&metric, &frustum, &mut backend);
    model.render(&mut backend);

    println!("sample view from {eye:?}:");
    println!("  active patches:  {}", model.active_patches().len());
    println!("  gpu buffers:     {}", backend.live_buffers());
    println!("  indices drawn:   {}", model.rendered_indices());

    model.clear(&mut backend);
    ExitCode::SUCCESS
}
