use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use render_protocol::{RgbaSurface, TilesetBindings};
use renderer::{BufferPainter, QuadBatchPainter, QuadLayer, Tilemap};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod compose;
mod scene;

use scene::Scene;

#[derive(Parser)]
#[command(author, version, about = "Render a tilemap scene to images")]
struct Arguments {
    /// Scene description (JSON).
    #[arg(long, short = 's', value_parser)]
    scene: PathBuf,
    /// Output directory.
    #[arg(long, short = 'o', value_parser, default_value = "target/snapshot")]
    out: PathBuf,
    /// Animation ticks to run; the last frame is written.
    #[arg(long, default_value_t = 1)]
    frames: u64,
    #[arg(long, value_enum, default_value = "software")]
    backend: Backend,
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum Backend {
    Software,
    Quads,
}

#[derive(Serialize)]
struct QuadDump<'a> {
    layer_offset: (i32, i32),
    anim_offset: [f32; 2],
    lower: &'a QuadLayer,
    upper: &'a QuadLayer,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let arguments = Arguments::parse();
    let scene = Scene::load(&arguments.scene)?;
    let tilesets = scene.load_tilesets()?;
    fs::create_dir_all(&arguments.out)
        .with_context(|| format!("create output directory {}", arguments.out.display()))?;

    match arguments.backend {
        Backend::Software => {
            let mut tilemap = Tilemap::<BufferPainter<RgbaSurface>>::software(scene.config)?;
            let passes = run(&mut tilemap, &scene, &tilesets, arguments.frames)?;
            for (name, buffer) in [
                ("lower.png", tilemap.painter().lower()),
                ("upper.png", tilemap.painter().upper()),
            ] {
                let path = arguments.out.join(name);
                compose::screen_image(buffer, tilemap.viewport())
                    .save(&path)
                    .with_context(|| format!("write {}", path.display()))?;
            }
            info!(passes, out = %arguments.out.display(), "software snapshot written");
        }
        Backend::Quads => {
            let mut tilemap = Tilemap::<QuadBatchPainter>::quads(scene.config)?;
            let passes = run(&mut tilemap, &scene, &tilesets, arguments.frames)?;
            let dump = QuadDump {
                layer_offset: tilemap.layer_offset(),
                anim_offset: tilemap.anim_offset(),
                lower: tilemap.painter().lower(),
                upper: tilemap.painter().upper(),
            };
            write_json(&arguments.out.join("quads.json"), &dump)?;
            info!(
                passes,
                lower = dump.lower.len(),
                upper = dump.upper.len(),
                "quad snapshot written"
            );
        }
    }
    Ok(())
}

/// Loads the scene into `tilemap` and renders `frames` ticks; returns how
/// many passes actually ran.
fn run<P>(
    tilemap: &mut Tilemap<P>,
    scene: &Scene,
    tilesets: &TilesetBindings<RgbaSurface>,
    frames: u64,
) -> Result<u32>
where
    P: renderer::CellPainter<RgbaSurface>,
{
    tilemap.set_data(scene.width, scene.height, scene.data.clone())?;
    tilemap.set_flags(scene.tileset_flags());
    tilemap.set_origin(scene.origin[0], scene.origin[1])?;
    if !tilemap.is_ready(tilesets) {
        info!("some tilesets are not ready; their tiles are skipped");
    }

    let mut passes = 0;
    for frame in 0..frames.max(1) {
        if frame > 0 {
            tilemap.update();
        }
        if tilemap.render(tilesets) {
            passes += 1;
        }
    }
    Ok(passes)
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
