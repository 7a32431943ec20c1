//! Scene files: map data, tileset flags and tileset image paths as JSON.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use model::{PLANE_COUNT, TilesetFlags};
use render_protocol::{RgbaSurface, TilesetBindings};
use renderer::TilemapConfig;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub config: TilemapConfig,
    pub width: u32,
    pub height: u32,
    /// Plane-major cell values, `PLANE_COUNT * width * height` entries.
    pub data: Vec<u32>,
    #[serde(default)]
    pub flags: Vec<u16>,
    /// Tileset index to image path, relative to the scene file.
    #[serde(default)]
    pub tilesets: BTreeMap<usize, PathBuf>,
    #[serde(default)]
    pub origin: [f64; 2],
}

impl Scene {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read scene {}", path.display()))?;
        let mut scene = Self::parse(&text)
            .with_context(|| format!("parse scene {}", path.display()))?;
        if let Some(directory) = path.parent() {
            for image_path in scene.tilesets.values_mut() {
                if image_path.is_relative() {
                    *image_path = directory.join(&*image_path);
                }
            }
        }
        Ok(scene)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let scene: Self = serde_json::from_str(text)?;
        let expected = (scene.width as usize)
            .checked_mul(scene.height as usize)
            .and_then(|cells| cells.checked_mul(PLANE_COUNT))
            .context("map size overflow")?;
        anyhow::ensure!(
            scene.data.len() == expected,
            "map data has {} values, expected {expected} for {}x{}",
            scene.data.len(),
            scene.width,
            scene.height
        );
        Ok(scene)
    }

    pub fn tileset_flags(&self) -> TilesetFlags {
        TilesetFlags::from_raw(&self.flags)
    }

    /// Decodes every listed tileset image.
    pub fn load_tilesets(&self) -> Result<TilesetBindings<RgbaSurface>> {
        let mut bindings = TilesetBindings::new();
        for (&index, path) in &self.tilesets {
            let decoded = image::ImageReader::open(path)
                .with_context(|| format!("open tileset {index} at {}", path.display()))?
                .decode()
                .with_context(|| format!("decode tileset {index} at {}", path.display()))?
                .to_rgba8();
            let (width, height) = decoded.dimensions();
            bindings.bind(index, RgbaSurface::from_image(decoded))?;
            debug!(index, width, height, path = %path.display(), "tileset loaded");
        }
        Ok(bindings)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_minimal_scene_with_defaults() {
        let scene = Scene::parse(
            r#"{
                "width": 1,
                "height": 1,
                "data": [2048, 0, 0, 0, 0],
                "tilesets": { "0": "A1.png" }
            }"#,
        )
        .expect("parse scene");
        assert_eq!(scene.config, TilemapConfig::default());
        assert_eq!(scene.origin, [0.0, 0.0]);
        assert_eq!(scene.tilesets.get(&0), Some(&PathBuf::from("A1.png")));
        assert!(scene.tileset_flags().is_empty());
    }

    #[test]
    fn rejects_short_map_data() {
        let error = Scene::parse(r#"{ "width": 2, "height": 2, "data": [0, 0] }"#)
            .expect_err("short data");
        assert!(error.to_string().contains("expected 20"));
    }
}
