use std::fmt;

use serde::{Deserialize, Serialize};
use tiles::{DEFAULT_TILE_HEIGHT, DEFAULT_TILE_WIDTH, TileSize, TileSizeError};
use view::{DEFAULT_MARGIN, ScrollViewport, ViewportError};

pub const DEFAULT_SCREEN_WIDTH: u32 = 816;
pub const DEFAULT_SCREEN_HEIGHT: u32 = 624;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TilemapConfig {
    pub screen_width: u32,
    pub screen_height: u32,
    pub margin: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub horizontal_wrap: bool,
    pub vertical_wrap: bool,
}

impl Default for TilemapConfig {
    fn default() -> Self {
        Self {
            screen_width: DEFAULT_SCREEN_WIDTH,
            screen_height: DEFAULT_SCREEN_HEIGHT,
            margin: DEFAULT_MARGIN,
            tile_width: DEFAULT_TILE_WIDTH,
            tile_height: DEFAULT_TILE_HEIGHT,
            horizontal_wrap: false,
            vertical_wrap: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TilemapConfigError {
    TileSize(TileSizeError),
    Viewport(ViewportError),
}

impl fmt::Display for TilemapConfigError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TilemapConfigError::TileSize(error) => write!(formatter, "invalid tile size: {error}"),
            TilemapConfigError::Viewport(error) => write!(formatter, "invalid viewport: {error}"),
        }
    }
}

impl std::error::Error for TilemapConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TilemapConfigError::TileSize(error) => Some(error),
            TilemapConfigError::Viewport(error) => Some(error),
        }
    }
}

impl From<TileSizeError> for TilemapConfigError {
    fn from(error: TileSizeError) -> Self {
        Self::TileSize(error)
    }
}

impl From<ViewportError> for TilemapConfigError {
    fn from(error: ViewportError) -> Self {
        Self::Viewport(error)
    }
}

impl TilemapConfig {
    pub fn validate(&self) -> Result<(TileSize, ScrollViewport), TilemapConfigError> {
        let tile_size = TileSize::new(self.tile_width, self.tile_height)?;
        let viewport = ScrollViewport::new(
            self.screen_width,
            self.screen_height,
            self.margin,
            tile_size.width(),
            tile_size.height(),
        )?;
        Ok((tile_size, viewport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: TilemapConfig =
            serde_json::from_str(r#"{ "tile_width": 32, "tile_height": 32, "horizontal_wrap": true }"#)
                .expect("parse config");
        assert_eq!(config.screen_width, DEFAULT_SCREEN_WIDTH);
        assert_eq!(config.margin, DEFAULT_MARGIN);
        assert_eq!((config.tile_width, config.tile_height), (32, 32));
        assert!(config.horizontal_wrap);
        assert!(!config.vertical_wrap);
    }

    #[test]
    fn validate_reports_first_failing_layer() {
        let config = TilemapConfig {
            tile_height: 30,
            ..TilemapConfig::default()
        };
        assert_eq!(
            config.validate().expect_err("30 px tiles cannot split in four"),
            TilemapConfigError::TileSize(TileSizeError::HeightNotMultipleOfFour { height: 30 })
        );

        let config = TilemapConfig {
            screen_width: 0,
            ..TilemapConfig::default()
        };
        assert_eq!(
            config.validate().expect_err("zero screen"),
            TilemapConfigError::Viewport(ViewportError::ZeroViewport)
        );

        let config = TilemapConfig {
            screen_width: u32::MAX - 8,
            ..TilemapConfig::default()
        };
        assert_eq!(
            config.validate().expect_err("layer wider than u32"),
            TilemapConfigError::Viewport(ViewportError::TooLarge)
        );
    }

    #[test]
    fn default_config_validates() {
        let (tile_size, viewport) = TilemapConfig::default().validate().expect("default config");
        assert_eq!(tile_size, TileSize::DEFAULT);
        assert_eq!(viewport.backing_size(), (912, 720));
    }
}
