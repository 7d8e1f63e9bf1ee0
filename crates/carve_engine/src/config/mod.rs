//! Configuration system
//!
//! Serializable settings for the terrain grid and the camera, loadable from
//! TOML or RON files selected by extension.

pub use serde::{Serialize, Deserialize};

use crate::terrain::TerrainError;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        Self::from_str_with_format(&contents, path)
    }

    /// Parse configuration text, picking the format from the file name
    fn from_str_with_format(contents: &str, path: &str) -> Result<Self, ConfigError> {
        if path.ends_with(".toml") {
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Serialize configuration, picking the format from the file name
    fn to_string_with_format(&self, path: &str) -> Result<String, ConfigError> {
        if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = self.to_string_with_format(path)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Values parsed but violate a precondition
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] TerrainError),
}

/// Terrain grid settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Total terrain extent (width, height) in world units
    pub terrain_size: [f32; 2],
    /// Edge length of one quadtree block; must divide the terrain size
    pub block_size: f32,
    /// Maximum subdivision depth of every block
    pub max_depth: u32,
    /// World position of the terrain's minimum corner
    pub origin: [f32; 2],
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            terrain_size: [256.0, 256.0],
            block_size: 128.0,
            max_depth: 6,
            origin: [0.0, 0.0],
        }
    }
}

/// Deepest subdivision accepted; 4^12 leaves per block is already far past useful
pub const MAX_SUPPORTED_DEPTH: u32 = 12;

impl TerrainConfig {
    /// Check construction preconditions
    pub fn validate(&self) -> Result<(), TerrainError> {
        let [width, height] = self.terrain_size;
        if !(self.block_size > 0.0) || !self.block_size.is_finite() {
            return Err(TerrainError::InvalidBlockSize(self.block_size));
        }
        if !(width > 0.0 && height > 0.0) {
            return Err(TerrainError::InvalidTerrainSize { width, height });
        }
        if width % self.block_size != 0.0 {
            return Err(TerrainError::NotDivisible {
                axis: "width",
                extent: width,
                block_size: self.block_size,
            });
        }
        if height % self.block_size != 0.0 {
            return Err(TerrainError::NotDivisible {
                axis: "height",
                extent: height,
                block_size: self.block_size,
            });
        }
        if self.max_depth > MAX_SUPPORTED_DEPTH {
            return Err(TerrainError::DepthTooLarge {
                depth: self.max_depth,
                max: MAX_SUPPORTED_DEPTH,
            });
        }
        Ok(())
    }

    /// Number of blocks along (x, y)
    pub fn grid_dimensions(&self) -> (usize, usize) {
        (
            (self.terrain_size[0] / self.block_size) as usize,
            (self.terrain_size[1] / self.block_size) as usize,
        )
    }
}

impl Config for TerrainConfig {}

/// Orthographic camera settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Viewport width in pixels
    pub viewport_width: u32,
    /// Viewport height in pixels
    pub viewport_height: u32,
    /// Visible world height; the width follows from the aspect ratio
    pub view_height: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1280,
            viewport_height: 720,
            view_height: 100.0,
            near: -100.0,
            far: 100.0,
        }
    }
}

impl Config for CameraConfig {}
