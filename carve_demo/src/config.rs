//! Demo settings

use carve_engine::config::{CameraConfig, Config, TerrainConfig};
use serde::{Deserialize, Serialize};

/// Procedural tunnel generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelConfig {
    /// Seed for the random walk
    pub seed: u64,
    /// Number of tunnels
    pub count: u32,
    /// Brush strokes per tunnel
    pub segments: u32,
    /// Distance between strokes
    pub step: f32,
    /// Smallest stroke radius
    pub min_radius: f32,
    /// Largest stroke radius
    pub max_radius: f32,
    /// Largest heading change per stroke, in radians
    pub max_turn: f32,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            seed: 28,
            count: 6,
            segments: 40,
            step: 4.0,
            min_radius: 3.0,
            max_radius: 7.0,
            max_turn: 0.6,
        }
    }
}

/// Everything the demo reads from its config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Terrain grid
    pub terrain: TerrainConfig,
    /// Camera used for picking
    pub camera: CameraConfig,
    /// Tunnel carving
    pub tunnels: TunnelConfig,
    /// Frames to simulate
    pub frames: u32,
    /// Radius of the painting brush
    pub paint_radius: f32,
    /// Downward acceleration of the falling body
    pub gravity: f32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            terrain: TerrainConfig::default(),
            camera: CameraConfig::default(),
            tunnels: TunnelConfig::default(),
            frames: 240,
            paint_radius: 5.0,
            gravity: 9.8,
        }
    }
}

impl Config for DemoConfig {}
