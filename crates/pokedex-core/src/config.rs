//! Configuration loading
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::api::{ApiEndpoints, DEFAULT_API_BASE};
use crate::catalog::DEFAULT_PER_PAGE;
use crate::models::{ModelEntry, ModelRegistry};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PokedexConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub list: ListConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Replaces the built-in model table when non-empty
    #[serde(default, rename = "model")]
    pub models: Vec<ModelEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_API_BASE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListConfig {
    /// Cards per page
    #[serde(default = "default_per_page")]
    pub per_page: usize,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
        }
    }
}

fn default_per_page() -> usize {
    DEFAULT_PER_PAGE
}

/// 3D viewer camera, controller and background settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Vertical field of view in degrees
    #[serde(default = "default_fov")]
    pub fov_degrees: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
    /// Initial camera position, looking at the origin
    #[serde(default = "default_camera_position")]
    pub camera_position: [f32; 3],
    /// Fraction of the remaining motion applied per 60 Hz frame
    #[serde(default = "default_damping")]
    pub damping: f32,
    #[serde(default = "default_min_distance")]
    pub min_distance: f32,
    #[serde(default = "default_max_distance")]
    pub max_distance: f32,
    #[serde(default = "default_true")]
    pub enable_pan: bool,
    #[serde(default = "default_true")]
    pub enable_zoom: bool,
    /// Largest model dimension after normalization
    #[serde(default = "default_reference_size")]
    pub reference_size: f32,
    /// Clear color as sRGB bytes
    #[serde(default = "default_background")]
    pub background: [u8; 3],
    /// Render order of session cameras (must sit between the backdrop and the UI)
    #[serde(default = "default_camera_order")]
    pub session_camera_order: isize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            fov_degrees: default_fov(),
            near: default_near(),
            far: default_far(),
            camera_position: default_camera_position(),
            damping: default_damping(),
            min_distance: default_min_distance(),
            max_distance: default_max_distance(),
            enable_pan: true,
            enable_zoom: true,
            reference_size: default_reference_size(),
            background: default_background(),
            session_camera_order: default_camera_order(),
        }
    }
}

fn default_fov() -> f32 {
    45.0
}

fn default_near() -> f32 {
    0.1
}

fn default_far() -> f32 {
    1000.0
}

fn default_camera_position() -> [f32; 3] {
    [0.0, 1.0, 5.0]
}

fn default_damping() -> f32 {
    0.05
}

fn default_min_distance() -> f32 {
    2.0
}

fn default_max_distance() -> f32 {
    10.0
}

fn default_reference_size() -> f32 {
    2.0
}

fn default_background() -> [u8; 3] {
    [0x1a, 0x1a, 0x2e]
}

fn default_camera_order() -> isize {
    1
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Max level for the browser console (trace, debug, info, warn, error)
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "warn".to_string()
}

impl PokedexConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: PokedexConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse `content`, falling back to defaults on error
    pub fn load_or_default(content: &str) -> Self {
        match Self::from_toml(content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Invalid configuration, using defaults: {}", e);
                Self::default()
            }
        }
    }

    pub fn endpoints(&self) -> ApiEndpoints {
        ApiEndpoints::new(&self.api.base_url)
    }

    /// Configured model table, or the built-in one when none is given
    pub fn model_registry(&self) -> ModelRegistry {
        if self.models.is_empty() {
            ModelRegistry::default()
        } else {
            ModelRegistry::from_entries(self.models.iter().cloned())
        }
    }
}
