use std::{fs, path::Path};

use bevy::prelude::Resource;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::{
    color::{normalize_over, ColorChannelSpec, ColorPolicy, ColorSpec, Rgb},
    history::DEFAULT_HISTORY_LIMIT,
    mutation::MutationConfig,
    step::{DecayRules, StepEngine},
};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// Every option of a simulation. Missing keys take their default.
#[derive(Debug, Clone, Deserialize, Resource)]
#[serde(default)]
pub struct LifeConfig {
    /// Drawing area width in pixels (default 1000).
    pub canvas_width: f32,
    /// Drawing area height in pixels (default 1000).
    pub canvas_height: f32,
    /// Cell edge in pixels before zoom (default 2).
    pub cell_size: f32,
    /// Multiplier on `cell_size` (default 5).
    pub zoom: f32,

    /// Initial and default per-cell aliveness probability (default 0.5).
    pub spawn_rate: f64,
    /// Births take the rounded mean of their parents' colors (default true).
    pub merge_color: bool,

    /// Sample fresh colors from `random_color` (default false).
    pub enable_random_color: bool,
    /// Default 127-255 per channel.
    #[serde(deserialize_with = "random_color")]
    pub random_color: ColorSpec,
    /// Fresh colors when random coloring is off and the fallback for every
    /// missing channel. Default 0 per channel.
    #[serde(deserialize_with = "default_color")]
    pub default_color: ColorSpec,

    pub enable_birth_mutation: bool,
    pub birth_mutation: MutationConfig,
    pub enable_self_mutation: bool,
    pub self_mutation: MutationConfig,
    pub enable_decay_mutation: bool,
    pub decay_mutation: MutationConfig,

    /// Fade dead cells out instead of clearing them (default false).
    pub enable_decay: bool,
    /// Fade per generation (default 0.1).
    pub decay_speed: f32,

    /// Generations kept in history (default 5000).
    pub history_limit: usize,
    /// Keep the pre-transition board in every history entry (default false).
    pub history_save_board: bool,

    /// Milliseconds between generations (default 100).
    pub speed_ms: u64,
    /// Start paused (default false).
    pub paused: bool,
    /// Leave a gap between cells (default true).
    pub grid: bool,
    #[serde(deserialize_with = "background_color")]
    pub background_color: ColorSpec,
    /// Scatter colored circles when the board stops changing (default false).
    pub reseed_on_stasis: bool,
    /// Random seed, drawn from the OS when absent.
    pub seed: Option<u64>,
}

impl Default for LifeConfig {
    fn default() -> Self {
        Self {
            canvas_width: 1000.0,
            canvas_height: 1000.0,
            cell_size: 2.0,
            zoom: 5.0,
            spawn_rate: 0.5,
            merge_color: true,
            enable_random_color: false,
            random_color: default_random_color(),
            default_color: default_default_color(),
            enable_birth_mutation: false,
            birth_mutation: MutationConfig::default(),
            enable_self_mutation: false,
            self_mutation: MutationConfig::default(),
            enable_decay_mutation: false,
            decay_mutation: MutationConfig::default(),
            enable_decay: false,
            decay_speed: 0.1,
            history_limit: DEFAULT_HISTORY_LIMIT,
            history_save_board: false,
            speed_ms: 100,
            paused: false,
            grid: true,
            background_color: default_background_color(),
            reseed_on_stasis: false,
            seed: None,
        }
    }
}

fn default_random_color() -> ColorSpec {
    ColorSpec::uniform(ColorChannelSpec::range(127, 255))
}

fn default_default_color() -> ColorSpec {
    ColorSpec::uniform(ColorChannelSpec::Fixed(0))
}

fn default_background_color() -> ColorSpec {
    ColorSpec::from(Rgb::new(0, 26, 77))
}

// channels left out of a color option keep their default
fn random_color<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ColorSpec, D::Error> {
    let raw = Value::deserialize(deserializer)?;
    Ok(normalize_over(&raw, &default_random_color()))
}

fn default_color<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ColorSpec, D::Error> {
    let raw = Value::deserialize(deserializer)?;
    Ok(normalize_over(&raw, &default_default_color()))
}

fn background_color<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ColorSpec, D::Error> {
    let raw = Value::deserialize(deserializer)?;
    Ok(normalize_over(&raw, &default_background_color()))
}

impl LifeConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: LifeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        if !(0.0..=1.0).contains(&self.spawn_rate) {
            errors.push(format!("spawn_rate {} is outside 0-1", self.spawn_rate));
        }
        if !(0.0..=1.0).contains(&self.decay_speed) {
            errors.push(format!("decay_speed {} is outside 0-1", self.decay_speed));
        }
        if self.cell_size <= 0.0 || self.zoom <= 0.0 {
            errors.push(format!(
                "cell_size {} and zoom {} must be positive",
                self.cell_size, self.zoom
            ));
        }
        if self.canvas_width < 0.0 || self.canvas_height < 0.0 {
            errors.push("canvas dimensions must not be negative".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Rendered edge length of one cell.
    #[inline]
    pub fn cell_px(&self) -> f32 {
        self.cell_size * self.zoom
    }

    /// `(columns, rows)` that fit the canvas, rounded.
    pub fn grid_size(&self) -> (u32, u32) {
        let cell = self.cell_px();
        (
            (self.canvas_width / cell).round() as u32,
            (self.canvas_height / cell).round() as u32,
        )
    }

    /// Color policy with color names already resolved to RGB.
    pub fn palette(&self) -> ColorPolicy {
        ColorPolicy {
            random_color: self.enable_random_color.then(|| {
                self.random_color
                    .clone()
                    .resolve_name(default_random_color())
            }),
            default_color: self
                .default_color
                .clone()
                .resolve_name(default_default_color()),
        }
    }

    pub fn engine(&self) -> StepEngine {
        StepEngine {
            merge_color: self.merge_color,
            palette: self.palette(),
            birth_mutation: self.enable_birth_mutation.then_some(self.birth_mutation),
            self_mutation: self.enable_self_mutation.then_some(self.self_mutation),
            decay: self.enable_decay.then_some(DecayRules {
                speed: self.decay_speed,
            }),
            decay_mutation: self.enable_decay_mutation.then_some(self.decay_mutation),
        }
    }
}
