//! Viewer configuration.
//!
//! Every section has built-in defaults, so an empty JSON object is a valid config. The
//! file is taken from the first command-line argument, then `PLANETFOLIO_CONFIG`; with
//! neither present the defaults are used as-is.

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::interaction::StateId;
use crate::transition::CameraPose;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "PLANETFOLIO_CONFIG";

/// Top-level configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub transitions: TransitionConfig,
    pub labels: LabelConfig,
    pub shading: ShadingConfig,
    pub assets: AssetConfig,
    /// Named states with their camera presets and overlay text. The first entry is the
    /// state the viewer starts in.
    pub states: StatesConfig,
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.window.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.window.width = width;
        self.window.height = height;
        self
    }

    /// Parse a config from JSON text and validate it.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::info!(path = %path.display(), "loaded config file");
        Self::from_json(&text)
    }

    /// Resolve the config from the command line, then the environment, then defaults.
    pub fn load() -> Result<Self> {
        let from_args = std::env::args_os().nth(1).map(PathBuf::from);
        let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);

        match from_args.or(from_env) {
            Some(path) => Self::from_file(path),
            None => {
                tracing::debug!("no config file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(Error::Config("window size must be non-zero".into()));
        }
        if !(self.camera.near > 0.0 && self.camera.far > self.camera.near) {
            return Err(Error::Config(format!(
                "camera clip planes must satisfy 0 < near < far (got {} / {})",
                self.camera.near, self.camera.far
            )));
        }
        if !(0.0..1.0).contains(&self.controls.damping) {
            return Err(Error::Config(format!(
                "controls.damping must be in [0, 1), got {}",
                self.controls.damping
            )));
        }
        if self.shading.water_max_depth <= 0.0 || self.shading.grass_max_depth <= 0.0 {
            return Err(Error::Config("shading max depths must be positive".into()));
        }
        if self.states.presets.is_empty() {
            return Err(Error::Config("at least one state preset is required".into()));
        }
        for (i, preset) in self.states.presets.iter().enumerate() {
            if self.states.presets[..i].iter().any(|p| p.id == preset.id) {
                return Err(Error::Config(format!("duplicate state '{}'", preset.id)));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Planetfolio".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 35.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

/// Drag-to-spin tuning.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    /// Radians per pixel of drag.
    pub rotation_speed: f32,
    /// Fraction of the remaining delta removed every tick.
    pub damping: f32,
    /// Per-axis deltas above this many pixels are discarded as input glitches.
    pub spike_threshold: f32,
    pub horizontal: bool,
    pub vertical: bool,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            rotation_speed: 0.05,
            damping: 0.25,
            spike_threshold: 400.0,
            horizontal: true,
            vertical: false,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    pub camera_ms: u32,
    pub fade_ms: u32,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            camera_ms: 3000,
            fade_ms: 3000,
        }
    }
}

impl TransitionConfig {
    pub fn camera_secs(&self) -> f32 {
        self.camera_ms as f32 / 1000.0
    }

    pub fn fade_secs(&self) -> f32 {
        self.fade_ms as f32 / 1000.0
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Labels whose facing dot product exceeds this are treated as facing away.
    pub facing_threshold: f32,
    /// Click/tap radius around a label's anchor, in pixels.
    pub pick_radius: f32,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            facing_threshold: 0.2,
            pick_radius: 48.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ShadingConfig {
    /// Multiplier from wall-clock seconds to shader `time`.
    pub time_rate: f32,
    pub water_max_depth: f32,
    /// Depth differences beyond this fall back to the shallow colour.
    pub water_cutoff_depth: f32,
    /// How much of the pre-pass colour shows through the water.
    pub water_clarity: f32,
    pub grass_max_depth: f32,
    pub grass_scale: f32,
    /// Planet spin while idle, radians per second about Y.
    pub idle_spin: f32,
    /// Background clear colour (linear RGB).
    pub clear_color: [f32; 3],
}

impl Default for ShadingConfig {
    fn default() -> Self {
        Self {
            time_rate: 1.0,
            water_max_depth: 2.0,
            water_cutoff_depth: 3.0,
            water_clarity: 0.2,
            grass_max_depth: 0.1,
            grass_scale: 0.2,
            idle_spin: -0.06,
            clear_color: [0.02, 0.02, 0.05],
        }
    }
}

/// Files and procedural parameters for scene construction.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Content list; the embedded default is used when unset.
    pub content: Option<PathBuf>,
    /// TrueType font for labels and overlays; labels fall back to markers when unset.
    pub font: Option<PathBuf>,
    pub font_size: f32,
    pub planet_stl: Option<PathBuf>,
    pub water_stl: Option<PathBuf>,
    /// Four-cell grass/flower atlas; generated when unset.
    pub grass_atlas: Option<PathBuf>,
    pub grass_count: u32,
    pub seed: u32,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            content: None,
            font: None,
            font_size: 18.0,
            planet_stl: None,
            water_stl: None,
            grass_atlas: None,
            grass_count: 1200,
            seed: 7,
        }
    }
}

/// Camera preset and overlay text for one named state.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePreset {
    pub id: StateId,
    pub camera: CameraPose,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub lines: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(transparent)]
pub struct StatesConfig {
    pub presets: Vec<StatePreset>,
}

impl Default for StatesConfig {
    fn default() -> Self {
        Self {
            presets: vec![
                StatePreset {
                    id: StateId::home(),
                    camera: CameraPose::new(Vec3::new(0.0, 0.5, 6.0), Vec3::ZERO, 35.0),
                    title: "Hello, explorer".to_string(),
                    lines: vec!["Drag to spin the planet.".to_string(), "Click a label to look closer.".to_string()],
                },
                StatePreset {
                    id: StateId::about(),
                    camera: CameraPose::new(Vec3::new(3.0, 1.5, 3.5), Vec3::ZERO, 30.0),
                    title: "About".to_string(),
                    lines: vec!["Educator and interaction designer.".to_string()],
                },
                StatePreset {
                    id: StateId::work(),
                    camera: CameraPose::new(
                        Vec3::new(-3.5, -0.5, 3.0),
                        Vec3::new(0.0, 0.2, 0.0),
                        40.0,
                    ),
                    title: "Work".to_string(),
                    lines: vec!["Selected projects live on the planet.".to_string()],
                },
            ],
        }
    }
}

impl StatesConfig {
    pub fn get(&self, id: &StateId) -> Option<&StatePreset> {
        self.presets.iter().find(|p| &p.id == id)
    }
}
