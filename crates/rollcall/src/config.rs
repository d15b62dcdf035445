use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Application configuration.
///
/// Built from defaults, then an optional TOML file, then `ROLLCALL_*`
/// environment variables (highest precedence).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// V4L2 device path (default: /dev/video0, camera index 0).
    pub camera_device: String,
    /// Directory containing `det_10g.onnx` and `w600k_r50.onnx`.
    pub model_dir: PathBuf,
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Log file used while the terminal UI owns the screen.
    pub log_path: PathBuf,
    /// Cosine similarity at or above which a face matches an employee.
    pub similarity_threshold: f32,
    /// Minimum seconds between two attendance rows for one employee.
    pub cooldown_secs: i64,
    /// Geolocation lookups per attendance mark; 0 disables lookup.
    pub geo_attempts: u32,
    /// Pause between two failed geolocation lookups.
    pub geo_pause_ms: u64,
    pub geo_endpoint: String,
    pub geo_timeout_secs: u64,
    /// Live recognition polling interval.
    pub live_interval_ms: u64,
    /// Registration preview refresh interval.
    pub preview_interval_ms: u64,
    /// Integer shrink factor applied before live detection.
    pub downscale: u32,
    /// Frames discarded right after opening the camera (auto-exposure settling).
    pub warmup_frames: usize,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = data_dir();
        Self {
            camera_device: "/dev/video0".to_string(),
            model_dir: rollcall_core::default_model_dir(),
            db_path: data_dir.join("attendance.db"),
            log_path: data_dir.join("rollcall.log"),
            similarity_threshold: rollcall_core::CosineMatcher::DEFAULT_THRESHOLD,
            cooldown_secs: rollcall_core::cooldown::DEFAULT_COOLDOWN_SECS,
            geo_attempts: 3,
            geo_pause_ms: 1000,
            geo_endpoint: "https://ipinfo.io/json".to_string(),
            geo_timeout_secs: 5,
            live_interval_ms: 10,
            preview_interval_ms: 200,
            downscale: 4,
            warmup_frames: 4,
        }
    }
}

impl Config {
    /// Load from `$ROLLCALL_CONFIG` (or the default config path if it exists),
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var("ROLLCALL_CONFIG").ok().map(PathBuf::from);
        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => {
                let path = config_dir().join("config.toml");
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Override fields from `ROLLCALL_*` variables resolved through `lookup`.
    /// Unparsable values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key);
        if let Some(v) = var("ROLLCALL_CAMERA_DEVICE") {
            self.camera_device = v;
        }
        if let Some(v) = var("ROLLCALL_MODEL_DIR") {
            self.model_dir = PathBuf::from(v);
        }
        if let Some(v) = var("ROLLCALL_DB_PATH") {
            self.db_path = PathBuf::from(v);
        }
        if let Some(v) = var("ROLLCALL_LOG_PATH") {
            self.log_path = PathBuf::from(v);
        }
        if let Some(v) = var("ROLLCALL_GEO_ENDPOINT") {
            self.geo_endpoint = v;
        }
        self.similarity_threshold = parsed(&var, "ROLLCALL_SIMILARITY_THRESHOLD", self.similarity_threshold);
        self.cooldown_secs = parsed(&var, "ROLLCALL_COOLDOWN_SECS", self.cooldown_secs);
        self.geo_attempts = parsed(&var, "ROLLCALL_GEO_ATTEMPTS", self.geo_attempts);
        self.geo_pause_ms = parsed(&var, "ROLLCALL_GEO_PAUSE_MS", self.geo_pause_ms);
        self.geo_timeout_secs = parsed(&var, "ROLLCALL_GEO_TIMEOUT_SECS", self.geo_timeout_secs);
        self.live_interval_ms = parsed(&var, "ROLLCALL_LIVE_INTERVAL_MS", self.live_interval_ms);
        self.preview_interval_ms = parsed(&var, "ROLLCALL_PREVIEW_INTERVAL_MS", self.preview_interval_ms);
        self.downscale = parsed(&var, "ROLLCALL_DOWNSCALE", self.downscale);
        self.warmup_frames = parsed(&var, "ROLLCALL_WARMUP_FRAMES", self.warmup_frames);
    }

    /// Path to the SCRFD detection model.
    pub fn scrfd_model_path(&self) -> String {
        self.model_dir.join("det_10g.onnx").to_string_lossy().into_owned()
    }

    /// Path to the ArcFace recognition model.
    pub fn arcface_model_path(&self) -> String {
        self.model_dir.join("w600k_r50.onnx").to_string_lossy().into_owned()
    }

    pub fn live_interval(&self) -> Duration {
        Duration::from_millis(self.live_interval_ms.max(1))
    }

    pub fn preview_interval(&self) -> Duration {
        Duration::from_millis(self.preview_interval_ms.max(1))
    }
}

fn parsed<T: FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str, current: T) -> T {
    var(key).and_then(|v| v.parse().ok()).unwrap_or(current)
}

fn home_relative(xdg_var: &str, fallback: &str) -> PathBuf {
    std::env::var(xdg_var).map(PathBuf::from).unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        PathBuf::from(home).join(fallback)
    })
}

fn data_dir() -> PathBuf {
    home_relative("XDG_DATA_HOME", ".local/share").join("rollcall")
}

fn config_dir() -> PathBuf {
    home_relative("XDG_CONFIG_HOME", ".config").join("rollcall")
}
