use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::{Path, PathBuf}, time::Duration};

use crate::{model::Coordinate, patch::PatchOptions};

/// Top-level configuration stored on disk.
///
/// Every field has a default, so a partial (or missing) file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OpenWeather API key. Takes precedence over `api_key_file`.
    pub api_key: Option<String>,

    /// File holding the API key, relative to `project_dir` unless absolute.
    pub api_key_file: PathBuf,

    pub weather_base_url: String,
    pub geocoder_base_url: String,
    pub user_agent: String,

    /// Port of the local callback server.
    pub port: u16,

    /// Initial map center as `[latitude, longitude]`.
    pub startup_coords: [f64; 2],
    pub startup_zoom: u8,

    pub map_file: PathBuf,

    /// Base directory for the map, coordinate and key files. Defaults to the
    /// current working directory.
    pub project_dir: Option<PathBuf>,

    pub coords_file: PathBuf,
    pub stylesheet: String,
    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_file: PathBuf::from("api_key.txt"),
            weather_base_url: "http://api.openweathermap.org/data/2.5/weather".to_string(),
            geocoder_base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: "InteractiveWeatherMap".to_string(),
            port: 3001,
            startup_coords: [31.083180198360026, 9.307220072053097],
            startup_zoom: 3,
            map_file: PathBuf::from("folium-map.html"),
            project_dir: None,
            coords_file: PathBuf::from("coords.json"),
            stylesheet: "styles.css".to_string(),
            http_timeout_secs: 10,
        }
    }
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, use defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weathermap", "weathermap")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn project_dir(&self) -> Result<PathBuf> {
        match &self.project_dir {
            Some(dir) => Ok(dir.clone()),
            None => env::current_dir().context("Failed to determine current directory"),
        }
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf> {
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Ok(self.project_dir()?.join(path))
        }
    }

    pub fn map_path(&self) -> Result<PathBuf> {
        self.resolve(&self.map_file)
    }

    pub fn coords_path(&self) -> Result<PathBuf> {
        self.resolve(&self.coords_file)
    }

    pub fn startup_center(&self) -> Coordinate {
        Coordinate::new(self.startup_coords[0], self.startup_coords[1])
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn patch_options(&self) -> PatchOptions {
        PatchOptions { port: self.port, stylesheet: self.stylesheet.clone() }
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    /// Returns the API key from the config, falling back to `api_key_file`.
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            return Ok(key.to_string());
        }

        let path = self.resolve(&self.api_key_file)?;
        let key = fs::read_to_string(&path).ok().map(|s| s.trim().to_string()).unwrap_or_default();

        if key.is_empty() {
            return Err(anyhow!(
                "No API key configured (looked in config and {}).\n\
                 Hint: run `weathermap configure` and enter your OpenWeather API key.",
                path.display()
            ));
        }

        Ok(key)
    }
}
