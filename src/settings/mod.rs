use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::crusher::CrusherParams;
use crate::io::wav::OutputFormat;

const DEFAULT_BLOCK_SIZE: usize = 128;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Parameters a new session starts with.
    pub crusher: CrusherParams,
    /// Frames per processing block.
    pub block_size: usize,
    pub output_dir: String,
    pub output_format: OutputFormat,
}

impl std::fmt::Display for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "------------------------------")?;
        writeln!(f, "Bit Depth: {}", self.crusher.bit_depth())?;
        writeln!(f, "Downsample Factor: {}", self.crusher.downsample())?;
        writeln!(f, "Block Size: {}", self.block_size)?;
        writeln!(f, "Output Directory: {}", self.output_dir)?;
        writeln!(f, "Output Format: {}", self.output_format)?;
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            crusher: CrusherParams::default(),
            block_size: DEFAULT_BLOCK_SIZE,
            output_dir: "./renders".to_string(),
            output_format: OutputFormat::default(),
        }
    }
}

impl Settings {
    /// Loads from the user config directory, writing defaults there if nothing exists yet.
    pub fn load() -> Result<Self> {
        let settings_path = Self::get_settings_path();

        if settings_path.exists() {
            Self::load_from(&settings_path)
        } else {
            info!("No settings file found, using defaults");
            let settings = Self::default();
            // Try to save defaults, but don't fail if we can't
            let _ = settings.save();
            Ok(settings)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let mut settings: Self =
            serde_json::from_str(&contents).context("Failed to parse settings")?;
        if settings.block_size == 0 {
            settings.block_size = DEFAULT_BLOCK_SIZE;
        }

        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_settings_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure the config directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;

        fs::write(path, json).context("Failed to write settings file")?;

        debug!("Saved settings to {:?}", path);
        Ok(())
    }

    pub fn get_settings_path() -> PathBuf {
        const SETTINGS_FILENAME: &str = "settings.json";

        if let Ok(config_dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(config_dir)
                .join("bitcrusher")
                .join(SETTINGS_FILENAME)
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("bitcrusher")
                .join(SETTINGS_FILENAME)
        } else {
            // Fallback to current directory
            PathBuf::from(".").join(SETTINGS_FILENAME)
        }
    }
}
