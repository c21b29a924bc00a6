//! Persisted option flags for the frames explorer.
//!
//! Settings live in a small TOML file. Missing keys fall back to their defaults so that older
//! files keep loading after new options are added.

use std::{
    borrow::Cow,
    io::{Read, Write},
    path::{Path, PathBuf},
};

use eyre::Context;
use serde::{Deserialize, Serialize};

/// Location of the fault handler report when none is configured
pub const DEFAULT_FAULT_FILE: &str = "~/Desktop/test.fault";

/// Display mode sessions start in before they report their own
pub const DEFAULT_DISPLAY_MODE: &str = "inline";

/// Frames explorer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Ask the session to leave out its own internal threads when capturing frames
    pub exclude_internal: bool,

    /// Ask the session to capture the local variables of every frame
    pub capture_locals: bool,

    /// Where the fault handler writes its report, and where it is loaded from
    pub fault_file: PathBuf,

    /// Plotting backend shown for a session until it reports its own
    pub default_display_mode: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            exclude_internal: true,
            capture_locals: true,
            fault_file: PathBuf::from(DEFAULT_FAULT_FILE),
            default_display_mode: DEFAULT_DISPLAY_MODE.to_string(),
        }
    }
}

impl Settings {
    pub fn load(mut reader: impl Read) -> eyre::Result<Self> {
        let mut contents = String::new();
        reader
            .read_to_string(&mut contents)
            .wrap_err("reading settings contents")?;
        let settings = toml::from_str(&contents).wrap_err("parsing settings")?;
        Ok(settings)
    }

    pub fn load_from(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let f = std::fs::File::open(path)
            .with_context(|| format!("opening settings file {}", path.display()))?;
        Self::load(f).context("reading from settings file")
    }

    pub fn save(&self, mut writer: impl Write) -> eyre::Result<()> {
        let contents = toml::to_string_pretty(self).context("serialising settings")?;
        writer
            .write_all(contents.as_bytes())
            .context("writing settings")?;
        Ok(())
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> eyre::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating settings directory {}", parent.display()))?;
        }
        let f = std::fs::File::create(path).context("creating file for saving")?;
        self.save(&f).context("saving settings")?;
        Ok(())
    }

    /// The fault file with a leading `~` expanded to the home directory
    pub fn fault_file(&self) -> Cow<'_, Path> {
        normalise_path(&self.fault_file)
    }
}

/// Owns the settings file on disk
pub struct SettingsManager {
    save_path: PathBuf,
    current: Settings,
}

impl SettingsManager {
    /// Load the settings at `path`, writing the defaults there if they cannot be read
    pub fn new(path: impl Into<PathBuf>) -> eyre::Result<Self> {
        let path = path.into();
        let span = tracing::debug_span!("SettingsManager", settings_path = %path.display());
        let _guard = span.enter();

        match Settings::load_from(&path) {
            Ok(current) => {
                tracing::debug!("settings loaded");
                Ok(Self {
                    save_path: path,
                    current,
                })
            }
            Err(e) => {
                tracing::debug!(error = %e, "loading settings file, falling back to defaults");
                let current = Settings::default();
                current.save_to(&path).wrap_err("saving settings file")?;
                Ok(Self {
                    save_path: path,
                    current,
                })
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.save_path
    }

    pub fn current(&self) -> &Settings {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut Settings {
        &mut self.current
    }

    pub fn save(&self) -> eyre::Result<()> {
        self.current
            .save_to(&self.save_path)
            .wrap_err("saving settings")
    }
}

/// Default settings location, under the user's configuration directory
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("frames-explorer").join("settings.toml"))
}

pub fn normalise_path(path: &Path) -> Cow<'_, Path> {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return Cow::Owned(home.join(stripped));
        }
        tracing::warn!("cannot determine home directory, using path as-is");
    }
    Cow::Borrowed(path)
}
