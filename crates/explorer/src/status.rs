//! Status bar toggle for the interactive plotting mode of each session
use std::{collections::HashMap, fmt};

use crate::{executor::SessionExecutor, panel::DuplicateSessionError, types::SessionId};

/// Plotting backend name of a session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayMode(String);

impl DisplayMode {
    pub const INLINE: &'static str = "inline";
    pub const AUTO: &'static str = "auto";

    pub fn new(mode: impl Into<String>) -> Self {
        Self(mode.into())
    }

    pub fn inline() -> Self {
        Self::new(Self::INLINE)
    }

    pub fn auto() -> Self {
        Self::new(Self::AUTO)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The mode a toggle switches to: inline plots become interactive, anything else becomes
    /// inline
    pub fn toggled(&self) -> Self {
        if self.0 == Self::INLINE {
            Self::auto()
        } else {
            Self::inline()
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DisplayMode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

struct ModeEntry {
    mode: DisplayMode,
    /// Native sessions report mode changes themselves
    native_kernel: bool,
    executor: Box<dyn SessionExecutor>,
}

pub struct DisplayModeIndicator {
    sessions: HashMap<SessionId, ModeEntry>,
    active: Option<SessionId>,
    shown: Option<DisplayMode>,
    default_mode: DisplayMode,
}

impl DisplayModeIndicator {
    pub fn new(default_mode: DisplayMode) -> Self {
        Self {
            sessions: HashMap::new(),
            active: None,
            shown: None,
            default_mode,
        }
    }

    pub fn from_settings(settings: &config::Settings) -> Self {
        Self::new(DisplayMode::new(settings.default_display_mode.as_str()))
    }

    pub fn add_session(
        &mut self,
        id: SessionId,
        executor: Box<dyn SessionExecutor>,
        native_kernel: bool,
    ) -> Result<(), DuplicateSessionError> {
        if self.sessions.contains_key(&id) {
            return Err(DuplicateSessionError(id));
        }
        tracing::debug!(session = %id, native_kernel, "tracking display mode");
        self.sessions.insert(
            id,
            ModeEntry {
                mode: self.default_mode.clone(),
                native_kernel,
                executor,
            },
        );
        Ok(())
    }

    pub fn remove(&mut self, id: &SessionId) {
        if self.sessions.remove(id).is_some() && self.active.as_ref() == Some(id) {
            self.active = None;
            self.shown = None;
        }
    }

    pub fn set_active(&mut self, id: &SessionId) {
        let Some(entry) = self.sessions.get(id) else {
            return;
        };
        let mode = entry.mode.clone();
        self.active = Some(id.clone());
        self.update(mode);
    }

    pub fn active(&self) -> Option<&SessionId> {
        self.active.as_ref()
    }

    /// A session that started as external turned out to run the native kernel
    pub fn set_native_kernel(&mut self, id: &SessionId) {
        if let Some(entry) = self.sessions.get_mut(id) {
            entry.native_kernel = true;
        }
    }

    pub fn is_native_kernel(&self, id: &SessionId) -> Option<bool> {
        self.sessions.get(id).map(|e| e.native_kernel)
    }

    pub fn mode(&self, id: &SessionId) -> Option<&DisplayMode> {
        self.sessions.get(id).map(|e| &e.mode)
    }

    /// Set the displayed mode
    pub fn update(&mut self, mode: DisplayMode) {
        self.shown = Some(mode);
    }

    /// A session reported its mode; `None` means the active session
    pub fn update_mode(&mut self, mode: DisplayMode, id: Option<&SessionId>) {
        let Some(id) = id.or(self.active.as_ref()).cloned() else {
            return;
        };
        let Some(entry) = self.sessions.get_mut(&id) else {
            return;
        };
        entry.mode = mode.clone();
        if self.active.as_ref() == Some(&id) {
            self.update(mode);
        }
    }

    /// Switch the active session between inline and interactive plotting
    ///
    /// The new mode is always sent to the session. Native sessions then report it back through
    /// [`update_mode`](Self::update_mode); for the others the indicator records it straight
    /// away. Returns the requested mode.
    pub fn toggle(&mut self) -> Option<DisplayMode> {
        let id = self.active.clone()?;
        let current = self.shown.clone().unwrap_or_else(|| self.default_mode.clone());
        let next = current.toggled();

        let entry = self.sessions.get_mut(&id)?;
        tracing::debug!(session = %id, from = %current, to = %next, "toggling display mode");
        entry.executor.set_display_mode(&next);

        if !entry.native_kernel {
            self.update_mode(next.clone(), Some(&id));
        }
        Some(next)
    }

    pub fn shown(&self) -> Option<&DisplayMode> {
        self.shown.as_ref()
    }

    pub fn text(&self) -> Option<String> {
        self.shown.as_ref().map(|mode| format!("Matplotlib: {mode}"))
    }

    pub fn tooltip(&self) -> &'static str {
        "Matplotlib interactive."
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
