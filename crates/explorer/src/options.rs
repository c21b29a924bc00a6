use config::Settings;

/// Options applied to every session's browser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplorerOptions {
    pub exclude_internal: bool,
    pub capture_locals: bool,
}

impl Default for ExplorerOptions {
    fn default() -> Self {
        Self {
            exclude_internal: true,
            capture_locals: true,
        }
    }
}

impl ExplorerOptions {
    pub fn set_exclude_internal(&mut self, value: bool) {
        self.exclude_internal = value;
    }

    pub fn set_capture_locals(&mut self, value: bool) {
        self.capture_locals = value;
    }

    pub fn get(&self, option: ExplorerOption) -> bool {
        match option {
            ExplorerOption::ExcludeInternal => self.exclude_internal,
            ExplorerOption::CaptureLocals => self.capture_locals,
        }
    }

    pub fn set(&mut self, option: ExplorerOption, value: bool) {
        match option {
            ExplorerOption::ExcludeInternal => self.set_exclude_internal(value),
            ExplorerOption::CaptureLocals => self.set_capture_locals(value),
        }
    }
}

impl From<&Settings> for ExplorerOptions {
    fn from(value: &Settings) -> Self {
        Self {
            exclude_internal: value.exclude_internal,
            capture_locals: value.capture_locals,
        }
    }
}

/// The toggles shown in the options menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExplorerOption {
    ExcludeInternal,
    CaptureLocals,
}

impl ExplorerOption {
    pub const ALL: [ExplorerOption; 2] = [Self::ExcludeInternal, Self::CaptureLocals];

    pub fn label(self) -> &'static str {
        match self {
            ExplorerOption::ExcludeInternal => "Exclude internal threads",
            ExplorerOption::CaptureLocals => "Capture frames locals",
        }
    }

    /// Key of the option in the settings file
    pub fn key(self) -> &'static str {
        match self {
            ExplorerOption::ExcludeInternal => "exclude_internal",
            ExplorerOption::CaptureLocals => "capture_locals",
        }
    }
}
