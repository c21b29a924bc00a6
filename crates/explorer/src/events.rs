use crate::types::{FrameLocation, Locals};

/// Request for the host editor to open a source location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigateTo {
    pub filename: String,
    pub lineno: u32,
    /// Extra text the editor may use to find the line, empty when unknown
    pub context_hint: String,
}

impl From<FrameLocation> for NavigateTo {
    fn from(value: FrameLocation) -> Self {
        Self {
            filename: value.filename,
            lineno: value.lineno,
            context_hint: String::new(),
        }
    }
}

/// Events the explorer publishes to its host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Forwarded to the host navigation service
    NavigateTo(NavigateTo),
    /// A frame node was activated, carrying its index within its thread
    FrameActivated { index: usize },
    /// Forwarded to the variable inspector
    ShowNamespace(Locals),
}
