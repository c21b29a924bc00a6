//! Model behind the frames explorer panel
//!
//! Shows the call stacks of one or more live sessions, lets the user inspect the locals of a
//! frame and jump to its source. Everything that talks to the running process goes through the
//! [`SessionExecutor`] trait; this crate only issues requests and renders the replies.
mod browser;
mod events;
mod executor;
pub mod markup;
mod options;
mod panel;
mod selection;
mod status;
pub mod tree;
mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use browser::{BrowserState, DEBUGGER_THREAD, FramesBrowser};
pub use events::{Event, NavigateTo};
pub use executor::{BrowserId, FramesReply, RequestToken, SessionExecutor};
pub use markup::RenderStyle;
pub use options::{ExplorerOption, ExplorerOptions};
pub use panel::{Action, ActionDescriptor, DuplicateSessionError, FramesExplorer};
pub use selection::{SelectionController, SelectionError};
pub use status::{DisplayMode, DisplayModeIndicator};
pub use tree::{FrameEntry, FrameTree, Node, NodeId, NodeKind, Rendered, SortToggle};
pub use types::{Frame, FrameLocation, Locals, MAIN_THREAD, SessionId, Snapshot, ThreadStack};
