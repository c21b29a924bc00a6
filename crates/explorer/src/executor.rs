use std::path::Path;

use crate::{
    status::DisplayMode,
    types::{SessionId, Snapshot},
};

/// Identity of one browser instance
///
/// A session that is removed and registered again gets a new browser with a new id, so replies
/// addressed to the old one can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BrowserId(uuid::Uuid);

impl BrowserId {
    pub(crate) fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

/// Sent with every request that produces a snapshot, and returned with the reply
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestToken {
    pub session: SessionId,
    pub browser: BrowserId,
}

/// A snapshot delivered by the executor for an earlier request
#[derive(Debug, Clone)]
pub struct FramesReply {
    pub token: RequestToken,
    pub snapshot: Snapshot,
}

/// Handle onto the process running a session
///
/// Requests are fire and forget. Replies for requests that carry a [`RequestToken`] are
/// delivered later, on the same thread, through
/// [`FramesExplorer::handle_reply`](crate::FramesExplorer::handle_reply).
pub trait SessionExecutor {
    /// Whether there is a live connection to the session
    fn is_connected(&self) -> bool;

    fn get_current_frames(
        &mut self,
        token: RequestToken,
        exclude_internal: bool,
        capture_locals: bool,
    );

    /// Start writing fault handler reports to `path`
    fn enable_fault_handler(&mut self, path: &Path);

    fn load_fault_handler_result(
        &mut self,
        token: RequestToken,
        path: &Path,
        exclude_internal: bool,
    );

    /// Move the session's step debugger to another frame of its stack
    fn set_debugger_frame_index(&mut self, index: usize);

    fn set_display_mode(&mut self, mode: &DisplayMode);
}
