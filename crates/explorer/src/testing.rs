//! Testing utilities
//!
//! [`MockExecutor`] records every request it receives instead of talking to a session. Clones
//! share the same record, so a test can keep one clone and hand another to the explorer.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{
    executor::{FramesReply, RequestToken, SessionExecutor},
    status::DisplayMode,
    types::Snapshot,
};

/// A request received by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorCall {
    GetCurrentFrames {
        token: RequestToken,
        exclude_internal: bool,
        capture_locals: bool,
    },
    EnableFaultHandler {
        path: PathBuf,
    },
    LoadFaultHandlerResult {
        token: RequestToken,
        path: PathBuf,
        exclude_internal: bool,
    },
    SetDebuggerFrameIndex {
        index: usize,
    },
    SetDisplayMode {
        mode: DisplayMode,
    },
}

#[derive(Debug)]
struct MockState {
    connected: bool,
    calls: Vec<ExecutorCall>,
}

#[derive(Debug, Clone)]
pub struct MockExecutor {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExecutor {
    /// A connected executor
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                connected: true,
                calls: Vec::new(),
            })),
        }
    }

    /// An executor whose session has not connected yet
    pub fn disconnected() -> Self {
        let mock = Self::new();
        mock.set_connected(false);
        mock
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock executor lock poisoned")
    }

    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }

    pub fn calls(&self) -> Vec<ExecutorCall> {
        self.lock().calls.clone()
    }

    pub fn take_calls(&self) -> Vec<ExecutorCall> {
        std::mem::take(&mut self.lock().calls)
    }

    /// Token of the most recent request that expects a snapshot back
    pub fn last_token(&self) -> Option<RequestToken> {
        self.lock().calls.iter().rev().find_map(|call| match call {
            ExecutorCall::GetCurrentFrames { token, .. }
            | ExecutorCall::LoadFaultHandlerResult { token, .. } => Some(token.clone()),
            _ => None,
        })
    }

    /// Build the reply to the most recent snapshot request
    pub fn reply(&self, snapshot: Snapshot) -> Option<FramesReply> {
        self.last_token()
            .map(|token| FramesReply { token, snapshot })
    }

    /// Display modes forwarded so far, oldest first
    pub fn display_modes(&self) -> Vec<DisplayMode> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                ExecutorCall::SetDisplayMode { mode } => Some(mode.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ExecutorCall) {
        tracing::trace!(?call, "mock executor received call");
        self.lock().calls.push(call);
    }
}

impl SessionExecutor for MockExecutor {
    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    fn get_current_frames(
        &mut self,
        token: RequestToken,
        exclude_internal: bool,
        capture_locals: bool,
    ) {
        self.record(ExecutorCall::GetCurrentFrames {
            token,
            exclude_internal,
            capture_locals,
        });
    }

    fn enable_fault_handler(&mut self, path: &Path) {
        self.record(ExecutorCall::EnableFaultHandler {
            path: path.to_path_buf(),
        });
    }

    fn load_fault_handler_result(
        &mut self,
        token: RequestToken,
        path: &Path,
        exclude_internal: bool,
    ) {
        self.record(ExecutorCall::LoadFaultHandlerResult {
            token,
            path: path.to_path_buf(),
            exclude_internal,
        });
    }

    fn set_debugger_frame_index(&mut self, index: usize) {
        self.record(ExecutorCall::SetDebuggerFrameIndex { index });
    }

    fn set_display_mode(&mut self, mode: &DisplayMode) {
        self.record(ExecutorCall::SetDisplayMode { mode: mode.clone() });
    }
}
