use std::path::{Path, PathBuf};

use crossbeam_channel::Sender;
use explorer::{DisplayMode, FramesReply, RequestToken, SessionExecutor, Snapshot};

/// Executor backed by snapshot files on disk instead of a live session
///
/// Replies are queued on a channel and delivered to the explorer by the caller.
pub(crate) struct FileExecutor {
    snapshot_path: PathBuf,
    replies: Sender<FramesReply>,
}

impl FileExecutor {
    pub(crate) fn new(snapshot_path: impl Into<PathBuf>, replies: Sender<FramesReply>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            replies,
        }
    }

    fn reply_from(&self, token: RequestToken, path: &Path, capture_locals: bool) {
        let snapshot = match Snapshot::from_path(path) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "loading snapshot");
                return;
            }
        };
        let snapshot = if capture_locals {
            snapshot
        } else {
            snapshot.without_locals()
        };
        let _ = self.replies.send(FramesReply { token, snapshot });
    }
}

impl SessionExecutor for FileExecutor {
    fn is_connected(&self) -> bool {
        self.snapshot_path.is_file()
    }

    fn get_current_frames(
        &mut self,
        token: RequestToken,
        exclude_internal: bool,
        capture_locals: bool,
    ) {
        // captures on disk were already filtered when they were taken
        tracing::debug!(exclude_internal, capture_locals, "reading frames");
        let path = self.snapshot_path.clone();
        self.reply_from(token, &path, capture_locals);
    }

    fn enable_fault_handler(&mut self, path: &Path) {
        tracing::warn!(path = %path.display(), "snapshot files cannot enable the fault handler");
    }

    fn load_fault_handler_result(
        &mut self,
        token: RequestToken,
        path: &Path,
        exclude_internal: bool,
    ) {
        tracing::debug!(path = %path.display(), exclude_internal, "reading fault report");
        self.reply_from(token, path, true);
    }

    fn set_debugger_frame_index(&mut self, index: usize) {
        tracing::debug!(index, "no debugger attached to a snapshot file");
    }

    fn set_display_mode(&mut self, mode: &DisplayMode) {
        tracing::debug!(%mode, "no display for a snapshot file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use explorer::{FramesExplorer, SessionId};

    const SNAPSHOT: &str = r#"[
        {"name": "MainThread", "frames": [
            {"filename": "app.py", "line": "run()", "lineno": 12, "name": "<module>",
             "locals": {"argv": "['app.py']"}}
        ]}
    ]"#;

    #[test]
    fn refresh_reads_snapshot_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, SNAPSHOT).unwrap();

        let (tx, rx) = crossbeam_channel::unbounded();
        let mut explorer = FramesExplorer::default();
        let session = SessionId::from("file");
        explorer
            .add_session(session.clone(), Box::new(FileExecutor::new(&path, tx)))
            .unwrap();
        explorer.set_active(&session);
        explorer.set_visible(true);
        explorer.set_capture_locals(false);

        assert!(explorer.refresh());
        let reply = rx.try_recv().unwrap();
        let frame = &reply.snapshot.threads()[0].frames[0];
        assert!(frame.locals.is_none());
        assert!(explorer.handle_reply(reply));
    }

    #[test]
    fn missing_file_is_not_connected() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut explorer = FramesExplorer::default();
        let session = SessionId::from("file");
        explorer
            .add_session(
                session.clone(),
                Box::new(FileExecutor::new("/nonexistent/frames-explorer.json", tx)),
            )
            .unwrap();
        explorer.set_active(&session);
        explorer.set_visible(true);

        assert!(!explorer.refresh());
        assert!(!explorer.load_fault_capture());
        assert!(rx.try_recv().is_err());
    }
}
