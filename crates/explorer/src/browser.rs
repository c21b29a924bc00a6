use std::path::PathBuf;

use crossbeam_channel::Sender;

use crate::{
    events::Event,
    executor::{BrowserId, FramesReply, RequestToken, SessionExecutor},
    markup::RenderStyle,
    options::ExplorerOptions,
    selection::{SelectionController, SelectionError},
    tree::{FrameTree, NodeId, Rendered, SortToggle},
    types::{Frame, SessionId, Snapshot},
};

/// Name of the single thread shown while stepping through a debugger stack
pub const DEBUGGER_THREAD: &str = "pdb";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserState {
    /// No session attached
    Unbound,
    /// Session attached, tree not built yet
    BoundUninitialized,
    /// Tree built, accepts refresh and selection
    BoundReady,
}

struct Binding {
    session: SessionId,
    executor: Box<dyn SessionExecutor>,
}

/// The frames view of a single session
pub struct FramesBrowser {
    id: BrowserId,
    binding: Option<Binding>,
    tree: Option<FrameTree>,
    snapshot: Option<Snapshot>,
    selection: SelectionController,
    sorting: SortToggle,
    options: ExplorerOptions,
    fault_file: PathBuf,
    style: RenderStyle,
    visible: bool,
    /// Frame activations are forwarded to the session's debugger
    follow_debugger: bool,
    publisher: Sender<Event>,
}

impl FramesBrowser {
    pub fn new(publisher: Sender<Event>, style: RenderStyle, fault_file: PathBuf) -> Self {
        Self {
            id: BrowserId::new(),
            binding: None,
            tree: None,
            snapshot: None,
            selection: SelectionController::new(publisher.clone()),
            sorting: SortToggle::default(),
            options: ExplorerOptions::default(),
            fault_file,
            style,
            visible: false,
            follow_debugger: false,
            publisher,
        }
    }

    pub fn id(&self) -> BrowserId {
        self.id
    }

    pub fn session(&self) -> Option<&SessionId> {
        self.binding.as_ref().map(|b| &b.session)
    }

    pub fn state(&self) -> BrowserState {
        match (&self.binding, &self.tree) {
            (None, _) => BrowserState::Unbound,
            (Some(_), None) => BrowserState::BoundUninitialized,
            (Some(_), Some(_)) => BrowserState::BoundReady,
        }
    }

    /// Attach the session this browser shows
    pub fn bind(&mut self, session: SessionId, executor: Box<dyn SessionExecutor>) {
        tracing::debug!(%session, "binding frames browser");
        self.binding = Some(Binding { session, executor });
    }

    /// Build the view, or refresh it if it has already been built
    pub fn setup(&mut self, options: ExplorerOptions) -> eyre::Result<()> {
        eyre::ensure!(
            self.binding.is_some(),
            "frames browser must be bound to a session before setup"
        );
        self.options = options;

        if self.tree.is_some() {
            self.refresh();
            return Ok(());
        }

        tracing::debug!(session = ?self.session(), "setting up frames browser");
        self.tree = Some(FrameTree::default());
        Ok(())
    }

    /// Release the session
    pub fn close(&mut self) {
        tracing::debug!(session = ?self.session(), "closing frames browser");
        self.binding = None;
        self.tree = None;
        self.snapshot = None;
        self.selection.clear();
        self.follow_debugger = false;
    }

    pub fn options(&self) -> ExplorerOptions {
        self.options
    }

    pub fn set_options(&mut self, options: ExplorerOptions) {
        self.options = options;
    }

    pub fn set_exclude_internal(&mut self, value: bool) {
        self.options.set_exclude_internal(value);
    }

    pub fn set_capture_locals(&mut self, value: bool) {
        self.options.set_capture_locals(value);
    }

    pub fn set_fault_file(&mut self, path: PathBuf) {
        self.fault_file = path;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// The executor, when the browser is ready, shown and connected
    fn live_executor(&mut self, operation: &str) -> Option<(&mut dyn SessionExecutor, RequestToken)> {
        if self.tree.is_none() {
            tracing::debug!(operation, "browser not set up, skipping");
            return None;
        }
        if !self.visible {
            tracing::debug!(operation, "browser hidden, skipping");
            return None;
        }
        let binding = self.binding.as_mut()?;
        if !binding.executor.is_connected() {
            tracing::debug!(operation, session = %binding.session, "session not connected, skipping");
            return None;
        }
        let token = RequestToken {
            session: binding.session.clone(),
            browser: self.id,
        };
        let executor: &mut dyn SessionExecutor = binding.executor.as_mut();
        Some((executor, token))
    }

    /// Ask the session for a new snapshot. Returns whether a request was sent.
    pub fn refresh(&mut self) -> bool {
        let ExplorerOptions {
            exclude_internal,
            capture_locals,
        } = self.options;
        let Some((executor, token)) = self.live_executor("refresh") else {
            return false;
        };
        tracing::debug!(session = %token.session, exclude_internal, capture_locals, "requesting frames");
        executor.get_current_frames(token, exclude_internal, capture_locals);
        true
    }

    pub fn enable_fault_capture(&mut self) -> bool {
        let path = config::normalise_path(&self.fault_file).into_owned();
        let Some((executor, _)) = self.live_executor("enable fault capture") else {
            return false;
        };
        tracing::debug!(path = %path.display(), "enabling fault handler");
        executor.enable_fault_handler(&path);
        true
    }

    pub fn load_fault_capture(&mut self) -> bool {
        let path = config::normalise_path(&self.fault_file).into_owned();
        let exclude_internal = self.options.exclude_internal;
        let Some((executor, token)) = self.live_executor("load fault capture") else {
            return false;
        };
        tracing::debug!(path = %path.display(), "loading fault handler result");
        executor.load_fault_handler_result(token, &path, exclude_internal);
        true
    }

    /// Apply a reply if it was addressed to this browser and its current session
    pub fn apply_reply(&mut self, reply: FramesReply) -> bool {
        let FramesReply { token, snapshot } = reply;
        if token.browser != self.id || self.session() != Some(&token.session) {
            tracing::debug!(session = %token.session, "reply not addressed to this browser");
            return false;
        }
        self.set_frames(snapshot)
    }

    /// Replace the rendered tree with a new snapshot
    ///
    /// Ignored until the browser has been set up. Stops forwarding frame activations to the
    /// debugger.
    pub fn set_frames(&mut self, snapshot: Snapshot) -> bool {
        if self.tree.is_none() {
            tracing::debug!("browser not set up, dropping frames");
            return false;
        }

        let Rendered {
            tree,
            auto_navigate,
        } = FrameTree::render(&snapshot, &self.style);
        self.tree = Some(tree);
        self.snapshot = Some(snapshot);
        self.selection.clear();

        if let Some(nav) = auto_navigate {
            let _ = self.publisher.send(Event::NavigateTo(nav));
        }

        self.unfollow_debugger();
        true
    }

    /// Show the stack of a paused step debugger, selecting its current frame
    ///
    /// Activating a frame afterwards moves the debugger to that frame, until the next
    /// snapshot replaces this one.
    pub fn refresh_from_debugger(&mut self, stack: Vec<Frame>, current_index: usize) {
        if !self.set_frames(Snapshot::new().with_thread(DEBUGGER_THREAD, stack)) {
            return;
        }
        if let Err(e) = self.set_current(0, current_index) {
            tracing::warn!(error = %e, "selecting current debugger frame");
        }
        self.follow_debugger = true;
    }

    /// Show the traceback of an exception as a single thread named after it
    pub fn refresh_traceback(&mut self, exception_name: &str, frames: Vec<Frame>) {
        self.set_frames(Snapshot::new().with_thread(exception_name, frames));
    }

    fn unfollow_debugger(&mut self) {
        if self.follow_debugger {
            tracing::debug!("no longer forwarding frame activations to the debugger");
        }
        self.follow_debugger = false;
    }

    pub fn is_following_debugger(&self) -> bool {
        self.follow_debugger
    }

    pub fn tree(&self) -> Option<&FrameTree> {
        self.tree.as_ref()
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selection.current()
    }

    pub fn activate(&mut self, node: NodeId) -> Option<usize> {
        let tree = self.tree.as_ref()?;
        let index = self.selection.activate(tree, node)?;
        if self.follow_debugger {
            if let Some(binding) = self.binding.as_mut() {
                binding.executor.set_debugger_frame_index(index);
            }
        }
        Some(index)
    }

    pub fn inspect_locals(&self, node: NodeId) -> bool {
        self.tree
            .as_ref()
            .is_some_and(|tree| self.selection.inspect_locals(tree, node))
    }

    /// Show the locals of the selected frame
    pub fn inspect_current(&self) -> bool {
        self.tree
            .as_ref()
            .is_some_and(|tree| self.selection.inspect_current(tree))
    }

    pub fn set_current(
        &mut self,
        thread_index: usize,
        frame_index: usize,
    ) -> Result<NodeId, SelectionError> {
        let tree = self.tree.as_ref().ok_or(SelectionError::NotRendered)?;
        self.selection.set_current(tree, thread_index, frame_index)
    }

    /// A column header was clicked
    pub fn sort_by_header(&mut self) {
        self.sorting.enable();
    }

    pub fn sorting(&self) -> SortToggle {
        self.sorting
    }

    /// Nodes in display order
    pub fn rows(&self) -> Vec<NodeId> {
        self.tree
            .as_ref()
            .map(|tree| tree.visible_order(self.sorting))
            .unwrap_or_default()
    }

    pub fn plain_lines(&self) -> Vec<String> {
        self.tree
            .as_ref()
            .map(|tree| tree.plain_lines(self.sorting))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ExecutorCall, MockExecutor};
    use crossbeam_channel::Receiver;

    fn bound_browser() -> (FramesBrowser, MockExecutor, Receiver<Event>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mock = MockExecutor::new();
        let mut browser = FramesBrowser::new(tx, RenderStyle::default(), PathBuf::from("/tmp/f"));
        browser.bind(SessionId::from("s1"), Box::new(mock.clone()));
        (browser, mock, rx)
    }

    fn ready_browser() -> (FramesBrowser, MockExecutor, Receiver<Event>) {
        let (mut browser, mock, rx) = bound_browser();
        browser.setup(ExplorerOptions::default()).unwrap();
        browser.set_visible(true);
        (browser, mock, rx)
    }

    fn stack() -> Vec<Frame> {
        vec![
            Frame::new("outer.py", 3, "main()", "<module>"),
            Frame::new("inner.py", 7, "x = 1", "main").with_locals([("x", "1")]),
        ]
    }

    #[test]
    fn state_machine() {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let mut browser = FramesBrowser::new(tx, RenderStyle::default(), PathBuf::new());
        assert_eq!(browser.state(), BrowserState::Unbound);
        assert!(browser.setup(ExplorerOptions::default()).is_err());

        browser.bind(SessionId::from("s"), Box::new(MockExecutor::new()));
        assert_eq!(browser.state(), BrowserState::BoundUninitialized);

        browser.setup(ExplorerOptions::default()).unwrap();
        assert_eq!(browser.state(), BrowserState::BoundReady);

        browser.close();
        assert_eq!(browser.state(), BrowserState::Unbound);
    }

    #[test]
    fn first_setup_does_not_refresh_second_does() {
        let (mut browser, mock, _rx) = bound_browser();
        browser.set_visible(true);

        browser.setup(ExplorerOptions::default()).unwrap();
        assert!(mock.calls().is_empty());

        let options = ExplorerOptions {
            exclude_internal: false,
            capture_locals: true,
        };
        browser.setup(options).unwrap();
        assert_eq!(browser.state(), BrowserState::BoundReady);
        assert_eq!(
            mock.calls(),
            [ExecutorCall::GetCurrentFrames {
                token: RequestToken {
                    session: SessionId::from("s1"),
                    browser: browser.id(),
                },
                exclude_internal: false,
                capture_locals: true,
            }]
        );
    }

    #[test]
    fn refresh_skipped_while_hidden_or_disconnected() {
        let (mut browser, mock, _rx) = ready_browser();

        browser.set_visible(false);
        assert!(!browser.refresh());

        browser.set_visible(true);
        mock.set_connected(false);
        assert!(!browser.refresh());
        assert!(!browser.enable_fault_capture());
        assert!(!browser.load_fault_capture());
        assert!(mock.calls().is_empty());

        mock.set_connected(true);
        assert!(browser.refresh());
        assert_eq!(mock.calls().len(), 1);
    }

    #[test]
    fn refresh_uses_current_options() {
        let (mut browser, mock, _rx) = ready_browser();
        browser.set_capture_locals(false);
        browser.refresh();

        let Some(ExecutorCall::GetCurrentFrames {
            exclude_internal,
            capture_locals,
            ..
        }) = mock.calls().pop()
        else {
            panic!("expected a frames request");
        };
        assert!(exclude_internal);
        assert!(!capture_locals);
    }

    #[test]
    fn fault_capture_requests() {
        let (mut browser, mock, _rx) = ready_browser();
        browser.set_exclude_internal(false);

        assert!(browser.enable_fault_capture());
        assert!(browser.load_fault_capture());

        let calls = mock.calls();
        assert_eq!(
            calls[0],
            ExecutorCall::EnableFaultHandler {
                path: PathBuf::from("/tmp/f")
            }
        );
        assert!(matches!(
            &calls[1],
            ExecutorCall::LoadFaultHandlerResult { path, exclude_internal: false, .. }
                if path == &PathBuf::from("/tmp/f")
        ));
    }

    #[test]
    fn reply_renders_tree_and_navigates() {
        let (mut browser, mock, rx) = ready_browser();
        browser.refresh();

        let reply = mock
            .reply(Snapshot::new().with_thread("MainThread", stack()))
            .unwrap();
        assert!(browser.apply_reply(reply));

        let tree = browser.tree().unwrap();
        assert_eq!(tree.thread_count(), 1);
        assert_eq!(tree.frame_count(), 2);

        let Ok(Event::NavigateTo(nav)) = rx.try_recv() else {
            panic!("expected navigation");
        };
        assert_eq!((nav.filename.as_str(), nav.lineno), ("inner.py", 7));
    }

    #[test]
    fn reply_for_another_browser_is_ignored() {
        let (mut browser, _mock, _rx) = ready_browser();
        let reply = FramesReply {
            token: RequestToken {
                session: SessionId::from("s1"),
                browser: BrowserId::new(),
            },
            snapshot: Snapshot::new().with_thread("t", vec![]),
        };
        assert!(!browser.apply_reply(reply));
        assert!(browser.tree().unwrap().is_empty());
    }

    #[test]
    fn frames_before_setup_are_dropped() {
        let (mut browser, _mock, rx) = bound_browser();
        assert!(!browser.set_frames(Snapshot::new().with_thread("MainThread", stack())));
        assert!(browser.tree().is_none());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn new_frames_clear_selection() {
        let (mut browser, _mock, _rx) = ready_browser();
        browser.set_frames(Snapshot::new().with_thread("t", stack()));
        browser.set_current(0, 1).unwrap();
        assert!(browser.selected().is_some());

        browser.set_frames(Snapshot::new().with_thread("t", stack()));
        assert!(browser.selected().is_none());
    }

    #[test]
    fn debugger_stack_follows_activation_until_next_snapshot() {
        let (mut browser, mock, _rx) = ready_browser();

        browser.refresh_from_debugger(stack(), 1);
        assert!(browser.is_following_debugger());
        assert_eq!(browser.selected(), browser.tree().unwrap().frame_at(0, 1));
        assert_eq!(browser.plain_lines()[0], DEBUGGER_THREAD);

        let first = browser.tree().unwrap().frame_at(0, 0).unwrap();
        assert_eq!(browser.activate(first), Some(0));
        assert_eq!(
            mock.take_calls(),
            [ExecutorCall::SetDebuggerFrameIndex { index: 0 }]
        );

        browser.set_frames(Snapshot::new().with_thread("t", stack()));
        assert!(!browser.is_following_debugger());
        let first = browser.tree().unwrap().frame_at(0, 0).unwrap();
        browser.activate(first);
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn unfollowing_without_subscription_is_harmless() {
        let (mut browser, _mock, _rx) = ready_browser();
        assert!(!browser.is_following_debugger());
        browser.set_frames(Snapshot::new());
        browser.set_frames(Snapshot::new());
        assert!(!browser.is_following_debugger());
    }

    #[test]
    fn debugger_index_out_of_range_keeps_stack() {
        let (mut browser, _mock, _rx) = ready_browser();
        browser.refresh_from_debugger(stack(), 10);
        assert_eq!(browser.tree().unwrap().frame_count(), 2);
        assert!(browser.selected().is_none());
    }

    #[test]
    fn traceback_named_after_exception() {
        let (mut browser, _mock, _rx) = ready_browser();
        browser.refresh_traceback("ZeroDivisionError", stack());
        assert_eq!(browser.plain_lines()[0], "ZeroDivisionError");
    }

    #[test]
    fn inspect_selected_frame() {
        let (mut browser, _mock, rx) = ready_browser();
        browser.set_frames(Snapshot::new().with_thread("t", stack()));

        assert!(!browser.inspect_current());
        browser.set_current(0, 1).unwrap();
        assert!(browser.inspect_current());
        assert!(matches!(rx.try_recv(), Ok(Event::ShowNamespace(_))));
    }

    #[test]
    fn sorting_persists_across_refreshes() {
        let (mut browser, _mock, _rx) = ready_browser();
        let snapshot = Snapshot::new()
            .with_thread("b", vec![])
            .with_thread("a", vec![]);

        browser.set_frames(snapshot.clone());
        assert_eq!(browser.plain_lines(), ["b", "  idle", "a", "  idle"]);

        browser.sort_by_header();
        browser.set_frames(snapshot);
        assert!(browser.sorting().is_enabled());
        assert_eq!(browser.plain_lines(), ["a", "  idle", "b", "  idle"]);
    }

    #[test]
    fn selection_before_setup_fails() {
        let (mut browser, _mock, _rx) = bound_browser();
        assert_eq!(browser.set_current(0, 0), Err(SelectionError::NotRendered));
    }
}
