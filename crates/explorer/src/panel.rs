use std::{collections::HashMap, path::PathBuf};

use crossbeam_channel::{Receiver, Sender};

use crate::{
    browser::FramesBrowser,
    events::Event,
    executor::{BrowserId, FramesReply, SessionExecutor},
    markup::RenderStyle,
    options::{ExplorerOption, ExplorerOptions},
    selection::SelectionError,
    tree::NodeId,
    types::{Frame, SessionId},
};

/// A session with this id is already registered
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("session {0} is already registered")]
pub struct DuplicateSessionError(pub SessionId);

/// Toolbar and options menu entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Refresh,
    EnableFaultCapture,
    LoadFaultCapture,
    Toggle(ExplorerOption),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDescriptor {
    pub action: Action,
    pub label: &'static str,
    /// Check state for toggles
    pub checked: Option<bool>,
}

/// Frames explorer panel holding one browser per registered session
///
/// Only the active session's browser is shown. Toolbar actions go to that browser, option
/// changes go to all of them.
pub struct FramesExplorer {
    /// Browsers in registration order
    browsers: Vec<FramesBrowser>,
    registry: HashMap<SessionId, BrowserId>,
    active: Option<SessionId>,
    visible: bool,
    options: ExplorerOptions,
    fault_file: PathBuf,
    style: RenderStyle,
    publisher: Sender<Event>,
    events: Receiver<Event>,
}

impl Default for FramesExplorer {
    fn default() -> Self {
        Self::new(RenderStyle::default(), &config::Settings::default())
    }
}

impl FramesExplorer {
    pub fn new(style: RenderStyle, settings: &config::Settings) -> Self {
        let (publisher, events) = crossbeam_channel::unbounded();
        Self {
            browsers: Vec::new(),
            registry: HashMap::new(),
            active: None,
            visible: false,
            options: ExplorerOptions::from(settings),
            fault_file: settings.fault_file.clone(),
            style,
            publisher,
            events,
        }
    }

    /// Receiver of navigation, activation and namespace events for the host
    pub fn events(&self) -> Receiver<Event> {
        self.events.clone()
    }

    /// Register a session and build its browser
    ///
    /// The new browser does not become the active one.
    #[tracing::instrument(skip(self, executor))]
    pub fn add_session(
        &mut self,
        id: SessionId,
        executor: Box<dyn SessionExecutor>,
    ) -> Result<&mut FramesBrowser, DuplicateSessionError> {
        if self.registry.contains_key(&id) {
            tracing::warn!("session already registered");
            return Err(DuplicateSessionError(id));
        }

        let mut browser = FramesBrowser::new(
            self.publisher.clone(),
            self.style.clone(),
            self.fault_file.clone(),
        );
        browser.bind(id.clone(), executor);
        if let Err(e) = browser.setup(self.options) {
            tracing::warn!(error = %e, "setting up frames browser");
        }

        tracing::debug!("registered session");
        self.registry.insert(id, browser.id());
        self.browsers.push(browser);
        let index = self.browsers.len() - 1;
        Ok(&mut self.browsers[index])
    }

    /// Unregister a session. Unknown ids are ignored, not every session can be inspected.
    #[tracing::instrument(skip(self))]
    pub fn remove_session(&mut self, id: &SessionId) {
        let Some(browser_id) = self.registry.remove(id) else {
            return;
        };
        if let Some(pos) = self.browsers.iter().position(|b| b.id() == browser_id) {
            let mut browser = self.browsers.remove(pos);
            browser.close();
        }
        if self.active.as_ref() == Some(id) {
            self.active = None;
        }
        tracing::debug!("removed session");
    }

    /// Show the browser of a session. Unknown ids are ignored.
    pub fn set_active(&mut self, id: &SessionId) {
        if !self.registry.contains_key(id) {
            return;
        }
        tracing::debug!(session = %id, "switching active session");
        self.active = Some(id.clone());
        self.sync_visibility();
    }

    pub fn active_session(&self) -> Option<&SessionId> {
        self.active.as_ref()
    }

    /// Number of registered sessions
    pub fn active_session_count(&self) -> usize {
        self.registry.len()
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.registry.contains_key(id)
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// The panel was shown or hidden
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.sync_visibility();
    }

    fn sync_visibility(&mut self) {
        let shown = self
            .active
            .as_ref()
            .and_then(|id| self.registry.get(id))
            .copied()
            .filter(|_| self.visible);
        for browser in &mut self.browsers {
            browser.set_visible(Some(browser.id()) == shown);
        }
    }

    pub fn browser(&self, id: &SessionId) -> Option<&FramesBrowser> {
        let browser_id = self.registry.get(id)?;
        self.browsers.iter().find(|b| b.id() == *browser_id)
    }

    pub fn browser_mut(&mut self, id: &SessionId) -> Option<&mut FramesBrowser> {
        let browser_id = *self.registry.get(id)?;
        self.browsers.iter_mut().find(|b| b.id() == browser_id)
    }

    pub fn active_browser(&self) -> Option<&FramesBrowser> {
        self.browser(self.active.as_ref()?)
    }

    pub fn active_browser_mut(&mut self) -> Option<&mut FramesBrowser> {
        let id = self.active.clone()?;
        self.browser_mut(&id)
    }

    pub fn options(&self) -> ExplorerOptions {
        self.options
    }

    /// Change an option on every registered browser
    pub fn set_option(&mut self, option: ExplorerOption, value: bool) {
        tracing::debug!(option = option.key(), value, "option changed");
        self.options.set(option, value);
        for browser in &mut self.browsers {
            browser.set_options(self.options);
        }
    }

    pub fn set_exclude_internal(&mut self, value: bool) {
        self.set_option(ExplorerOption::ExcludeInternal, value);
    }

    pub fn set_capture_locals(&mut self, value: bool) {
        self.set_option(ExplorerOption::CaptureLocals, value);
    }

    /// Apply settings loaded from disk. Every browser that is already set up refreshes.
    pub fn apply_settings(&mut self, settings: &config::Settings) {
        self.options = ExplorerOptions::from(settings);
        self.fault_file = settings.fault_file.clone();
        for browser in &mut self.browsers {
            browser.set_fault_file(self.fault_file.clone());
            if let Err(e) = browser.setup(self.options) {
                tracing::warn!(error = %e, "applying settings to frames browser");
            }
        }
    }

    /// Entries for the toolbar and options menu of the active session
    pub fn actions(&self) -> Vec<ActionDescriptor> {
        if self.active_browser().is_none() {
            return Vec::new();
        }

        let mut actions = vec![
            ActionDescriptor {
                action: Action::Refresh,
                label: "Refresh frames",
                checked: None,
            },
            ActionDescriptor {
                action: Action::EnableFaultCapture,
                label: "Enable Faulthandler",
                checked: None,
            },
            ActionDescriptor {
                action: Action::LoadFaultCapture,
                label: "Load Faulthandler",
                checked: None,
            },
        ];
        actions.extend(ExplorerOption::ALL.into_iter().map(|option| ActionDescriptor {
            action: Action::Toggle(option),
            label: option.label(),
            checked: Some(self.options.get(option)),
        }));
        actions
    }

    /// Run a toolbar or menu action. Returns whether a request reached a session.
    pub fn trigger(&mut self, action: Action) -> bool {
        match action {
            Action::Refresh => self.refresh(),
            Action::EnableFaultCapture => self.enable_fault_capture(),
            Action::LoadFaultCapture => self.load_fault_capture(),
            Action::Toggle(option) => {
                let value = !self.options.get(option);
                self.set_option(option, value);
                false
            }
        }
    }

    pub fn refresh(&mut self) -> bool {
        self.active_browser_mut()
            .is_some_and(|browser| browser.refresh())
    }

    pub fn enable_fault_capture(&mut self) -> bool {
        self.active_browser_mut()
            .is_some_and(|browser| browser.enable_fault_capture())
    }

    pub fn load_fault_capture(&mut self) -> bool {
        self.active_browser_mut()
            .is_some_and(|browser| browser.load_fault_capture())
    }

    /// Deliver a snapshot reply
    ///
    /// The reply is applied only if its session is still registered with the same browser that
    /// sent the request. Anything else is a late reply and is dropped.
    pub fn handle_reply(&mut self, reply: FramesReply) -> bool {
        let session = &reply.token.session;
        if self.registry.get(session) != Some(&reply.token.browser) {
            tracing::debug!(%session, "discarding stale frames reply");
            return false;
        }
        match self.browser_mut(&reply.token.session) {
            Some(browser) => browser.apply_reply(reply),
            None => false,
        }
    }

    /// A session's step debugger paused
    pub fn refresh_from_debugger(&mut self, id: &SessionId, stack: Vec<Frame>, current_index: usize) {
        if let Some(browser) = self.browser_mut(id) {
            browser.refresh_from_debugger(stack, current_index);
        }
    }

    /// A session raised an exception
    pub fn refresh_traceback(&mut self, id: &SessionId, exception_name: &str, frames: Vec<Frame>) {
        if let Some(browser) = self.browser_mut(id) {
            browser.refresh_traceback(exception_name, frames);
        }
    }

    pub fn activate(&mut self, node: NodeId) -> Option<usize> {
        self.active_browser_mut()?.activate(node)
    }

    pub fn inspect_locals(&self, node: NodeId) -> bool {
        self.active_browser()
            .is_some_and(|browser| browser.inspect_locals(node))
    }

    pub fn set_current(
        &mut self,
        thread_index: usize,
        frame_index: usize,
    ) -> Result<NodeId, SelectionError> {
        self.active_browser_mut()
            .ok_or(SelectionError::NoActiveSession)?
            .set_current(thread_index, frame_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockExecutor;

    fn explorer() -> FramesExplorer {
        let mut explorer = FramesExplorer::default();
        explorer.set_visible(true);
        explorer
    }

    #[test]
    fn duplicate_registration_leaves_registry_unchanged() {
        let mut explorer = explorer();
        let first = explorer
            .add_session(SessionId::from("s1"), Box::new(MockExecutor::new()))
            .unwrap()
            .id();

        let err = explorer
            .add_session(SessionId::from("s1"), Box::new(MockExecutor::new()))
            .map(|b| b.id())
            .unwrap_err();
        assert_eq!(err, DuplicateSessionError(SessionId::from("s1")));
        assert_eq!(explorer.active_session_count(), 1);
        assert_eq!(explorer.browser(&SessionId::from("s1")).unwrap().id(), first);
    }

    #[test]
    fn remove_unknown_is_noop() {
        let mut explorer = explorer();
        explorer
            .add_session(SessionId::from("s1"), Box::new(MockExecutor::new()))
            .unwrap();
        explorer.set_active(&SessionId::from("s1"));

        explorer.remove_session(&SessionId::from("unknown"));
        assert_eq!(explorer.active_session_count(), 1);
        assert_eq!(explorer.active_session(), Some(&SessionId::from("s1")));
    }

    #[test]
    fn added_session_is_not_active() {
        let mut explorer = explorer();
        explorer
            .add_session(SessionId::from("s1"), Box::new(MockExecutor::new()))
            .unwrap();
        assert!(explorer.active_session().is_none());
        assert!(explorer.actions().is_empty());
        assert!(!explorer.refresh());
    }

    #[test]
    fn only_active_browser_is_visible() {
        let mut explorer = explorer();
        for id in ["a", "b"] {
            explorer
                .add_session(SessionId::from(id), Box::new(MockExecutor::new()))
                .unwrap();
        }
        explorer.set_active(&SessionId::from("b"));
        assert!(!explorer.browser(&SessionId::from("a")).unwrap().is_visible());
        assert!(explorer.browser(&SessionId::from("b")).unwrap().is_visible());

        explorer.set_visible(false);
        assert!(!explorer.browser(&SessionId::from("b")).unwrap().is_visible());
    }

    #[test]
    fn actions_reflect_options() {
        let mut explorer = explorer();
        explorer
            .add_session(SessionId::from("s1"), Box::new(MockExecutor::new()))
            .unwrap();
        explorer.set_active(&SessionId::from("s1"));

        explorer.trigger(Action::Toggle(ExplorerOption::CaptureLocals));
        let capture = explorer
            .actions()
            .into_iter()
            .find(|a| a.action == Action::Toggle(ExplorerOption::CaptureLocals))
            .unwrap();
        assert_eq!(capture.checked, Some(false));
        assert_eq!(explorer.actions().len(), 5);
    }
}
