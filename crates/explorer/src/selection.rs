use crossbeam_channel::Sender;

use crate::{
    events::{Event, NavigateTo},
    tree::{FrameTree, NodeId},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("no session is active")]
    NoActiveSession,

    #[error("nothing has been rendered yet")]
    NotRendered,

    #[error("no thread at index {thread_index} (have {threads})")]
    ThreadOutOfRange { thread_index: usize, threads: usize },

    #[error("thread {thread_index} has no frame at index {frame_index} (have {frames})")]
    FrameOutOfRange {
        thread_index: usize,
        frame_index: usize,
        frames: usize,
    },
}

/// Tracks the selected node and turns user interaction into events
pub struct SelectionController {
    current: Option<NodeId>,
    publisher: Sender<Event>,
}

impl SelectionController {
    pub fn new(publisher: Sender<Event>) -> Self {
        Self {
            current: None,
            publisher,
        }
    }

    pub fn current(&self) -> Option<NodeId> {
        self.current
    }

    /// Forget the selection, e.g. because the tree it pointed into was replaced
    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Activate a node (click or double click)
    ///
    /// Frame nodes with a source location select themselves, ask the host to navigate there and
    /// report their index. Returns that index. Thread nodes and idle placeholders do nothing.
    pub fn activate(&mut self, tree: &FrameTree, node: NodeId) -> Option<usize> {
        let entry = tree.node(node)?.as_frame()?;
        let location = entry.location()?;

        self.current = Some(node);
        tracing::debug!(file = %location.filename, line = location.lineno, "activating frame");
        self.emit(Event::NavigateTo(NavigateTo::from(location)));
        self.emit(Event::FrameActivated { index: entry.index });
        Some(entry.index)
    }

    /// Show the captured locals of a frame node in the variable inspector
    ///
    /// Returns whether anything was sent.
    pub fn inspect_locals(&self, tree: &FrameTree, node: NodeId) -> bool {
        let Some(locals) = tree
            .node(node)
            .and_then(|n| n.as_frame())
            .and_then(|entry| entry.locals.as_ref())
        else {
            return false;
        };
        self.emit(Event::ShowNamespace(locals.clone()));
        true
    }

    /// Show the locals of the selected node
    pub fn inspect_current(&self, tree: &FrameTree) -> bool {
        match self.current {
            Some(node) => self.inspect_locals(tree, node),
            None => false,
        }
    }

    /// Select the frame at a position, without activating it
    pub fn set_current(
        &mut self,
        tree: &FrameTree,
        thread_index: usize,
        frame_index: usize,
    ) -> Result<NodeId, SelectionError> {
        let Some(thread) = tree.roots().get(thread_index).copied() else {
            return Err(SelectionError::ThreadOutOfRange {
                thread_index,
                threads: tree.thread_count(),
            });
        };
        let frames = tree.children(thread);
        let node = frames
            .get(frame_index)
            .copied()
            .ok_or(SelectionError::FrameOutOfRange {
                thread_index,
                frame_index,
                frames: frames.len(),
            })?;

        self.current = Some(node);
        Ok(node)
    }

    fn emit(&self, event: Event) {
        let _ = self.publisher.send(event);
    }
}
