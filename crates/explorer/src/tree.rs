//! Two level tree of threads and their frames
//!
//! Nodes live in an arena and are addressed by [`NodeId`], assigned when the node is created.
//! A tree is built from scratch for every [`Snapshot`]; nothing is carried over from the
//! previous rendering.
use crate::{
    events::NavigateTo,
    markup::{self, RenderStyle},
    types::{FrameLocation, Locals, MAIN_THREAD, Snapshot},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Data kept by a frame node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameEntry {
    /// Position within the thread, used to order frames once sorting is enabled
    pub index: usize,
    pub filename: Option<String>,
    pub line: String,
    pub lineno: u32,
    pub context: String,
    pub locals: Option<Locals>,
}

impl FrameEntry {
    fn idle() -> Self {
        Self {
            index: 0,
            filename: None,
            line: String::new(),
            lineno: 0,
            context: String::new(),
            locals: None,
        }
    }

    /// Placeholder shown under a thread with no frames
    pub fn is_idle(&self) -> bool {
        self.filename.is_none()
    }

    pub fn location(&self) -> Option<FrameLocation> {
        self.filename.as_ref().map(|filename| FrameLocation {
            filename: filename.clone(),
            lineno: self.lineno,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Thread { name: String },
    Frame(FrameEntry),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: NodeId,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
    label: String,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Rich text label
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn as_frame(&self) -> Option<&FrameEntry> {
        match &self.kind {
            NodeKind::Frame(entry) => Some(entry),
            NodeKind::Thread { .. } => None,
        }
    }

    pub fn is_thread(&self) -> bool {
        matches!(self.kind, NodeKind::Thread { .. })
    }

    /// Plain text equivalent of the label
    pub fn text(&self) -> String {
        match &self.kind {
            NodeKind::Thread { name } => name.clone(),
            NodeKind::Frame(entry) if entry.is_idle() => "idle".to_string(),
            NodeKind::Frame(entry) => {
                let basename = entry
                    .filename
                    .as_deref()
                    .and_then(|f| std::path::Path::new(f).file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let mut text = format!("{basename}:{}", entry.lineno);
                if !entry.context.is_empty() {
                    text.push_str(&format!(" ({})", entry.context));
                }
                if !entry.line.is_empty() {
                    text.push_str(&format!("    {}", entry.line.trim()));
                }
                text
            }
        }
    }
}

/// Column header sorting. Once enabled it stays enabled for the lifetime of the view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortToggle {
    enabled: bool,
}

impl SortToggle {
    pub fn enable(&mut self) {
        if !self.enabled {
            tracing::debug!("enabling tree sorting");
        }
        self.enabled = true;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Result of rendering a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub tree: FrameTree,
    /// Innermost frame of the main thread, which the editor should follow
    pub auto_navigate: Option<NavigateTo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameTree {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

impl FrameTree {
    /// Build the tree for a snapshot
    #[tracing::instrument(skip_all, fields(threads = snapshot.len()))]
    pub fn render(snapshot: &Snapshot, style: &RenderStyle) -> Rendered {
        let mut tree = FrameTree::default();

        for stack in snapshot.threads() {
            let thread = tree.push(
                None,
                NodeKind::Thread {
                    name: stack.name.clone(),
                },
                markup::thread_label(style, &stack.name),
            );

            if stack.frames.is_empty() {
                tree.push(
                    Some(thread),
                    NodeKind::Frame(FrameEntry::idle()),
                    markup::idle_label(),
                );
                continue;
            }

            for (index, frame) in stack.frames.iter().enumerate() {
                let label = match frame.basename() {
                    Some(basename) => {
                        markup::frame_label(style, basename, frame.lineno, &frame.name, &frame.line)
                    }
                    None => markup::idle_label(),
                };
                let entry = FrameEntry {
                    index,
                    filename: frame.filename.clone(),
                    line: frame.line.clone(),
                    lineno: frame.lineno,
                    context: frame.name.clone(),
                    locals: frame.locals.clone(),
                };
                tree.push(Some(thread), NodeKind::Frame(entry), label);
            }
        }

        let auto_navigate = snapshot
            .thread(MAIN_THREAD)
            .and_then(|t| t.frames.last())
            .and_then(|f| f.location())
            .map(NavigateTo::from);

        tracing::debug!(nodes = tree.nodes.len(), "rendered frame tree");
        Rendered {
            tree,
            auto_navigate,
        }
    }

    fn push(&mut self, parent: Option<NodeId>, kind: NodeKind, label: String) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            parent,
            children: Vec::new(),
            kind,
            label,
        });
        match parent {
            Some(parent) => self.nodes[parent.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Thread nodes in snapshot order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(Node::children).unwrap_or_default()
    }

    pub fn thread_count(&self) -> usize {
        self.roots.len()
    }

    /// Number of frame nodes, placeholders included
    pub fn frame_count(&self) -> usize {
        self.nodes.len() - self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Frame node at a position, in snapshot order
    pub fn frame_at(&self, thread_index: usize, frame_index: usize) -> Option<NodeId> {
        let thread = self.roots.get(thread_index)?;
        self.children(*thread).get(frame_index).copied()
    }

    /// Depth first node order as displayed
    ///
    /// Without sorting this is snapshot order. With sorting, threads are ordered by name and
    /// frames by their index within the thread.
    pub fn visible_order(&self, sorting: SortToggle) -> Vec<NodeId> {
        let mut roots = self.roots.clone();
        if sorting.is_enabled() {
            roots.sort_by(|a, b| self.thread_name(*a).cmp(self.thread_name(*b)));
        }

        let mut order = Vec::with_capacity(self.nodes.len());
        for root in roots {
            order.push(root);
            let mut children = self.children(root).to_vec();
            if sorting.is_enabled() {
                children.sort_by_key(|c| self.frame_index(*c));
            }
            order.extend(children);
        }
        order
    }

    /// Plain text lines in display order, frames indented under their thread
    pub fn plain_lines(&self, sorting: SortToggle) -> Vec<String> {
        self.visible_order(sorting)
            .into_iter()
            .filter_map(|id| self.node(id))
            .map(|node| {
                if node.is_thread() {
                    node.text()
                } else {
                    format!("  {}", node.text())
                }
            })
            .collect()
    }

    fn thread_name(&self, id: NodeId) -> &str {
        match self.node(id).map(Node::kind) {
            Some(NodeKind::Thread { name }) => name,
            _ => "",
        }
    }

    fn frame_index(&self, id: NodeId) -> usize {
        self.node(id)
            .and_then(Node::as_frame)
            .map(|f| f.index)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Frame;

    fn render(snapshot: &Snapshot) -> Rendered {
        FrameTree::render(snapshot, &RenderStyle::default())
    }

    fn main_thread_snapshot() -> Snapshot {
        Snapshot::new().with_thread(
            "MainThread",
            vec![
                Frame::new("a.py", 1, "line1", "f1").with_locals(Vec::<(String, String)>::new()),
                Frame::new("a.py", 2, "line2", "f2").with_locals([("x", "1")]),
            ],
        )
    }

    #[test]
    fn main_thread_scenario() {
        let Rendered {
            tree,
            auto_navigate,
        } = render(&main_thread_snapshot());

        assert_eq!(tree.thread_count(), 1);
        assert_eq!(tree.frame_count(), 2);
        assert_eq!(
            auto_navigate,
            Some(NavigateTo {
                filename: "a.py".to_string(),
                lineno: 2,
                context_hint: String::new(),
            })
        );
    }

    #[test]
    fn empty_thread_renders_idle_placeholder() {
        let Rendered {
            tree,
            auto_navigate,
        } = render(&Snapshot::new().with_thread("Worker", vec![]));

        assert_eq!(tree.thread_count(), 1);
        assert_eq!(tree.frame_count(), 1);
        let placeholder = tree.node(tree.frame_at(0, 0).unwrap()).unwrap();
        let entry = placeholder.as_frame().unwrap();
        assert!(entry.is_idle());
        assert_eq!(entry.line, "");
        assert_eq!(entry.lineno, 0);
        assert_eq!(entry.context, "");
        assert!(entry.locals.is_none());
        assert!(placeholder.label().contains("idle"));
        assert!(auto_navigate.is_none());
    }

    #[test]
    fn one_thread_node_per_key_and_one_frame_node_per_frame() {
        let snapshot = Snapshot::new()
            .with_thread("A", vec![Frame::new("a.py", 1, "", "f"); 3])
            .with_thread("B", vec![])
            .with_thread("C", vec![Frame::new("c.py", 9, "", "g")]);
        let tree = render(&snapshot).tree;

        assert_eq!(tree.thread_count(), 3);
        let counts: Vec<_> = tree
            .roots()
            .iter()
            .map(|r| tree.children(*r).len())
            .collect();
        assert_eq!(counts, [3, 1, 1]);
    }

    #[test]
    fn rendering_is_idempotent() {
        let snapshot = main_thread_snapshot().with_thread("Worker", vec![]);
        assert_eq!(render(&snapshot), render(&snapshot));
    }

    #[test]
    fn empty_main_thread_does_not_navigate() {
        let snapshot = Snapshot::new()
            .with_thread("MainThread", vec![])
            .with_thread("Other", vec![Frame::new("o.py", 5, "", "run")]);
        assert!(render(&snapshot).auto_navigate.is_none());
    }

    #[test]
    fn navigation_follows_innermost_main_frame_only() {
        let snapshot = Snapshot::new()
            .with_thread("Other", vec![Frame::new("o.py", 5, "", "run")])
            .with_thread(
                "MainThread",
                vec![
                    Frame::new("outer.py", 10, "", "main"),
                    Frame::new("inner.py", 20, "", "work"),
                ],
            );
        let nav = render(&snapshot).auto_navigate.unwrap();
        assert_eq!(nav.filename, "inner.py");
        assert_eq!(nav.lineno, 20);
    }

    #[test]
    fn frame_nodes_keep_locals_and_location() {
        let tree = render(&main_thread_snapshot()).tree;
        let second = tree.node(tree.frame_at(0, 1).unwrap()).unwrap();
        let entry = second.as_frame().unwrap();
        assert_eq!(entry.index, 1);
        assert_eq!(
            entry.location(),
            Some(FrameLocation {
                filename: "a.py".to_string(),
                lineno: 2
            })
        );
        assert_eq!(entry.locals.as_ref().unwrap()["x"], "1");
        assert!(tree.node(tree.roots()[0]).unwrap().as_frame().is_none());
    }

    #[test]
    fn insertion_order_until_sorting_enabled() {
        let snapshot = Snapshot::new()
            .with_thread("zeta", vec![])
            .with_thread("alpha", vec![]);
        let tree = render(&snapshot).tree;

        let mut sorting = SortToggle::default();
        assert_eq!(tree.plain_lines(sorting), ["zeta", "  idle", "alpha", "  idle"]);

        sorting.enable();
        assert_eq!(tree.plain_lines(sorting), ["alpha", "  idle", "zeta", "  idle"]);
    }

    #[test]
    fn sorting_cannot_be_reverted() {
        let mut sorting = SortToggle::default();
        sorting.enable();
        sorting.enable();
        assert!(sorting.is_enabled());
    }

    #[test]
    fn frame_at_out_of_range() {
        let tree = render(&main_thread_snapshot()).tree;
        assert!(tree.frame_at(0, 2).is_none());
        assert!(tree.frame_at(1, 0).is_none());
    }

    #[test]
    fn plain_text_of_frame() {
        let tree = render(&main_thread_snapshot()).tree;
        assert_eq!(tree.plain_lines(SortToggle::default()), [
            "MainThread",
            "  a.py:1 (f1)    line1",
            "  a.py:2 (f2)    line2",
        ]);
    }
}
