use std::{collections::BTreeMap, fmt, io::Read, path::Path};

use eyre::Context;
use serde::{Deserialize, Serialize};

/// Name of the thread the editor follows after every refresh
pub const MAIN_THREAD: &str = "MainThread";

/// Captured local variables of a frame, name to value description
pub type Locals = BTreeMap<String, String>;

/// Opaque identifier of a session, stable for the session's lifetime
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Source location a frame points at
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameLocation {
    pub filename: String,
    pub lineno: u32,
}

/// A single stack entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Source file, absent when the thread is idle
    #[serde(default)]
    pub filename: Option<String>,

    /// Text of the source line being executed
    #[serde(default)]
    pub line: String,

    #[serde(default)]
    pub lineno: u32,

    /// Enclosing function or context name
    #[serde(default)]
    pub name: String,

    /// Captured locals, absent when the session was asked not to capture them
    #[serde(default)]
    pub locals: Option<Locals>,
}

impl Frame {
    pub fn new(
        filename: impl Into<String>,
        lineno: u32,
        line: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            filename: Some(filename.into()),
            line: line.into(),
            lineno,
            name: name.into(),
            locals: None,
        }
    }

    pub fn with_locals<K, V>(mut self, locals: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.locals = Some(
            locals
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn location(&self) -> Option<FrameLocation> {
        self.filename.as_ref().map(|filename| FrameLocation {
            filename: filename.clone(),
            lineno: self.lineno,
        })
    }

    /// Final component of the file name
    pub fn basename(&self) -> Option<&str> {
        let filename = self.filename.as_deref()?;
        Some(
            Path::new(filename)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(filename),
        )
    }
}

/// The frames of a single thread, in capture order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadStack {
    pub name: String,
    #[serde(default)]
    pub frames: Vec<Frame>,
}

/// All thread stacks of a session captured at one instant
///
/// Threads keep the order they were captured in. Adding a thread whose name is already present
/// replaces the earlier stack in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ThreadStack>", into = "Vec<ThreadStack>")]
pub struct Snapshot {
    threads: Vec<ThreadStack>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thread(mut self, name: impl Into<String>, frames: Vec<Frame>) -> Self {
        self.insert(ThreadStack {
            name: name.into(),
            frames,
        });
        self
    }

    fn insert(&mut self, stack: ThreadStack) {
        match self.threads.iter_mut().find(|t| t.name == stack.name) {
            Some(existing) => *existing = stack,
            None => self.threads.push(stack),
        }
    }

    pub fn threads(&self) -> &[ThreadStack] {
        &self.threads
    }

    pub fn thread(&self, name: &str) -> Option<&ThreadStack> {
        self.threads.iter().find(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// A copy of this snapshot with every frame's locals dropped
    pub fn without_locals(&self) -> Self {
        let threads = self
            .threads
            .iter()
            .map(|t| ThreadStack {
                name: t.name.clone(),
                frames: t
                    .frames
                    .iter()
                    .map(|f| Frame {
                        locals: None,
                        ..f.clone()
                    })
                    .collect(),
            })
            .collect();
        Self { threads }
    }

    pub fn from_reader(reader: impl Read) -> eyre::Result<Self> {
        let snapshot = serde_json::from_reader(reader).context("reading snapshot")?;
        Ok(snapshot)
    }

    pub fn from_path(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let f = std::fs::File::open(path)
            .with_context(|| format!("opening snapshot {}", path.display()))?;
        Self::from_reader(std::io::BufReader::new(f))
    }
}

impl From<Vec<ThreadStack>> for Snapshot {
    fn from(value: Vec<ThreadStack>) -> Self {
        value.into_iter().collect()
    }
}

impl From<Snapshot> for Vec<ThreadStack> {
    fn from(value: Snapshot) -> Self {
        value.threads
    }
}

impl FromIterator<ThreadStack> for Snapshot {
    fn from_iter<T: IntoIterator<Item = ThreadStack>>(iter: T) -> Self {
        let mut snapshot = Snapshot::default();
        for stack in iter {
            snapshot.insert(stack);
        }
        snapshot
    }
}

impl<S: Into<String>> FromIterator<(S, Vec<Frame>)> for Snapshot {
    fn from_iter<T: IntoIterator<Item = (S, Vec<Frame>)>>(iter: T) -> Self {
        iter.into_iter()
            .map(|(name, frames)| ThreadStack {
                name: name.into(),
                frames,
            })
            .collect()
    }
}
