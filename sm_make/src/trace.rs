//! Index-path error traces.
//!
//! Failures deep inside a nested document are reported with the full
//! structural path to the failing node, one trace level per wrapping layer.

use std::fmt;

/// One step of a structural index path: a sequence index or a mapping key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    Index(usize),
    Key(String),
}

pub type IndexPath = Vec<PathStep>;

pub fn index(i: usize) -> PathStep {
    PathStep::Index(i)
}

pub fn key(k: impl Into<String>) -> PathStep {
    PathStep::Key(k.into())
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TraceLevel {
    pub path: IndexPath,
    pub message: Option<String>,
}

/// Breadcrumb trail accumulated while an error unwinds, outermost level
/// first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Trace {
    pub levels: Vec<TraceLevel>,
}

impl Trace {
    pub fn new(path: IndexPath, message: impl Into<String>) -> Self {
        Self {
            levels: vec![TraceLevel {
                path,
                message: Some(message.into()),
            }],
        }
    }

    /// Add an outer wrapping layer.
    ///
    /// A message-less layer collapses into the current outermost level: its
    /// path becomes a prefix rather than a line of its own.
    #[must_use]
    pub fn wrap(mut self, path: IndexPath, message: Option<String>) -> Self {
        match message {
            None => {
                if let Some(first) = self.levels.first_mut() {
                    let mut joined = path;
                    joined.append(&mut first.path);
                    first.path = joined;
                } else {
                    self.levels.push(TraceLevel {
                        path,
                        message: None,
                    });
                }
                self
            }
            message @ Some(_) => {
                self.levels.insert(0, TraceLevel { path, message });
                self
            }
        }
    }

    /// Flattened path across all levels; convenient for asserting where an
    /// error pointed.
    pub fn indices(&self) -> IndexPath {
        self.levels
            .iter()
            .flat_map(|l| l.path.iter().cloned())
            .collect()
    }
}

fn index_str(path: &[PathStep]) -> String {
    if path.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    for step in path {
        match step {
            PathStep::Key(k) => {
                out.push('.');
                out.push_str(k);
            }
            PathStep::Index(i) => {
                out.push('[');
                out.push_str(&i.to_string());
                out.push(']');
            }
        }
    }
    out.push_str(": ");
    out
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (depth, level) in self.levels.iter().enumerate() {
            if depth > 0 {
                writeln!(f)?;
            }
            for _ in 0..depth {
                write!(f, "\t")?;
            }
            write!(f, "{}", index_str(&level.path))?;
            if let Some(message) = &level.message {
                write!(f, "{message}")?;
            }
        }
        Ok(())
    }
}
