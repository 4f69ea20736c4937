use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::model::RawPom;

#[derive(Debug, Clone)]
enum Entry {
    Pom(Arc<RawPom>),
    Missing,
    /// The POM exists but failed to parse; holds the parser's message.
    Unparsable(String),
}

/// Raw POMs of one load session, keyed by project directory.
///
/// A directory can also be recorded as having no POM, so that a module pointing at a
/// thirdparty-built directory is only probed once. Likewise an unparsable POM is only read
/// (and reported) once.
#[derive(Debug, Default)]
pub struct PomCache {
    entries: HashMap<PathBuf, Entry>,
}

impl PomCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, dir: &Path) -> Option<Arc<RawPom>> {
        match self.entries.get(dir) {
            Some(Entry::Pom(pom)) => Some(Arc::clone(pom)),
            _ => None,
        }
    }

    /// Whether `dir` has been probed, with or without finding a usable POM.
    pub fn contains(&self, dir: &Path) -> bool {
        self.entries.contains_key(dir)
    }

    /// Whether `dir` was probed and found to have no POM.
    pub fn is_missing(&self, dir: &Path) -> bool {
        matches!(self.entries.get(dir), Some(Entry::Missing))
    }

    /// The parse failure recorded for `dir`, if any.
    pub fn unparsable(&self, dir: &Path) -> Option<&str> {
        match self.entries.get(dir) {
            Some(Entry::Unparsable(message)) => Some(message),
            _ => None,
        }
    }

    pub fn put(&mut self, dir: impl Into<PathBuf>, pom: Arc<RawPom>) {
        self.entries.insert(dir.into(), Entry::Pom(pom));
    }

    pub fn put_missing(&mut self, dir: impl Into<PathBuf>) {
        self.entries.insert(dir.into(), Entry::Missing);
    }

    pub fn put_unparsable(&mut self, dir: impl Into<PathBuf>, message: impl Into<String>) {
        self.entries
            .insert(dir.into(), Entry::Unparsable(message.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
