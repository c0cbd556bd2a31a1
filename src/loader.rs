use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::interface::SourceLoader;

/// Loads source units from the filesystem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FsLoader;

impl SourceLoader for FsLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Serves source units from memory, keyed by lexically normalised path.
///
/// ```
/// use std::path::Path;
/// use zigify::{MemoryLoader, SourceLoader};
///
/// let loader = MemoryLoader::new().with_file("defs/common.mki", "CC = clang");
/// assert_eq!(loader.load(Path::new("defs/./common.mki")).unwrap(), "CC = clang");
/// assert!(loader.load(Path::new("missing.mki")).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryLoader {
    files: BTreeMap<PathBuf, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<P: AsRef<Path>, S: Into<String>>(&mut self, path: P, source: S) -> &mut Self {
        self.files.insert(normalize(path.as_ref()), source.into());
        self
    }

    #[must_use]
    pub fn with_file<P: AsRef<Path>, S: Into<String>>(mut self, path: P, source: S) -> Self {
        self.insert(path, source);
        self
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        self.files.get(&normalize(path)).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no in-memory unit at {}", path.display()),
            )
        })
    }
}

/// Removes `.` components and folds `..` into its parent, without touching
/// the filesystem.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let folded = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if folded {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                out.push(component.as_os_str());
            }
        }
    }
    out
}
