use std::path::{Path, PathBuf};

use crate::ast::SyntaxNode;

/// Turns bmake source text into a syntax tree.
///
/// A front-end never fails: input it cannot make sense of is embedded in the
/// tree as `ERROR` nodes, which the renderer turns into visible comments.
pub trait Frontend {
    fn parse<'a>(&self, source: &'a str) -> SyntaxNode<'a>;
}

/// Reads the text of an included source unit.
pub trait SourceLoader {
    /// Loads the unit at `path`.
    ///
    /// # Errors
    /// - Any I/O error; the include resolver moves on to the next candidate
    ///   location.
    fn load(&self, path: &Path) -> std::io::Result<String>;
}

impl<T: Frontend + ?Sized> Frontend for &T {
    fn parse<'a>(&self, source: &'a str) -> SyntaxNode<'a> {
        (**self).parse(source)
    }
}

impl<T: SourceLoader + ?Sized> SourceLoader for &T {
    fn load(&self, path: &Path) -> std::io::Result<String> {
        (**self).load(path)
    }
}

/// Knobs of a render pass.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Options {
    /// Emit the `std` import, the variable namespace, the `run` helper and
    /// the `build` function around the rendered statements.
    pub prelude: bool,
    /// Directories searched for `%include` after the including unit's own
    /// directory and any `%search` directories.
    pub include_dirs: Vec<PathBuf>,
    /// Deepest allowed `%include` nesting.
    pub max_include_depth: usize,
    /// Inserted between the old and the appended value of a variable.
    pub append_separator: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            prelude: true,
            include_dirs: Vec::new(),
            max_include_depth: 64,
            append_separator: String::new(),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_prelude(mut self, prelude: bool) -> Self {
        self.prelude = prelude;
        self
    }

    #[must_use]
    pub fn with_include_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.include_dirs.push(dir.into());
        self
    }

    #[must_use]
    pub const fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    #[must_use]
    pub fn with_append_separator<S: Into<String>>(mut self, separator: S) -> Self {
        self.append_separator = separator.into();
        self
    }
}
