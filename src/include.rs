//! `%include` resolution.
//!
//! An included unit is parsed by the same front-end and rendered by the same
//! [`Renderer`], so it reads and writes the including unit's environment and
//! its assignments are visible to everything after the directive.

use std::path::{Path, PathBuf};

use log::debug;

use crate::{
    ast::{NodeKind, SyntaxNode},
    error::{ZigifyError, ZigifyResult},
    loader::normalize,
    render::Renderer,
};

impl Renderer<'_> {
    pub(crate) fn render_include(&mut self, node: &SyntaxNode<'_>) -> ZigifyResult<String> {
        let path = node
            .find(&NodeKind::Path)
            .ok_or_else(|| ZigifyError::MalformedNode {
                kind: node.kind().to_string(),
                line: node.line(),
                expected: "path".to_string(),
            })?;
        let fragments = self.fragments(path)?;
        let requested = PathBuf::from(self.static_text(&fragments));

        let (path, source) = self.locate(&requested)?;

        if self.root.as_ref() == Some(&path) || self.includes.contains(&path) {
            let chain = self
                .root
                .iter()
                .chain(&self.includes)
                .chain(std::iter::once(&path))
                .map(|unit| unit.display().to_string())
                .collect();
            return Err(ZigifyError::IncludeCycle { chain });
        }
        if self.includes.len() >= self.options.max_include_depth {
            return Err(ZigifyError::IncludeDepthExceeded {
                path: path.display().to_string(),
                depth: self.options.max_include_depth,
            });
        }

        debug!(
            "line {}: including {} at depth {}",
            node.line(),
            path.display(),
            self.includes.len() + 1
        );

        let frontend = self.frontend;
        let tree = frontend.parse(&source);
        self.includes.push(path.clone());
        let rendered = self.render(&tree);
        self.includes.pop();
        let rendered = rendered?;

        let mut out = format!("// included from {}", path.display());
        if !rendered.is_empty() {
            out.push('\n');
            out.push_str(&rendered);
        }
        Ok(out)
    }

    /// The unit doing the including.
    fn current_unit(&self) -> Option<&Path> {
        self.includes
            .last()
            .or(self.root.as_ref())
            .map(PathBuf::as_path)
    }

    /// Locations tried for `requested`, in order and without duplicates.
    pub(crate) fn candidates(&self, requested: &Path) -> Vec<PathBuf> {
        if requested.is_absolute() {
            return vec![normalize(requested)];
        }

        let unit_dir = self.current_unit().and_then(Path::parent);
        let mut candidates: Vec<PathBuf> = Vec::new();
        for dir in unit_dir
            .into_iter()
            .chain(self.search_dirs.iter().map(PathBuf::as_path))
            .chain(self.options.include_dirs.iter().map(PathBuf::as_path))
        {
            let candidate = normalize(&dir.join(requested));
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
        let relative = normalize(requested);
        if !candidates.contains(&relative) {
            candidates.push(relative);
        }
        candidates
    }

    /// The first candidate the loader can read.
    fn locate(&self, requested: &Path) -> ZigifyResult<(PathBuf, String)> {
        let mut failures = Vec::new();
        for candidate in self.candidates(requested) {
            match self.loader.load(&candidate) {
                Ok(source) => return Ok((candidate, source)),
                Err(err) => {
                    debug!("{} not usable: {}", candidate.display(), err);
                    failures.push(format!("{}: {}", candidate.display(), err));
                }
            }
        }
        Err(ZigifyError::IncludeNotFound {
            path: requested.display().to_string(),
            reason: failures.join("; "),
        })
    }
}
