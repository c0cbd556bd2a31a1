use std::{collections::BTreeMap, path::Path};

use crate::{
    environment::Environment,
    error::{Warning, ZigifyError, ZigifyResult},
    interface::{Frontend, Options, SourceLoader},
    loader::{FsLoader, normalize},
    parser::BmakeParser,
    render::Renderer,
    zig,
};

/// Everything a render pass produced.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transpilation {
    /// The Zig program.
    pub output: String,
    /// Recoverable problems met on the way, in document order.
    pub warnings: Vec<Warning>,
    /// The variable environment as it stood at the end of the pass.
    pub environment: Environment,
}

/// `Transpiler` drives a render pass: it parses a bmake unit with its
/// [`Frontend`], renders the tree to Zig and, when enabled, wraps the result
/// into a complete build script.
///
/// The transpiler holds no state between passes, so one instance can serve
/// several threads at once.
///
/// # Examples
///
/// ```
/// use zigify::{Options, Transpiler};
///
/// let transpiler = Transpiler::with_options(Options::new().with_prelude(false));
/// let output = transpiler.transform("CC = clang\nCFLAGS = -O2").unwrap();
/// assert_eq!(output, "vars.CC = \"clang\";\nvars.CFLAGS = \"-O2\";");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Transpiler<F = BmakeParser, L = FsLoader> {
    frontend: F,
    loader: L,
    options: Options,
}

impl Transpiler {
    /// A transpiler with the built-in front-end, the filesystem loader and
    /// default options.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: Options) -> Self {
        Self::with_parts(BmakeParser, FsLoader, options)
    }
}

impl<F: Frontend, L: SourceLoader> Transpiler<F, L> {
    pub fn with_parts(frontend: F, loader: L, options: Options) -> Self {
        Self {
            frontend,
            loader,
            options,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Transpiles `source` starting from an empty environment.
    ///
    /// # Errors
    /// - `ZigifyError::UnknownNodeKind` if the tree holds a named node the
    ///   renderer has no rule for.
    /// - `ZigifyError::UnknownDiagnosticMarker` for an unrecognised
    ///   diagnostic directive.
    /// - Any include error: `IncludeNotFound`, `IncludeCycle` or
    ///   `IncludeDepthExceeded`.
    ///
    /// # Examples
    ///
    /// ```
    /// use zigify::{Options, Transpiler};
    ///
    /// let transpiler = Transpiler::with_options(Options::new().with_prelude(false));
    /// let output = transpiler.transform("X = 1\nY = $[X]").unwrap();
    /// assert_eq!(output, "vars.X = \"1\";\nvars.Y = \"1\";");
    /// ```
    pub fn transform(&self, source: &str) -> ZigifyResult<String> {
        self.transpile(source, Environment::new())
            .map(|transpilation| transpilation.output)
    }

    /// Transpiles `source` with `environment` as the initial variable
    /// environment, returning the output together with the warnings and the
    /// final environment. With the prelude on, seeded variables start out
    /// in `vars` with their fully expanded values.
    ///
    /// # Errors
    /// The same as [`Transpiler::transform`].
    ///
    /// # Examples
    ///
    /// ```
    /// use zigify::{Environment, Options, Transpiler};
    ///
    /// let mut environment = Environment::new();
    /// environment.assign("ROOT", "/src");
    ///
    /// let transpiler = Transpiler::with_options(Options::new().with_prelude(false));
    /// let result = transpiler.transpile("INC = $[ROOT]/include", environment).unwrap();
    /// assert_eq!(result.output, "vars.INC = \"/src/include\";");
    /// assert_eq!(result.environment.get("INC"), Some("/src/include"));
    /// assert!(result.warnings.is_empty());
    /// ```
    pub fn transpile(&self, source: &str, environment: Environment) -> ZigifyResult<Transpilation> {
        self.run(source, environment, None)
    }

    /// Reads the unit at `path` through the loader and transpiles it.
    /// Relative includes are looked up next to it first, and it counts as
    /// part of the include chain, so a unit that includes itself is a cycle.
    ///
    /// # Errors
    /// - `ZigifyError::Io` if `path` cannot be read.
    /// - Otherwise the same as [`Transpiler::transform`].
    pub fn transpile_file<P: AsRef<Path>>(&self, path: P) -> ZigifyResult<Transpilation> {
        let path = path.as_ref();
        let source = self.loader.load(path).map_err(|err| ZigifyError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        self.run(&source, Environment::new(), Some(normalize(path)))
    }

    fn run(
        &self,
        source: &str,
        environment: Environment,
        root: Option<std::path::PathBuf>,
    ) -> ZigifyResult<Transpilation> {
        let tree = self.frontend.parse(source);
        let seeded: BTreeMap<String, String> = environment
            .bound_names()
            .map(|name| (name.to_string(), environment.resolve(name).unwrap_or_default()))
            .collect();
        let mut renderer = Renderer::new(
            &self.frontend,
            &self.loader,
            &self.options,
            environment,
            root,
        );
        let body = renderer.render(&tree)?;

        let output = if self.options.prelude {
            let variables = renderer.environment.bound_names().map(|name| {
                (name, seeded.get(name).map_or("", String::as_str))
            });
            zig::program(&body, variables, renderer.uses_builder)
        } else {
            body
        };

        Ok(Transpilation {
            output,
            warnings: renderer.warnings,
            environment: renderer.environment,
        })
    }
}
