//! Transpiles bmake build descriptions into Zig build scripts.
//!
//! ```
//! let program = zigify::transform("CC = clang\n%message using $(CC)").unwrap();
//! assert!(program.contains("vars.CC = \"clang\";"));
//! assert!(program.contains("std.debug.print(\"{s}\\n\", .{try std.mem.concat(gpa, u8, &.{ \"using \", vars.CC })});"));
//! ```

mod ast;
mod diagnostic;
mod engine;
mod environment;
mod error;
mod include;
mod interface;
mod loader;
mod parser;
mod render;
mod zig;

// Public exports.
pub use ast::{NodeKind, SyntaxNode};
pub use diagnostic::{DiagnosticMarker, DiagnosticTemplate, format_diagnostic};
pub use engine::{Transpilation, Transpiler};
pub use environment::{Environment, Expansion, Fragment, split_references, to_source};
pub use error::{Warning, ZigifyError, ZigifyResult};
pub use interface::{Frontend, Options, SourceLoader};
pub use loader::{FsLoader, MemoryLoader};
pub use parser::BmakeParser;

/// Transpiles `source` with the built-in front-end, includes read from the
/// filesystem and default [`Options`].
///
/// # Errors
/// See [`Transpiler::transform`].
pub fn transform(source: &str) -> ZigifyResult<String> {
    Transpiler::new().transform(source)
}
