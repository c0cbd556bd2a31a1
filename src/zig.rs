//! Zig spelling of the constructs the renderer emits.

use std::borrow::Cow;

/// Namespace holding one `pub var` per bmake variable.
pub(crate) const VARS: &str = "vars";
/// Allocator used by the emitted code for string concatenation.
pub(crate) const ALLOCATOR: &str = "gpa";

pub(crate) const MALFORMED_BEGIN: &str = "// ==== begin malformed bmake";
pub(crate) const MALFORMED_END: &str = "// ==== end malformed bmake ====";
pub(crate) const MALFORMED_LINE: &str = "// | ";

const INDENT: &str = "    ";

const KEYWORDS: &[&str] = &[
    "addrspace",
    "align",
    "allowzero",
    "and",
    "anyframe",
    "anytype",
    "asm",
    "async",
    "await",
    "break",
    "callconv",
    "catch",
    "comptime",
    "const",
    "continue",
    "defer",
    "else",
    "enum",
    "errdefer",
    "error",
    "export",
    "extern",
    "fn",
    "for",
    "if",
    "inline",
    "linksection",
    "noalias",
    "noinline",
    "nosuspend",
    "opaque",
    "or",
    "orelse",
    "packed",
    "pub",
    "resume",
    "return",
    "struct",
    "suspend",
    "switch",
    "test",
    "threadlocal",
    "try",
    "union",
    "unreachable",
    "usingnamespace",
    "var",
    "volatile",
    "while",
];

const PRIMITIVES: &[&str] = &[
    "anyerror",
    "anyopaque",
    "bool",
    "comptime_float",
    "comptime_int",
    "false",
    "isize",
    "noreturn",
    "null",
    "true",
    "type",
    "undefined",
    "usize",
    "void",
];

fn is_primitive(name: &str) -> bool {
    if PRIMITIVES.contains(&name) || name.starts_with("c_") {
        return true;
    }
    // Arbitrary width integers and floats: i7, u64, f32...
    let mut chars = name.chars();
    matches!(chars.next(), Some('i' | 'u' | 'f'))
        && !chars.as_str().is_empty()
        && chars.all(|c| c.is_ascii_digit())
}

/// `name` as a Zig identifier, quoted with `@"..."` when it would not parse
/// as a bare one.
pub(crate) fn identifier(name: &str) -> Cow<'_, str> {
    let mut chars = name.chars();
    let bare = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name != "_"
        && !KEYWORDS.contains(&name)
        && !is_primitive(name);

    if bare {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("@{}", string_literal(name)))
    }
}

/// Access to a bmake variable through the `vars` namespace.
pub(crate) fn variable(name: &str) -> String {
    format!("{}.{}", VARS, identifier(name))
}

/// A double quoted Zig string literal.
pub(crate) fn string_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.extend(c.escape_unicode()),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Runtime concatenation of string expressions.
pub(crate) fn concat(parts: &[String]) -> String {
    format!(
        "try std.mem.concat({}, u8, &.{{ {} }})",
        ALLOCATOR,
        parts.join(", ")
    )
}

/// Lookup of a process environment variable.
pub(crate) fn getenv(name: &str) -> String {
    format!("std.posix.getenv({})", string_literal(name))
}

/// A process environment variable, empty when unset.
pub(crate) fn getenv_or_empty(name: &str) -> String {
    format!("({} orelse \"\")", getenv(name))
}

/// Registers a named build step whose make function runs `body`.
pub(crate) fn build_step(name: &str, body: &str) -> String {
    let make = format!(
        "fn make(_: *std.Build.Step, _: std.Build.Step.MakeOptions) anyerror!void {}",
        block(body)
    );
    let statements = format!(
        "const step = b.step({}, {});\nstep.makeFn = struct {}.make;",
        string_literal(name),
        string_literal(&format!("bmake rule {}", name)),
        block(&make)
    );
    block(&statements)
}

/// Indents every non-empty line by one level.
pub(crate) fn indent(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", INDENT, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// A `{ ... }` block with `body` indented, or `{}` when empty.
pub(crate) fn block(body: &str) -> String {
    if body.trim().is_empty() {
        "{}".to_string()
    } else {
        format!("{{\n{}\n}}", indent(body))
    }
}

/// Comments out a span of source text between begin and end banners.
pub(crate) fn malformed(text: &str, line: usize) -> String {
    let mut out = format!("{} (line {}) ====", MALFORMED_BEGIN, line);
    for source_line in text.lines() {
        out.push('\n');
        out.push_str(MALFORMED_LINE);
        out.push_str(source_line);
    }
    out.push('\n');
    out.push_str(MALFORMED_END);
    out
}

const PRELUDE: &str = r#"const std = @import("std");

const gpa = std.heap.page_allocator;"#;

const RUN_HELPER: &str = r#"fn run(command: []const u8, echo: bool, check: bool) !void {
    if (echo) std.debug.print("{s}\n", .{command});
    var child = std.process.Child.init(&.{ "sh", "-c", command }, gpa);
    const term = try child.spawnAndWait();
    if (!check) return;
    switch (term) {
        .Exited => |code| if (code != 0) return error.CommandFailed,
        else => return error.CommandFailed,
    }
}"#;

/// Wraps a rendered root unit into a complete build script. Each variable
/// is declared with its initial value, `""` unless it was seeded.
pub(crate) fn program<'n, I>(body: &str, variables: I, uses_builder: bool) -> String
where
    I: IntoIterator<Item = (&'n str, &'n str)>,
{
    let declarations: Vec<String> = variables
        .into_iter()
        .map(|(name, value)| {
            format!(
                "pub var {}: []const u8 = {};",
                identifier(name),
                string_literal(value)
            )
        })
        .collect();

    let main = if uses_builder {
        body.to_string()
    } else {
        format!("_ = b;\n{}", body)
    };

    format!(
        "{}\n\nconst {} = struct {};\n\n{}\n\npub fn build(b: *std.Build) !void {}\n",
        PRELUDE,
        VARS,
        block(&declarations.join("\n")),
        RUN_HELPER,
        block(&main)
    )
}
