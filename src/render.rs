//! Tag dispatch from syntax nodes to Zig text.
//!
//! A [`Renderer`] lives for exactly one render pass. It owns the pass's
//! [`Environment`] and threads it through every recursive call, including
//! the ones made for included units.

use std::path::PathBuf;

use log::{debug, warn};

use crate::{
    ast::{NodeKind, SyntaxNode},
    diagnostic::format_diagnostic,
    environment::{Environment, Expansion, Fragment, split_references, to_source},
    error::{Warning, ZigifyError, ZigifyResult},
    interface::{Frontend, Options, SourceLoader},
    zig,
};

pub(crate) struct Renderer<'t> {
    pub(crate) frontend: &'t dyn Frontend,
    pub(crate) loader: &'t dyn SourceLoader,
    pub(crate) options: &'t Options,
    pub(crate) environment: Environment,
    /// Path of the root unit, when it was read from one.
    pub(crate) root: Option<PathBuf>,
    /// Units currently being included, innermost last.
    pub(crate) includes: Vec<PathBuf>,
    /// Directories added by `%search`.
    pub(crate) search_dirs: Vec<PathBuf>,
    pub(crate) warnings: Vec<Warning>,
    /// Set once a rule registers a build step.
    pub(crate) uses_builder: bool,
}

fn malformed(node: &SyntaxNode<'_>, expected: &str) -> ZigifyError {
    ZigifyError::MalformedNode {
        kind: node.kind().to_string(),
        line: node.line(),
        expected: expected.to_string(),
    }
}

fn unknown(node: &SyntaxNode<'_>) -> ZigifyError {
    ZigifyError::UnknownNodeKind {
        kind: node.kind().to_string(),
        line: node.line(),
    }
}

/// Contents of a double quoted string token.
fn unquote(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(text)
}

impl<'t> Renderer<'t> {
    pub(crate) fn new(
        frontend: &'t dyn Frontend,
        loader: &'t dyn SourceLoader,
        options: &'t Options,
        environment: Environment,
        root: Option<PathBuf>,
    ) -> Self {
        Self {
            frontend,
            loader,
            options,
            environment,
            root,
            includes: Vec::new(),
            search_dirs: Vec::new(),
            warnings: Vec::new(),
            uses_builder: false,
        }
    }

    /// Renders `node` and everything below it.
    ///
    /// # Errors
    /// - `ZigifyError::UnknownNodeKind` for a named node without a rendering
    ///   rule, wherever it sits in the tree.
    /// - Any error raised while rendering a child or an included unit.
    pub(crate) fn render(&mut self, node: &SyntaxNode<'_>) -> ZigifyResult<String> {
        match node.kind() {
            NodeKind::SourceFile | NodeKind::Body | NodeKind::RuleBody => {
                self.render_sequence(node)
            }
            NodeKind::If => self.render_if(node),
            NodeKind::Diagnostic => self.render_diagnostic(node),
            NodeKind::Comment => {
                let text = node.text();
                Ok(format!("//{}", text.strip_prefix('#').unwrap_or(text)))
            }
            NodeKind::Identifier => Ok(node.text().to_string()),
            NodeKind::String => Ok(zig::string_literal(unquote(node.text()))),
            NodeKind::Not => self.render_not(node),
            NodeKind::And => self.render_binary(node, "and"),
            NodeKind::Or => self.render_binary(node, "or"),
            NodeKind::Eq => {
                let (left, right) = self.operands(node)?;
                Ok(format!("std.mem.eql(u8, {}, {})", left, right))
            }
            NodeKind::IsDefined => {
                let name = node
                    .find(&NodeKind::Identifier)
                    .ok_or_else(|| malformed(node, "variable name"))?;
                Ok(format!("({} != null)", zig::getenv(name.text())))
            }
            NodeKind::Assign
            | NodeKind::AppendAssign
            | NodeKind::ExpandingAssign
            | NodeKind::AppendExpandingAssign => self.render_assignment(node),
            NodeKind::RecursiveExpand
            | NodeKind::RecursiveExpandStripTrailingSlash
            | NodeKind::NonRecursiveExpand
            | NodeKind::Value
            | NodeKind::Literal
            | NodeKind::Message
            | NodeKind::Command
            | NodeKind::Path => {
                let fragments = self.fragments(node)?;
                Ok(self.expression(&fragments))
            }
            NodeKind::Rule => self.render_rule(node),
            NodeKind::BuildCommand => self.render_build_command(node),
            NodeKind::Include => self.render_include(node),
            NodeKind::Search => self.render_search(node),
            NodeKind::Undef => {
                let name = node
                    .find(&NodeKind::Identifier)
                    .ok_or_else(|| malformed(node, "variable name"))?;
                self.environment.undefine(name.text());
                Ok(format!("{} = \"\";", zig::variable(name.text())))
            }
            NodeKind::Error => Ok(zig::malformed(node.text(), node.line())),
            _ if !node.is_named() => Ok(self.verbatim(node)),
            _ => Err(unknown(node)),
        }
    }

    /// Fallback for unnamed nodes without a rule: their source text.
    fn verbatim(&mut self, node: &SyntaxNode<'_>) -> String {
        let message = format!(
            "no rendering rule for unnamed '{}' node, emitting its text verbatim",
            node.kind()
        );
        warn!("line {}: {}", node.line(), message);
        self.warnings.push(Warning {
            line: node.line(),
            message,
        });
        node.text().to_string()
    }

    fn render_sequence(&mut self, node: &SyntaxNode<'_>) -> ZigifyResult<String> {
        let parts = node
            .children()
            .iter()
            .map(|child| self.render(child))
            .collect::<ZigifyResult<Vec<_>>>()?;
        Ok(parts.join("\n"))
    }

    // --- Conditionals ---

    fn render_if(&mut self, node: &SyntaxNode<'_>) -> ZigifyResult<String> {
        let keyword = node
            .children()
            .iter()
            .find(|child| !child.is_named())
            .map_or("%if", SyntaxNode::text);

        let mut named = node.named_children();
        let condition = named.next().ok_or_else(|| malformed(node, "condition"))?;
        let body = named.next().ok_or_else(|| malformed(node, "body"))?;

        let condition = self.render_condition(keyword, condition)?;
        let body = self.render(body)?;
        let mut out = format!("if ({}) {}", condition, zig::block(&body));

        for clause in named {
            match clause.kind() {
                NodeKind::ElifClause => {
                    let condition = clause
                        .named_child(0)
                        .ok_or_else(|| malformed(clause, "condition"))?;
                    let body = clause
                        .named_child(1)
                        .ok_or_else(|| malformed(clause, "body"))?;
                    let condition = self.render(condition)?;
                    let body = self.render(body)?;
                    out.push_str(&format!(" else if ({}) {}", condition, zig::block(&body)));
                }
                NodeKind::ElseClause => {
                    let body = clause
                        .named_child(0)
                        .ok_or_else(|| malformed(clause, "body"))?;
                    let body = self.render(body)?;
                    out.push_str(&format!(" else {}", zig::block(&body)));
                }
                _ => return Err(malformed(node, "elif or else clause")),
            }
        }
        Ok(out)
    }

    fn render_condition(
        &mut self,
        keyword: &str,
        condition: &SyntaxNode<'_>,
    ) -> ZigifyResult<String> {
        let exists = |path: String| {
            format!(
                "(if (std.fs.cwd().access({}, .{{}})) |_| true else |_| false)",
                path
            )
        };
        match keyword {
            "%ifdef" => Ok(format!("({} != null)", zig::getenv(condition.text()))),
            "%ifndef" => Ok(format!("({} == null)", zig::getenv(condition.text()))),
            "%iffile" => Ok(exists(self.render(condition)?)),
            "%ifnofile" => Ok(format!("!{}", exists(self.render(condition)?))),
            _ => self.render(condition),
        }
    }

    fn operands(&mut self, node: &SyntaxNode<'_>) -> ZigifyResult<(String, String)> {
        let left = node
            .named_child(0)
            .ok_or_else(|| malformed(node, "left operand"))?;
        let right = node
            .named_child(1)
            .ok_or_else(|| malformed(node, "right operand"))?;
        Ok((self.render(left)?, self.render(right)?))
    }

    fn render_binary(&mut self, node: &SyntaxNode<'_>, op: &str) -> ZigifyResult<String> {
        let (mut left, mut right) = self.operands(node)?;
        if *node.kind() == NodeKind::And {
            // `and` binds tighter than `or` in Zig as well.
            for (operand, text) in node.named_children().zip([&mut left, &mut right]) {
                if *operand.kind() == NodeKind::Or {
                    *text = format!("({})", text);
                }
            }
        }
        Ok(format!("{} {} {}", left, op, right))
    }

    fn render_not(&mut self, node: &SyntaxNode<'_>) -> ZigifyResult<String> {
        let operand = node
            .named_child(0)
            .ok_or_else(|| malformed(node, "operand"))?;
        let text = self.render(operand)?;
        match operand.kind() {
            NodeKind::And | NodeKind::Or => Ok(format!("!({})", text)),
            _ => Ok(format!("!{}", text)),
        }
    }

    fn render_diagnostic(&mut self, node: &SyntaxNode<'_>) -> ZigifyResult<String> {
        let marker = node.child(0).ok_or_else(|| malformed(node, "marker"))?;
        let message = match node.child(1) {
            Some(message) => self.render(message)?,
            None => zig::string_literal(""),
        };
        format_diagnostic(marker.text(), &message, node.line())
    }

    // --- Variables ---

    fn render_assignment(&mut self, node: &SyntaxNode<'_>) -> ZigifyResult<String> {
        let name = node
            .find(&NodeKind::Identifier)
            .ok_or_else(|| malformed(node, "variable name"))?
            .text();
        let mut fragments = match node.named_child(1) {
            Some(value) => self.fragments(value)?,
            None => Vec::new(),
        };

        let expanding = matches!(
            node.kind(),
            NodeKind::ExpandingAssign | NodeKind::AppendExpandingAssign
        );
        if expanding {
            fragments = self.freeze(fragments, node.line());
        }

        let value = self.expression(&fragments);
        let stored = to_source(&fragments);
        let target = zig::variable(name);

        match node.kind() {
            NodeKind::Assign | NodeKind::ExpandingAssign => {
                self.environment.assign(name, stored);
                Ok(format!("{} = {};", target, value))
            }
            _ => {
                let separator = self.options.append_separator.as_str();
                let previous = self.environment.get(name).map(str::to_string);
                self.environment.append(name, &stored, separator);
                let Some(previous) = previous else {
                    return Ok(format!("{} = {};", target, value));
                };
                let mut parts = vec![target.clone()];
                if !separator.is_empty() && !previous.is_empty() && !stored.is_empty() {
                    parts.push(zig::string_literal(separator));
                }
                parts.push(value);
                Ok(format!("{} = {};", target, zig::concat(&parts)))
            }
        }
    }

    /// Text of a value-like node as fragments, with immediate expansions
    /// already substituted.
    pub(crate) fn fragments(&mut self, node: &SyntaxNode<'_>) -> ZigifyResult<Vec<Fragment>> {
        let mut fragments = Vec::new();
        match node.kind() {
            NodeKind::RecursiveExpand
            | NodeKind::RecursiveExpandStripTrailingSlash
            | NodeKind::NonRecursiveExpand => fragments.push(reference(node)?),
            // Front-ends that hand over the rest of the line as one leaf.
            _ if node.children().is_empty() => fragments.extend(split_references(node.text())),
            _ => {
                for child in node.children() {
                    match child.kind() {
                        NodeKind::Literal => fragments.extend(split_references(child.text())),
                        NodeKind::RecursiveExpand
                        | NodeKind::RecursiveExpandStripTrailingSlash
                        | NodeKind::NonRecursiveExpand => fragments.push(reference(child)?),
                        _ if !child.is_named() => {
                            let text = self.verbatim(child);
                            fragments.push(Fragment::Literal(text));
                        }
                        _ => return Err(unknown(child)),
                    }
                }
            }
        }
        Ok(self.substitute_immediate(fragments, node.line()))
    }

    fn substitute_immediate(&self, fragments: Vec<Fragment>, line: usize) -> Vec<Fragment> {
        let mut out = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            match fragment {
                Fragment::Reference {
                    name,
                    expansion: Expansion::Immediate,
                } => match self.environment.get(&name) {
                    Some(value) => out.extend(split_references(value).into_iter().map(
                        |fragment| match fragment {
                            Fragment::Reference {
                                name,
                                expansion: Expansion::Immediate,
                            } => Fragment::Literal(
                                self.environment.resolve(&name).unwrap_or_default(),
                            ),
                            fragment => fragment,
                        },
                    )),
                    None => debug!("line {}: $[{}] is not bound, expanding to nothing", line, name),
                },
                fragment => out.push(fragment),
            }
        }
        out
    }

    /// Replaces every reference with its current fully expanded value.
    fn freeze(&self, fragments: Vec<Fragment>, line: usize) -> Vec<Fragment> {
        fragments
            .into_iter()
            .map(|fragment| match fragment {
                Fragment::Reference { name, expansion } => {
                    let mut value = self.environment.resolve(&name).unwrap_or_else(|| {
                        debug!("line {}: '{}' is not bound, freezing it as empty", line, name);
                        String::new()
                    });
                    if expansion == Expansion::RecursiveStripSlash {
                        value.truncate(value.trim_end_matches('/').len());
                    }
                    Fragment::Literal(value)
                }
                literal => literal,
            })
            .collect()
    }

    /// A Zig `[]const u8` expression producing the fragments at run time.
    pub(crate) fn expression(&self, fragments: &[Fragment]) -> String {
        let mut parts = Vec::new();
        let mut literal = String::new();
        for fragment in fragments {
            match fragment {
                Fragment::Literal(text) => literal.push_str(text),
                Fragment::Reference { name, expansion } => {
                    if !literal.is_empty() {
                        parts.push(zig::string_literal(&std::mem::take(&mut literal)));
                    }
                    parts.push(self.reference_expression(name, *expansion));
                }
            }
        }
        if !literal.is_empty() {
            parts.push(zig::string_literal(&literal));
        }

        match parts.len() {
            0 => zig::string_literal(""),
            1 => parts.remove(0),
            _ => zig::concat(&parts),
        }
    }

    /// Bound variables are read from the variable namespace, anything else
    /// from the process environment of the build.
    fn reference_expression(&self, name: &str, expansion: Expansion) -> String {
        let value = if self.environment.contains(name) {
            zig::variable(name)
        } else {
            zig::getenv_or_empty(name)
        };
        match expansion {
            Expansion::RecursiveStripSlash => format!("std.mem.trimRight(u8, {}, \"/\")", value),
            Expansion::Recursive | Expansion::Immediate => value,
        }
    }

    /// Expands fragments completely while transpiling. References unknown to
    /// the environment fall back to the transpiler's own process environment.
    pub(crate) fn static_text(&self, fragments: &[Fragment]) -> String {
        let mut out = String::new();
        for fragment in fragments {
            match fragment {
                Fragment::Literal(text) => out.push_str(text),
                Fragment::Reference { name, expansion } => {
                    let value = self
                        .environment
                        .resolve(name)
                        .or_else(|| std::env::var(name).ok())
                        .unwrap_or_else(|| {
                            debug!("'{}' is not set, expanding to nothing", name);
                            String::new()
                        });
                    let value = match expansion {
                        Expansion::RecursiveStripSlash => value.trim_end_matches('/'),
                        Expansion::Recursive | Expansion::Immediate => value.as_str(),
                    };
                    out.push_str(value);
                }
            }
        }
        out
    }

    // --- Rules ---

    fn render_rule(&mut self, node: &SyntaxNode<'_>) -> ZigifyResult<String> {
        let target = node
            .named_child(0)
            .ok_or_else(|| malformed(node, "target"))?;
        let body = match node.find(&NodeKind::RuleBody) {
            Some(body) => self.render(body)?,
            None => String::new(),
        };

        match target.kind() {
            NodeKind::Always => Ok(body),
            NodeKind::TargetDecl => {
                self.uses_builder = true;
                Ok(zig::build_step(target.text(), &body))
            }
            _ => Err(unknown(target)),
        }
    }

    fn render_build_command(&mut self, node: &SyntaxNode<'_>) -> ZigifyResult<String> {
        let modifiers: String = node
            .named_children()
            .filter(|child| *child.kind() == NodeKind::CommandMod)
            .map(SyntaxNode::text)
            .collect();
        let command = match node.find(&NodeKind::Command) {
            Some(command) => self.render(command)?,
            None => zig::string_literal(""),
        };

        if let Some(builtin) = node.find(&NodeKind::BuiltinCommand) {
            return Ok(match builtin.text() {
                "~mkdir" => format!("try std.fs.cwd().makePath({});", command),
                "~time" => format!(
                    "std.debug.print(\"{{s}}{{d}}\\n\", .{{ {}, std.time.timestamp() }});",
                    command
                ),
                "~task" | "~current" => format!("std.debug.print(\"==> {{s}}\\n\", .{{{}}});", command),
                other => {
                    let message = format!("unsupported builtin command '{}'", other);
                    warn!("line {}: {}", node.line(), message);
                    self.warnings.push(Warning {
                        line: node.line(),
                        message,
                    });
                    format!("// {}", node.text())
                }
            });
        }

        if modifiers.contains('|') {
            return Ok(format!("std.debug.print(\"{{s}}\\n\", .{{{}}});", command));
        }
        if modifiers.contains('!') {
            return Ok(format!("std.debug.print(\"{{s}}\", .{{{}}});", command));
        }
        Ok(format!(
            "try run({}, {}, {});",
            command,
            !modifiers.contains('@'),
            !modifiers.contains('-')
        ))
    }

    fn render_search(&mut self, node: &SyntaxNode<'_>) -> ZigifyResult<String> {
        let path = node
            .find(&NodeKind::Path)
            .ok_or_else(|| malformed(node, "path"))?;
        let fragments = self.fragments(path)?;
        let dir = self.static_text(&fragments);
        debug!("line {}: adding include search directory {}", node.line(), dir);
        self.search_dirs.push(PathBuf::from(&dir));
        Ok(format!("// search path: {}", dir))
    }
}

/// The reference an expansion node makes.
fn reference(node: &SyntaxNode<'_>) -> ZigifyResult<Fragment> {
    if let Some(modifier) = node.find(&NodeKind::ExpansionMod) {
        return Err(unknown(modifier));
    }
    let name = node
        .find(&NodeKind::Identifier)
        .ok_or_else(|| malformed(node, "variable name"))?;
    let expansion = match node.kind() {
        NodeKind::RecursiveExpand => Expansion::Recursive,
        NodeKind::RecursiveExpandStripTrailingSlash => Expansion::RecursiveStripSlash,
        _ => Expansion::Immediate,
    };
    Ok(Fragment::reference(name.text(), expansion))
}
