use crate::{
    ast::{NodeKind, SyntaxNode},
    interface::Frontend,
};

/// The built-in bmake front-end.
///
/// Lines it cannot parse are kept in the tree as `ERROR` nodes, consecutive
/// ones merged into a single span. A conditional whose header does not parse,
/// or which never reaches its `%endif`, becomes one `ERROR` span as a whole.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BmakeParser;

impl Frontend for BmakeParser {
    fn parse<'a>(&self, source: &'a str) -> SyntaxNode<'a> {
        parse(source)
    }
}

const CONDITIONALS: [&str; 5] = ["%if", "%ifdef", "%ifndef", "%iffile", "%ifnofile"];

#[inline]
fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

#[inline]
fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Length in bytes of the identifier at the start of `s`, 0 if none.
fn identifier_len(s: &str) -> usize {
    match s.chars().next() {
        Some(c) if is_ident_start(c) => s
            .find(|c: char| !is_ident_continue(c))
            .unwrap_or(s.len()),
        _ => 0,
    }
}

/// `%word` at the start of `s`, if any.
fn directive_name(s: &str) -> Option<&str> {
    let word = s.strip_prefix('%')?;
    let len = identifier_len(word);
    if len == 0 { None } else { Some(&s[..=len]) }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    /// Current line number (1-indexed)
    line: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Parser {
            input,
            pos: 0,
            line: 1,
        }
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn current_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Peek if the remaining input starts with `s`
    fn peek(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    /// Advances by `len` bytes, counting any newlines passed.
    fn advance(&mut self, len: usize) {
        let end = self.pos + len;
        self.line += self.input[self.pos..end].matches('\n').count();
        self.pos = end;
    }

    /// Consume `s` if the remaining input starts with it.
    fn consume(&mut self, s: &str) -> bool {
        if self.peek(s) {
            self.advance(s.len());
            true
        } else {
            false
        }
    }

    fn reset(&mut self, pos: usize, line: usize) {
        self.pos = pos;
        self.line = line;
    }

    /// Skips spaces and tabs, never a newline.
    fn skip_inline_whitespace(&mut self) {
        let len = self
            .rest()
            .find(|c: char| !matches!(c, ' ' | '\t' | '\r'))
            .unwrap_or(self.rest().len());
        self.advance(len);
    }

    /// Skips all whitespace including newlines.
    fn skip_blank(&mut self) {
        let len = self
            .rest()
            .find(|c: char| !c.is_whitespace())
            .unwrap_or(self.rest().len());
        self.advance(len);
    }

    /// Byte offset of the end of the current line, excluding the newline.
    fn line_end(&self) -> usize {
        self.rest()
            .find('\n')
            .map_or(self.input.len(), |offset| self.pos + offset)
    }

    /// Moves past the end of the current line and its newline.
    fn finish_line(&mut self) {
        self.advance(self.line_end() - self.pos);
        self.consume("\n");
    }

    /// True when only whitespace or a comment is left on the current line.
    fn at_line_end(&mut self) -> bool {
        self.skip_inline_whitespace();
        self.eof() || self.peek("\n") || self.peek("#")
    }

    fn peek_directive(&self) -> Option<&'a str> {
        directive_name(self.rest())
    }

    fn node(&self, kind: NodeKind, start: usize, line: usize) -> SyntaxNode<'a> {
        SyntaxNode::named(kind, &self.input[start..self.pos]).at_line(line)
    }

    /// Like [`Parser::node`], without the whitespace skipped after the last
    /// child.
    fn trimmed_node(&self, kind: NodeKind, start: usize, line: usize) -> SyntaxNode<'a> {
        SyntaxNode::named(kind, self.input[start..self.pos].trim_end()).at_line(line)
    }

    /// Consumes `s` as an anonymous token node.
    fn token(&mut self, s: &str) -> Option<SyntaxNode<'a>> {
        let (start, line) = (self.pos, self.line);
        if self.consume(s) {
            Some(SyntaxNode::token(&self.input[start..self.pos]).at_line(line))
        } else {
            None
        }
    }

    fn consume_identifier(&mut self) -> Option<SyntaxNode<'a>> {
        let len = identifier_len(self.rest());
        if len == 0 {
            return None;
        }
        let (start, line) = (self.pos, self.line);
        self.advance(len);
        Some(self.node(NodeKind::Identifier, start, line))
    }

    /// An `ERROR` node covering the rest of the line starting at `start`.
    fn error_line(&mut self, start: usize, line: usize) -> SyntaxNode<'a> {
        self.reset(start, line);
        self.advance(self.line_end() - self.pos);
        self.node(NodeKind::Error, start, line)
    }

    // --- Statements ---

    /// Parse statements until one of the `terminators` directives or EOF.
    fn parse_statements(&mut self, terminators: &[&str]) -> Vec<SyntaxNode<'a>> {
        let mut nodes = Vec::new();
        // Start and line of the error node at the end of `nodes`, if any.
        let mut open_error: Option<(usize, usize)> = None;

        loop {
            self.skip_blank();
            if self.eof() {
                break;
            }
            if self
                .peek_directive()
                .is_some_and(|directive| terminators.contains(&directive))
            {
                break;
            }

            let start = self.pos;
            let node = self.parse_statement();

            if *node.kind() == NodeKind::Error {
                if let Some((error_start, error_line)) = open_error {
                    nodes.pop();
                    nodes.push(self.node(NodeKind::Error, error_start, error_line));
                    continue;
                }
                open_error = Some((start, node.line()));
            } else {
                open_error = None;
            }
            nodes.push(node);
        }
        nodes
    }

    fn parse_statement(&mut self) -> SyntaxNode<'a> {
        let (start, line) = (self.pos, self.line);
        let parsed = match self.current_char() {
            Some('#') => Some(self.parse_comment()),
            Some('%') => return self.parse_directive(),
            Some('.') => self.parse_rule(),
            Some(c) if is_ident_start(c) => self.parse_assignment_or_rule(),
            _ => None,
        };
        parsed.unwrap_or_else(|| self.error_line(start, line))
    }

    fn parse_comment(&mut self) -> SyntaxNode<'a> {
        let (start, line) = (self.pos, self.line);
        self.advance(self.line_end() - self.pos);
        self.trimmed_node(NodeKind::Comment, start, line)
    }

    fn parse_directive(&mut self) -> SyntaxNode<'a> {
        let (start, line) = (self.pos, self.line);
        let parsed = match self.peek_directive() {
            Some(directive) if CONDITIONALS.contains(&directive) => {
                if let Some(node) = self.parse_conditional(directive) {
                    return node;
                }
                self.reset(start, line);
                self.skip_block();
                return self.node(NodeKind::Error, start, line);
            }
            Some(directive @ ("%error" | "%warn" | "%warning" | "%message")) => {
                self.parse_diagnostic(directive)
            }
            Some(directive @ "%include") => self.parse_path_directive(NodeKind::Include, directive),
            Some(directive @ "%search") => self.parse_path_directive(NodeKind::Search, directive),
            Some(directive @ "%undef") => self.parse_undef(directive),
            _ => None,
        };
        parsed.unwrap_or_else(|| self.error_line(start, line))
    }

    fn parse_diagnostic(&mut self, directive: &str) -> Option<SyntaxNode<'a>> {
        let (start, line) = (self.pos, self.line);
        let marker = self.token(directive)?;
        self.skip_inline_whitespace();
        let message = self.parse_text(NodeKind::Message);
        Some(
            self.node(NodeKind::Diagnostic, start, line)
                .with_children(vec![marker, message]),
        )
    }

    fn parse_path_directive(&mut self, kind: NodeKind, directive: &str) -> Option<SyntaxNode<'a>> {
        let (start, line) = (self.pos, self.line);
        let keyword = self.token(directive)?;
        self.skip_inline_whitespace();
        let path = self.parse_text(NodeKind::Path);
        if path.text().is_empty() {
            return None;
        }
        Some(self.node(kind, start, line).with_children(vec![keyword, path]))
    }

    fn parse_undef(&mut self, directive: &str) -> Option<SyntaxNode<'a>> {
        let (start, line) = (self.pos, self.line);
        let keyword = self.token(directive)?;
        self.skip_inline_whitespace();
        let name = self.consume_identifier()?;
        let node = self
            .node(NodeKind::Undef, start, line)
            .with_children(vec![keyword, name]);
        if !self.at_line_end() {
            return None;
        }
        Some(node)
    }

    fn parse_assignment_or_rule(&mut self) -> Option<SyntaxNode<'a>> {
        let (start, line) = (self.pos, self.line);
        let name = self.consume_identifier()?;
        self.skip_inline_whitespace();

        if name.text() == "always" && self.peek(":") {
            self.reset(start, line);
            return self.parse_rule();
        }

        let (kind, op) = [
            (NodeKind::ExpandingAssign, "=%"),
            (NodeKind::AppendExpandingAssign, "+%"),
            (NodeKind::AppendAssign, "+="),
            (NodeKind::Assign, "="),
            (NodeKind::AppendAssign, "+"),
        ]
        .into_iter()
        .find(|(_, op)| self.peek(op))?;

        let op = self.token(op)?;
        self.skip_inline_whitespace();
        let value = self.parse_text(NodeKind::Value);
        Some(
            self.trimmed_node(kind, start, line)
                .with_children(vec![name, op, value]),
        )
    }

    // --- Text with expansions ---

    /// Parses the rest of the line, minus trailing whitespace, into literal
    /// runs and expansions.
    fn parse_text(&mut self, kind: NodeKind) -> SyntaxNode<'a> {
        let (start, line) = (self.pos, self.line);
        let line_end = self.line_end();
        let end = start + self.input[start..line_end].trim_end().len();

        let mut children = Vec::new();
        let mut literal_start = start;
        while self.pos < end {
            if self.peek("$$") {
                self.advance(2);
                continue;
            }
            if self.peek("$(") || self.peek("${") || self.peek("$[") {
                let (expansion_start, expansion_line) = (self.pos, self.line);
                if let Some(expansion) = self.parse_expansion(end) {
                    if literal_start < expansion_start {
                        children.push(
                            SyntaxNode::named(
                                NodeKind::Literal,
                                &self.input[literal_start..expansion_start],
                            )
                            .at_line(line),
                        );
                    }
                    children.push(expansion);
                    literal_start = self.pos;
                    continue;
                }
                self.reset(expansion_start, expansion_line);
            }
            let len = self.current_char().map_or(1, char::len_utf8);
            self.advance(len);
        }
        if literal_start < end {
            children.push(
                SyntaxNode::named(NodeKind::Literal, &self.input[literal_start..end]).at_line(line),
            );
        }

        let node = SyntaxNode::named(kind, &self.input[start..end])
            .at_line(line)
            .with_children(children);
        self.advance(line_end - self.pos);
        node
    }

    /// Parses `$(NAME)`, `${NAME}`, `$[NAME]` or `$[@mod NAME, ...]`, not
    /// reading past `limit`.
    fn parse_expansion(&mut self, limit: usize) -> Option<SyntaxNode<'a>> {
        let (start, line) = (self.pos, self.line);
        let (kind, open, close) = if self.peek("$(") {
            (NodeKind::RecursiveExpand, "$(", ")")
        } else if self.peek("${") {
            (NodeKind::RecursiveExpandStripTrailingSlash, "${", "}")
        } else if self.peek("$[") {
            (NodeKind::NonRecursiveExpand, "$[", "]")
        } else {
            return None;
        };

        let mut children = vec![self.token(open)?];
        self.skip_inline_whitespace();

        if kind == NodeKind::NonRecursiveExpand && self.peek("@") {
            let (mod_start, mod_line) = (self.pos, self.line);
            self.advance(1);
            let len = identifier_len(self.rest());
            if len == 0 {
                return None;
            }
            self.advance(len);
            children.push(self.node(NodeKind::ExpansionMod, mod_start, mod_line));
            self.skip_inline_whitespace();
            loop {
                children.push(self.consume_identifier()?);
                self.skip_inline_whitespace();
                match self.token(",") {
                    Some(comma) => {
                        children.push(comma);
                        self.skip_inline_whitespace();
                    }
                    None => break,
                }
            }
        } else {
            children.push(self.consume_identifier()?);
            self.skip_inline_whitespace();
        }

        if self.pos + close.len() > limit {
            return None;
        }
        children.push(self.token(close)?);
        Some(self.node(kind, start, line).with_children(children))
    }

    // --- Condition Parsing (Recursive Descent for boolean expressions) ---
    // Precedence: OR -> AND -> EQ -> NOT -> Primary

    // Entry point for parsing a condition expression
    fn parse_expression(&mut self) -> Option<SyntaxNode<'a>> {
        self.parse_or_expression()
    }

    fn parse_binary(
        &mut self,
        kind: &NodeKind,
        op: &str,
        operand: fn(&mut Self) -> Option<SyntaxNode<'a>>,
    ) -> Option<SyntaxNode<'a>> {
        self.skip_inline_whitespace();
        let (start, line) = (self.pos, self.line);
        let mut left = operand(self)?;
        loop {
            self.skip_inline_whitespace();
            match self.token(op) {
                Some(token) => {
                    let right = operand(self)?;
                    left = self
                        .trimmed_node(kind.clone(), start, line)
                        .with_children(vec![left, token, right]);
                }
                None => break,
            }
        }
        Some(left)
    }

    // Handles OR (||)
    fn parse_or_expression(&mut self) -> Option<SyntaxNode<'a>> {
        self.parse_binary(&NodeKind::Or, "||", Self::parse_and_expression)
    }

    // Handles AND (&&)
    fn parse_and_expression(&mut self) -> Option<SyntaxNode<'a>> {
        self.parse_binary(&NodeKind::And, "&&", Self::parse_eq_expression)
    }

    // Handles EQ (==), which does not chain
    fn parse_eq_expression(&mut self) -> Option<SyntaxNode<'a>> {
        self.skip_inline_whitespace();
        let (start, line) = (self.pos, self.line);
        let left = self.parse_not_expression()?;
        self.skip_inline_whitespace();
        match self.token("==") {
            Some(token) => {
                let right = self.parse_not_expression()?;
                Some(
                    self.trimmed_node(NodeKind::Eq, start, line)
                        .with_children(vec![left, token, right]),
                )
            }
            None => Some(left),
        }
    }

    // Handles NOT (!)
    fn parse_not_expression(&mut self) -> Option<SyntaxNode<'a>> {
        self.skip_inline_whitespace();
        let (start, line) = (self.pos, self.line);
        match self.token("!") {
            Some(token) => {
                let operand = self.parse_not_expression()?;
                Some(
                    self.trimmed_node(NodeKind::Not, start, line)
                        .with_children(vec![token, operand]),
                )
            }
            None => self.parse_primary_expression(),
        }
    }

    fn parse_primary_expression(&mut self) -> Option<SyntaxNode<'a>> {
        self.skip_inline_whitespace();
        let (start, line) = (self.pos, self.line);

        if self.consume("(") {
            let inner = self.parse_expression()?;
            self.skip_inline_whitespace();
            return self.consume(")").then_some(inner);
        }

        if self.peek("\"") {
            let closing = self.input[start + 1..self.line_end()].find('"')?;
            self.advance(closing + 2);
            return Some(self.node(NodeKind::String, start, line));
        }

        if self.peek("$") {
            return self.parse_expansion(self.line_end());
        }

        let name = self.consume_identifier()?;
        if name.text() != "defined" {
            return Some(name);
        }

        self.skip_inline_whitespace();
        let Some(open) = self.token("(") else {
            // A variable that happens to be called `defined`.
            return Some(name);
        };
        self.skip_inline_whitespace();
        let target = self.consume_identifier()?;
        self.skip_inline_whitespace();
        let close = self.token(")")?;
        let keyword = SyntaxNode::token(name.text()).at_line(line);
        Some(
            self.node(NodeKind::IsDefined, start, line)
                .with_children(vec![keyword, open, target, close]),
        )
    }

    // --- Control Flow Parsing ---

    fn parse_conditional(&mut self, directive: &str) -> Option<SyntaxNode<'a>> {
        let (start, line) = (self.pos, self.line);
        let keyword = self.token(directive)?;
        self.skip_inline_whitespace();

        let condition = match directive {
            "%if" => self.parse_expression()?,
            "%ifdef" | "%ifndef" => self.consume_identifier()?,
            _ => {
                let path = self.parse_text(NodeKind::Path);
                if path.text().is_empty() {
                    return None;
                }
                path
            }
        };
        if !self.at_line_end() {
            return None;
        }
        self.finish_line();

        let body = self.parse_body(&["%elif", "%else", "%endif"]);
        let mut children = vec![keyword, condition, body];

        loop {
            self.skip_blank();
            let (clause_start, clause_line) = (self.pos, self.line);
            match self.peek_directive() {
                Some("%elif") => {
                    let keyword = self.token("%elif")?;
                    let condition = self.parse_expression()?;
                    if !self.at_line_end() {
                        return None;
                    }
                    self.finish_line();
                    let body = self.parse_body(&["%elif", "%else", "%endif"]);
                    children.push(
                        self.node(NodeKind::ElifClause, clause_start, clause_line)
                            .with_children(vec![keyword, condition, body]),
                    );
                }
                Some("%else") => {
                    let keyword = self.token("%else")?;
                    if !self.at_line_end() {
                        return None;
                    }
                    self.finish_line();
                    let body = self.parse_body(&["%endif"]);
                    children.push(
                        self.node(NodeKind::ElseClause, clause_start, clause_line)
                            .with_children(vec![keyword, body]),
                    );
                }
                Some("%endif") => {
                    children.push(self.token("%endif")?);
                    break;
                }
                _ => return None,
            }
        }

        let node = self
            .node(NodeKind::If, start, line)
            .with_children(children);
        // Anything after `%endif` on its line is a comment.
        self.advance(self.line_end() - self.pos);
        Some(node)
    }

    fn parse_body(&mut self, terminators: &[&str]) -> SyntaxNode<'a> {
        let (start, line) = (self.pos, self.line);
        let children = self.parse_statements(terminators);
        self.node(NodeKind::Body, start, line)
            .with_children(children)
    }

    /// Skips a conditional block through its matching `%endif`, or to EOF.
    fn skip_block(&mut self) {
        let mut depth = 0usize;
        while !self.eof() {
            let end = self.line_end();
            match directive_name(self.input[self.pos..end].trim_start()) {
                Some(directive) if CONDITIONALS.contains(&directive) => depth += 1,
                Some("%endif") => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.advance(end - self.pos);
            if depth == 0 {
                return;
            }
            self.consume("\n");
        }
    }

    // --- Rules ---

    fn parse_rule(&mut self) -> Option<SyntaxNode<'a>> {
        let (start, line) = (self.pos, self.line);

        let target = if self.peek("always") {
            let (target_start, target_line) = (self.pos, self.line);
            self.advance("always".len());
            self.node(NodeKind::Always, target_start, target_line)
        } else if self.peek(".") {
            let header = &self.input[self.pos..self.line_end()];
            let colon = header.find(':')?;
            let decl = header[..colon].trim_end();
            if decl.is_empty() || decl.contains(char::is_whitespace) || decl.contains('=') {
                return None;
            }
            let (target_start, target_line) = (self.pos, self.line);
            self.advance(decl.len());
            self.node(NodeKind::TargetDecl, target_start, target_line)
        } else {
            return None;
        };

        self.skip_inline_whitespace();
        let colon = self.token(":")?;
        let header_end = self.pos;
        if !self.at_line_end() {
            return None;
        }
        self.finish_line();

        let body = self.parse_rule_body(header_end);
        Some(
            self.node(NodeKind::Rule, start, line)
                .with_children(vec![target, colon, body]),
        )
    }

    /// Indented lines following a rule header. Blank lines in between are
    /// allowed, the first non-indented line ends the body.
    fn parse_rule_body(&mut self, header_end: usize) -> SyntaxNode<'a> {
        let (start, line) = (self.pos, self.line);
        let mut commands = Vec::new();

        loop {
            let mut probe = self.pos;
            let indented = loop {
                let end = self.input[probe..]
                    .find('\n')
                    .map_or(self.input.len(), |offset| probe + offset);
                let text = &self.input[probe..end];
                if !text.trim().is_empty() {
                    break text.starts_with([' ', '\t']);
                }
                if end >= self.input.len() {
                    break false;
                }
                probe = end + 1;
            };
            if !indented {
                break;
            }

            self.advance(probe - self.pos);
            self.skip_inline_whitespace();
            let command = if self.peek("#") {
                self.parse_comment()
            } else {
                self.parse_build_command()
            };
            commands.push(command);
            if self.peek("\n") {
                self.consume("\n");
            }
        }

        if commands.is_empty() {
            return SyntaxNode::named(NodeKind::RuleBody, &self.input[header_end..header_end])
                .at_line(line);
        }

        SyntaxNode::named(NodeKind::RuleBody, self.input[start..self.pos].trim_end())
            .at_line(line)
            .with_children(commands)
    }

    fn parse_build_command(&mut self) -> SyntaxNode<'a> {
        let (start, line) = (self.pos, self.line);
        let mut children = Vec::new();

        while let Some(c @ ('-' | '|' | '@' | '!')) = self.current_char() {
            let (mod_start, mod_line) = (self.pos, self.line);
            self.advance(c.len_utf8());
            children.push(self.node(NodeKind::CommandMod, mod_start, mod_line));
        }

        if self.peek("~") {
            let len = identifier_len(&self.rest()[1..]);
            if len > 0 {
                let (builtin_start, builtin_line) = (self.pos, self.line);
                self.advance(len + 1);
                children.push(self.node(NodeKind::BuiltinCommand, builtin_start, builtin_line));
            }
        }

        self.skip_inline_whitespace();
        children.push(self.parse_text(NodeKind::Command));

        SyntaxNode::named(NodeKind::BuildCommand, self.input[start..self.pos].trim_end())
            .at_line(line)
            .with_children(children)
    }
}

pub(crate) fn parse(input: &str) -> SyntaxNode<'_> {
    let mut parser = Parser::new(input);
    let statements = parser.parse_statements(&[]);
    SyntaxNode::named(NodeKind::SourceFile, input).with_children(statements)
}


/// Tests for the parser module via `parse`.
#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(node: &SyntaxNode<'_>) -> Vec<NodeKind> {
        node.named_children().map(|c| c.kind().clone()).collect()
    }

    fn only_statement<'a>(tree: &'a SyntaxNode<'a>) -> &'a SyntaxNode<'a> {
        assert_eq!(tree.children().len(), 1, "expected one statement: {:#?}", tree);
        &tree.children()[0]
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_empty_input() {
        let tree = parse("");
        assert_eq!(*tree.kind(), NodeKind::SourceFile);
        assert!(tree.children().is_empty());

        let tree = parse("\n  \n\t\n");
        assert!(tree.children().is_empty());
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_simple_assignment() {
        let tree = parse("CC = clang  \n");
        let assign = only_statement(&tree);
        assert_eq!(*assign.kind(), NodeKind::Assign);
        assert_eq!(assign.text(), "CC = clang");
        assert_eq!(kinds(assign), vec![NodeKind::Identifier, NodeKind::Value]);
        assert_eq!(assign.named_child(0).unwrap().text(), "CC");
        assert_eq!(assign.named_child(1).unwrap().text(), "clang");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_crlf_line_endings() {
        let tree = parse("# hello\r\nCC = clang\r\n");
        assert_eq!(kinds(&tree), vec![NodeKind::Comment, NodeKind::Assign]);
        assert_eq!(tree.children()[0].text(), "# hello");
        assert_eq!(tree.children()[1].text(), "CC = clang");
        assert_eq!(tree.children()[1].named_child(1).unwrap().text(), "clang");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_assignment_operators() {
        let cases = [
            ("X = 1", NodeKind::Assign),
            ("X + 1", NodeKind::AppendAssign),
            ("X += 1", NodeKind::AppendAssign),
            ("X =% 1", NodeKind::ExpandingAssign),
            ("X +% 1", NodeKind::AppendExpandingAssign),
        ];
        for (source, kind) in cases {
            let tree = parse(source);
            let node = only_statement(&tree);
            assert_eq!(*node.kind(), kind, "{}", source);
            assert_eq!(node.named_child(1).unwrap().text(), "1", "{}", source);
        }
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_empty_value() {
        let tree = parse("X =\n");
        let node = only_statement(&tree);
        assert_eq!(*node.kind(), NodeKind::Assign);
        assert_eq!(node.named_child(1).unwrap().text(), "");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_value_with_expansions() {
        let tree = parse("FLAGS = -I$(ROOT)/inc ${OUT} $[CC] $$HOME\n");
        let value = only_statement(&tree).named_child(1).unwrap();
        assert_eq!(
            kinds(value),
            vec![
                NodeKind::Literal,
                NodeKind::RecursiveExpand,
                NodeKind::Literal,
                NodeKind::RecursiveExpandStripTrailingSlash,
                NodeKind::Literal,
                NodeKind::NonRecursiveExpand,
                NodeKind::Literal,
            ]
        );
        let expand = value.named_child(1).unwrap();
        assert_eq!(expand.text(), "$(ROOT)");
        assert_eq!(expand.named_child(0).unwrap().text(), "ROOT");
        assert_eq!(value.named_child(6).unwrap().text(), " $$HOME");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_unterminated_expansion_is_literal() {
        let tree = parse("X = $(ROOT\n");
        let value = only_statement(&tree).named_child(1).unwrap();
        assert_eq!(kinds(value), vec![NodeKind::Literal]);
        assert_eq!(value.text(), "$(ROOT");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_expansion_modifier() {
        let tree = parse("X = $[@F SRC, OBJ]\n");
        let value = only_statement(&tree).named_child(1).unwrap();
        let expand = value.named_child(0).unwrap();
        assert_eq!(*expand.kind(), NodeKind::NonRecursiveExpand);
        assert_eq!(
            kinds(expand),
            vec![
                NodeKind::ExpansionMod,
                NodeKind::Identifier,
                NodeKind::Identifier
            ]
        );
        assert_eq!(expand.named_child(0).unwrap().text(), "@F");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_comment() {
        let tree = parse("# a comment\nX = 1\n");
        assert_eq!(kinds(&tree), vec![NodeKind::Comment, NodeKind::Assign]);
        assert_eq!(tree.children()[0].text(), "# a comment");
        assert_eq!(tree.children()[1].line(), 2);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_diagnostic() {
        let tree = parse("%error no compiler for $(TARGET)\n");
        let diagnostic = only_statement(&tree);
        assert_eq!(*diagnostic.kind(), NodeKind::Diagnostic);
        assert_eq!(diagnostic.children()[0].text(), "%error");
        assert!(!diagnostic.children()[0].is_named());
        let message = &diagnostic.children()[1];
        assert_eq!(*message.kind(), NodeKind::Message);
        assert_eq!(message.text(), "no compiler for $(TARGET)");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_directives() {
        let tree = parse("%include common.mki\n%search $(ROOT)/defs\n%undef CC\n");
        assert_eq!(
            kinds(&tree),
            vec![NodeKind::Include, NodeKind::Search, NodeKind::Undef]
        );
        assert_eq!(tree.children()[0].named_child(0).unwrap().text(), "common.mki");
        assert_eq!(tree.children()[2].named_child(0).unwrap().text(), "CC");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_simple_if() {
        let tree = parse("%if defined(DEBUG)\nX = 1\n%endif\n");
        let node = only_statement(&tree);
        assert_eq!(*node.kind(), NodeKind::If);
        assert_eq!(kinds(node), vec![NodeKind::IsDefined, NodeKind::Body]);
        assert_eq!(node.children()[0].text(), "%if");
        assert_eq!(node.children().last().unwrap().text(), "%endif");
        let is_defined = node.named_child(0).unwrap();
        assert_eq!(is_defined.named_child(0).unwrap().text(), "DEBUG");
        assert_eq!(kinds(node.named_child(1).unwrap()), vec![NodeKind::Assign]);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_if_elif_else() {
        let source = "%if A\nX = 1\n%elif B\nX = 2\n%else\nX = 3\n%endif\n";
        let tree = parse(source);
        let node = only_statement(&tree);
        assert_eq!(
            kinds(node),
            vec![
                NodeKind::Identifier,
                NodeKind::Body,
                NodeKind::ElifClause,
                NodeKind::ElseClause
            ]
        );
        let elif = node.named_child(2).unwrap();
        assert_eq!(kinds(elif), vec![NodeKind::Identifier, NodeKind::Body]);
        let other = node.named_child(3).unwrap();
        assert_eq!(kinds(other), vec![NodeKind::Body]);
        assert_eq!(other.named_child(0).unwrap().named_child(0).unwrap().text(), "X = 3");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_ifdef_and_iffile() {
        let tree = parse("%ifndef CC\nCC = cc\n%endif\n%iffile $(ROOT)/x.mki\n%include $(ROOT)/x.mki\n%endif\n");
        assert_eq!(kinds(&tree), vec![NodeKind::If, NodeKind::If]);
        let ifndef = &tree.children()[0];
        assert_eq!(ifndef.children()[0].text(), "%ifndef");
        assert_eq!(*ifndef.named_child(0).unwrap().kind(), NodeKind::Identifier);
        let iffile = &tree.children()[1];
        assert_eq!(*iffile.named_child(0).unwrap().kind(), NodeKind::Path);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_nested_if() {
        let tree = parse("%if A\n%if B\nX = 1\n%endif\n%endif\n");
        let outer = only_statement(&tree);
        let body = outer.named_child(1).unwrap();
        assert_eq!(kinds(body), vec![NodeKind::If]);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_condition_precedence() {
        let tree = parse("%if A || B && !C == \"x\"\n%endif\n");
        let condition = only_statement(&tree).named_child(0).unwrap();
        assert_eq!(*condition.kind(), NodeKind::Or);
        let right = condition.named_child(1).unwrap();
        assert_eq!(*right.kind(), NodeKind::And);
        let eq = right.named_child(1).unwrap();
        assert_eq!(*eq.kind(), NodeKind::Eq);
        assert_eq!(*eq.named_child(0).unwrap().kind(), NodeKind::Not);
        assert_eq!(*eq.named_child(1).unwrap().kind(), NodeKind::String);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_condition_parentheses() {
        let tree = parse("%if (A || B) && C\n%endif\n");
        let condition = only_statement(&tree).named_child(0).unwrap();
        assert_eq!(*condition.kind(), NodeKind::And);
        assert_eq!(*condition.named_child(0).unwrap().kind(), NodeKind::Or);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_condition_left_associative() {
        let tree = parse("%if A && B && C\n%endif\n");
        let condition = only_statement(&tree).named_child(0).unwrap();
        assert_eq!(condition.text(), "A && B && C");
        let left = condition.named_child(0).unwrap();
        assert_eq!(*left.kind(), NodeKind::And);
        assert_eq!(left.text(), "A && B");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_bad_condition_becomes_error_block() {
        let source = "%if A &&\nX = 1\n%endif\nY = 2\n";
        let tree = parse(source);
        assert_eq!(kinds(&tree), vec![NodeKind::Error, NodeKind::Assign]);
        assert_eq!(tree.children()[0].text(), "%if A &&\nX = 1\n%endif");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_unterminated_if_becomes_error_block() {
        let tree = parse("X = 0\n%if A\nX = 1\n");
        assert_eq!(kinds(&tree), vec![NodeKind::Assign, NodeKind::Error]);
        assert_eq!(tree.children()[1].text(), "%if A\nX = 1\n");
        assert_eq!(tree.children()[1].line(), 2);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_consecutive_error_lines_merge() {
        let tree = parse("X = 1\n!!! nonsense\n%bogus\n\nY = 2\n%endif\n");
        assert_eq!(
            kinds(&tree),
            vec![
                NodeKind::Assign,
                NodeKind::Error,
                NodeKind::Assign,
                NodeKind::Error
            ]
        );
        assert_eq!(tree.children()[1].text(), "!!! nonsense\n%bogus");
        assert_eq!(tree.children()[1].line(), 2);
        assert_eq!(tree.children()[3].text(), "%endif");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_always_rule() {
        let tree = parse("always:\n\t|Building\n\t-@rm -f out\n\n\t~mkdir $(OUT)\nX = 1\n");
        assert_eq!(kinds(&tree), vec![NodeKind::Rule, NodeKind::Assign]);
        let rule = &tree.children()[0];
        assert_eq!(kinds(rule), vec![NodeKind::Always, NodeKind::RuleBody]);
        let body = rule.named_child(1).unwrap();
        assert_eq!(
            kinds(body),
            vec![
                NodeKind::BuildCommand,
                NodeKind::BuildCommand,
                NodeKind::BuildCommand
            ]
        );
        let second = body.named_child(1).unwrap();
        assert_eq!(second.text(), "-@rm -f out");
        assert_eq!(
            kinds(second),
            vec![NodeKind::CommandMod, NodeKind::CommandMod, NodeKind::Command]
        );
        let third = body.named_child(2).unwrap();
        assert_eq!(third.named_child(0).unwrap().text(), "~mkdir");
        assert_eq!(third.named_child(1).unwrap().text(), "$(OUT)");
        assert_eq!(tree.children()[1].line(), 6);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_target_rule() {
        let tree = parse(".c.o:\n    cc -c $(SRC)\n");
        let rule = only_statement(&tree);
        assert_eq!(kinds(rule), vec![NodeKind::TargetDecl, NodeKind::RuleBody]);
        assert_eq!(rule.named_child(0).unwrap().text(), ".c.o");
        assert_eq!(rule.text(), ".c.o:\n    cc -c $(SRC)\n");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_rule_with_empty_body() {
        let tree = parse("always:\nX = 1\n");
        let rule = &tree.children()[0];
        let body = rule.named_child(1).unwrap();
        assert_eq!(*body.kind(), NodeKind::RuleBody);
        assert!(body.children().is_empty());
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_node_text_is_exact_span() {
        let source = "A = 1\n%if $(A) == \"1\"\n%message one\n%endif\n";
        let tree = parse(source);
        fn check(node: &SyntaxNode<'_>, source: &str) {
            let offset = node.text().as_ptr() as usize - source.as_ptr() as usize;
            assert_eq!(&source[offset..offset + node.text().len()], node.text());
            for child in node.children() {
                check(child, source);
            }
        }
        check(&tree, source);
        assert_eq!(tree.text(), source);
    }
}
