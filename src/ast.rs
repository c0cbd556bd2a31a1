use std::fmt;

/// The grammar production a [`SyntaxNode`] was built from.
///
/// The names returned by [`NodeKind::as_str`] follow the bmake tree-sitter
/// grammar, so trees produced by a foreign front-end can be mapped with
/// [`NodeKind::from_name`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    SourceFile,
    Body,
    If,
    ElifClause,
    ElseClause,
    Diagnostic,
    Comment,
    Identifier,
    String,
    Not,
    And,
    Or,
    Eq,
    IsDefined,
    Assign,
    AppendAssign,
    ExpandingAssign,
    AppendExpandingAssign,
    /// `$(NAME)`
    RecursiveExpand,
    /// `${NAME}`
    RecursiveExpandStripTrailingSlash,
    /// `$[NAME]`
    NonRecursiveExpand,
    /// `@F` and friends inside `$[ ]`.
    ExpansionMod,
    /// Right hand side of an assignment.
    Value,
    /// Plain text between expansions.
    Literal,
    /// Text of a diagnostic directive.
    Message,
    Rule,
    Always,
    TargetDecl,
    RuleBody,
    BuildCommand,
    CommandMod,
    BuiltinCommand,
    Command,
    Include,
    Search,
    Undef,
    Path,
    /// A span the front-end could not make sense of.
    Error,
    /// Anonymous keyword or punctuation; the node text is the token itself.
    Token,
    /// A production this crate has no name for.
    Other(String),
}

impl NodeKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::SourceFile => "source_file",
            Self::Body => "body",
            Self::If => "if",
            Self::ElifClause => "elif_clause",
            Self::ElseClause => "else_clause",
            Self::Diagnostic => "diagnostic",
            Self::Comment => "comment",
            Self::Identifier => "identifier",
            Self::String => "string",
            Self::Not => "not",
            Self::And => "and",
            Self::Or => "or",
            Self::Eq => "eq",
            Self::IsDefined => "is_defined",
            Self::Assign => "assign",
            Self::AppendAssign => "append_assign",
            Self::ExpandingAssign => "expanding_assign",
            Self::AppendExpandingAssign => "append_expanding_assign",
            Self::RecursiveExpand => "recursive_expand",
            Self::RecursiveExpandStripTrailingSlash => "recursive_expand_strip_trailing_slash",
            Self::NonRecursiveExpand => "non_recursive_expand",
            Self::ExpansionMod => "expansion_mod",
            Self::Value => "value",
            Self::Literal => "literal",
            Self::Message => "message",
            Self::Rule => "rule",
            Self::Always => "always",
            Self::TargetDecl => "target_decl",
            Self::RuleBody => "rule_body",
            Self::BuildCommand => "build_command",
            Self::CommandMod => "command_mod",
            Self::BuiltinCommand => "builtin_command",
            Self::Command => "command",
            Self::Include => "include",
            Self::Search => "search",
            Self::Undef => "undef",
            Self::Path => "path",
            Self::Error => "ERROR",
            Self::Token => "token",
            Self::Other(name) => name,
        }
    }

    /// Maps a grammar production name back to a kind. Unknown names are kept
    /// as [`NodeKind::Other`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "source_file" => Self::SourceFile,
            "body" => Self::Body,
            "if" => Self::If,
            "elif_clause" => Self::ElifClause,
            "else_clause" => Self::ElseClause,
            "diagnostic" => Self::Diagnostic,
            "comment" => Self::Comment,
            "identifier" => Self::Identifier,
            "string" => Self::String,
            "not" => Self::Not,
            "and" => Self::And,
            "or" => Self::Or,
            "eq" => Self::Eq,
            "is_defined" => Self::IsDefined,
            "assign" => Self::Assign,
            "append_assign" => Self::AppendAssign,
            "expanding_assign" => Self::ExpandingAssign,
            "append_expanding_assign" => Self::AppendExpandingAssign,
            "recursive_expand" => Self::RecursiveExpand,
            "recursive_expand_strip_trailing_slash" => Self::RecursiveExpandStripTrailingSlash,
            "non_recursive_expand" => Self::NonRecursiveExpand,
            "expansion_mod" => Self::ExpansionMod,
            "value" | "restOfLine" => Self::Value,
            "literal" => Self::Literal,
            "message" => Self::Message,
            "rule" => Self::Rule,
            "always" => Self::Always,
            "target_decl" => Self::TargetDecl,
            "rule_body" => Self::RuleBody,
            "build_command" => Self::BuildCommand,
            "command_mod" => Self::CommandMod,
            "builtin_command" => Self::BuiltinCommand,
            "command" => Self::Command,
            "include" => Self::Include,
            "search" => Self::Search,
            "undef" => Self::Undef,
            "path" => Self::Path,
            "ERROR" => Self::Error,
            "token" => Self::Token,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of a bmake syntax tree.
///
/// Nodes borrow their text from the source they were parsed from; `text`
/// always reproduces the exact span the node covers, so any node can be
/// degraded to literal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode<'a> {
    kind: NodeKind,
    named: bool,
    text: &'a str,
    line: usize,
    children: Vec<SyntaxNode<'a>>,
}

impl<'a> SyntaxNode<'a> {
    /// A semantically meaningful node.
    pub const fn named(kind: NodeKind, text: &'a str) -> Self {
        Self {
            kind,
            named: true,
            text,
            line: 1,
            children: Vec::new(),
        }
    }

    /// An anonymous keyword or punctuation token.
    pub const fn token(text: &'a str) -> Self {
        Self::anonymous(NodeKind::Token, text)
    }

    /// An unnamed node of any kind.
    pub const fn anonymous(kind: NodeKind, text: &'a str) -> Self {
        Self {
            kind,
            named: false,
            text,
            line: 1,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub const fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<SyntaxNode<'a>>) -> Self {
        self.children = children;
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: SyntaxNode<'a>) -> Self {
        self.children.push(child);
        self
    }

    pub const fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub const fn is_named(&self) -> bool {
        self.named
    }

    pub const fn text(&self) -> &'a str {
        self.text
    }

    /// 1-indexed line the node starts on.
    pub const fn line(&self) -> usize {
        self.line
    }

    pub fn children(&self) -> &[SyntaxNode<'a>] {
        &self.children
    }

    /// The named subsequence of [`SyntaxNode::children`], in order.
    pub fn named_children(&self) -> impl Iterator<Item = &SyntaxNode<'a>> {
        self.children.iter().filter(|child| child.named)
    }

    pub fn named_child(&self, index: usize) -> Option<&SyntaxNode<'a>> {
        self.named_children().nth(index)
    }

    pub fn named_child_count(&self) -> usize {
        self.named_children().count()
    }

    pub fn child(&self, index: usize) -> Option<&SyntaxNode<'a>> {
        self.children.get(index)
    }

    /// First named child of the given kind.
    pub fn find(&self, kind: &NodeKind) -> Option<&SyntaxNode<'a>> {
        self.named_children().find(|child| child.kind == *kind)
    }
}
