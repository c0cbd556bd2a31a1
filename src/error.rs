pub type ZigifyResult<T> = std::result::Result<T, ZigifyError>;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ZigifyError {
    /// A named node has no rendering rule.
    UnknownNodeKind {
        kind: String,
        line: usize,
    },
    UnknownDiagnosticMarker {
        marker: String,
        line: usize,
    },
    /// A named node is missing a child its rule requires.
    MalformedNode {
        kind: String,
        line: usize,
        expected: String,
    },
    IncludeNotFound {
        path: String,
        reason: String,
    },
    IncludeCycle {
        chain: Vec<String>,
    },
    IncludeDepthExceeded {
        path: String,
        depth: usize,
    },
    Io {
        path: String,
        message: String,
    },
}

impl std::fmt::Display for ZigifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownNodeKind { kind, line } => {
                write!(f, "Unknown node kind '{}' at line {}", kind, line)
            }
            Self::UnknownDiagnosticMarker { marker, line } => {
                write!(f, "Unknown diagnostic marker '{}' at line {}", marker, line)
            }
            Self::MalformedNode {
                kind,
                line,
                expected,
            } => {
                write!(
                    f,
                    "Malformed '{}' node at line {}: expected {}",
                    kind, line, expected
                )
            }
            Self::IncludeNotFound { path, reason } => {
                write!(f, "Include not found: {} ({})", path, reason)
            }
            Self::IncludeCycle { chain } => {
                write!(f, "Include cycle: {}", chain.join(" -> "))
            }
            Self::IncludeDepthExceeded { path, depth } => {
                write!(f, "Include depth {} exceeded while including {}", depth, path)
            }
            Self::Io { path, message } => {
                write!(f, "Failed to read {}: {}", path, message)
            }
        }
    }
}

impl std::error::Error for ZigifyError {}

/// A recoverable problem met during a render pass.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Warning {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}
