//! Rendering of `%error`, `%warn` and `%message` directives.
//!
//! The marker set is closed. Adding a marker means adding a variant and a
//! template here, not matching new strings elsewhere.

use crate::error::{ZigifyError, ZigifyResult};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticMarker {
    Error,
    Warning,
    Message,
}

impl DiagnosticMarker {
    /// Recognises a directive marker, with or without its leading `%`.
    pub fn from_directive(marker: &str) -> Option<Self> {
        match marker.trim().trim_start_matches('%') {
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warning),
            "message" => Some(Self::Message),
            _ => None,
        }
    }

    pub const fn template(self) -> &'static DiagnosticTemplate {
        match self {
            Self::Error => &ERROR_TEMPLATE,
            Self::Warning => &WARNING_TEMPLATE,
            Self::Message => &MESSAGE_TEMPLATE,
        }
    }
}

/// A Zig diagnostic call with a single slot for the message expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiagnosticTemplate {
    head: &'static str,
    tail: &'static str,
}

impl DiagnosticTemplate {
    /// Fills the slot. `message` must already be a Zig expression.
    pub fn format(&self, message: &str) -> String {
        let mut out = String::with_capacity(self.head.len() + message.len() + self.tail.len());
        out.push_str(self.head);
        out.push_str(message);
        out.push_str(self.tail);
        out
    }
}

const ERROR_TEMPLATE: DiagnosticTemplate = DiagnosticTemplate {
    head: "std.debug.panic(\"Error occurred: {s}\", .{",
    tail: "});",
};

const WARNING_TEMPLATE: DiagnosticTemplate = DiagnosticTemplate {
    head: "std.log.warn(\"{s}\", .{",
    tail: "});",
};

const MESSAGE_TEMPLATE: DiagnosticTemplate = DiagnosticTemplate {
    head: "std.debug.print(\"{s}\\n\", .{",
    tail: "});",
};

/// Formats a diagnostic call for `marker` carrying `message`.
///
/// # Errors
/// - `ZigifyError::UnknownDiagnosticMarker` if `marker` is not one of the
///   error, warning or message markers.
pub fn format_diagnostic(marker: &str, message: &str, line: usize) -> ZigifyResult<String> {
    let marker = DiagnosticMarker::from_directive(marker).ok_or_else(|| {
        ZigifyError::UnknownDiagnosticMarker {
            marker: marker.to_string(),
            line,
        }
    })?;
    Ok(marker.template().format(message))
}
