use serde::Serialize;

pub const W_REPAIR_FALLBACK: &str = "W_REPAIR_FALLBACK";
pub const W_HREF_UNRESOLVED: &str = "W_HREF_UNRESOLVED";
pub const I_HREF_RECOVERED: &str = "I_HREF_RECOVERED";
pub const W_SANITIZED_EMPTY: &str = "W_SANITIZED_EMPTY";

/// A self-healed problem found while rendering post content.
///
/// Content problems never fail a render; they are reported here so callers
/// (the CLI, admin tooling) can surface them to authors.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub code: &'static str,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: DiagnosticSeverity, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Warning, code, message)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Warning,
    Info,
}
