/// Engine-level failures surfaced to callers.
///
/// Registration problems (a rule preference naming an unknown or strict
/// rule, a knowledge base preference involving an axiom) are not errors:
/// the registration is dropped and logged.
#[derive(Debug, thiserror::Error)]
pub enum AspicError {
    #[error("malformed formula: {0:?}")]
    MalformedFormula(String),
    #[error("malformed rule {label}: {text:?}")]
    MalformedRule { label: String, text: String },
    #[error("argumentation theory is not well-formed")]
    NotWellFormed,
    #[error("extension service unavailable: {0}")]
    ExtensionServiceUnavailable(String),
}
