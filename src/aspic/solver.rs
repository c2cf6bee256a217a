use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::AspicError;

/// Dung-framework semantics understood by the extension solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Semantics {
    Grounded,
    Preferred,
    Stable,
    Complete,
}

impl Semantics {
    pub fn as_str(self) -> &'static str {
        match self {
            Semantics::Grounded => "grounded",
            Semantics::Preferred => "preferred",
            Semantics::Stable => "stable",
            Semantics::Complete => "complete",
        }
    }
}

/// Payload handed to the external extension solver: argument labels, the
/// defeat edges rendered `(attacker,target)`, and the requested semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionRequest {
    pub arguments: Vec<String>,
    pub attacks: Vec<String>,
    pub semantics: String,
}

/// One semantics entry of a solver reply: a single extension or a list of
/// extensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtensionSet {
    Single(Vec<String>),
    Multiple(Vec<Vec<String>>),
}

/// Reply of the extension solver, keyed by semantics name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtensionResponse {
    #[serde(flatten)]
    pub results: BTreeMap<String, ExtensionSet>,
}

/// Blocking request-response boundary toward the external Dung-framework
/// evaluator. The engine owns no transport; callers plug one in.
pub trait ExtensionSolver {
    fn solve(&self, request: &ExtensionRequest) -> Result<ExtensionResponse, AspicError>;
}

/// Per-argument descriptor in the evaluation output.
#[derive(Debug, Clone, Serialize)]
pub struct ArgumentDescriptor {
    pub conclusion: String,
    pub defeasible_rules: Vec<String>,
    pub premises: Vec<String>,
    pub top_rule: Option<String>,
    pub sub_arguments: Vec<String>,
    pub last_sub_arguments: Vec<String>,
}

/// Final output of an evaluation: the extensions under the selected
/// semantics, the conclusions each extension accepts, and the argument
/// descriptors.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub semantics: String,
    pub extensions: BTreeMap<usize, Vec<String>>,
    #[serde(rename = "acceptableConclusions")]
    pub acceptable_conclusions: BTreeMap<usize, Vec<String>>,
    pub arguments: BTreeMap<String, ArgumentDescriptor>,
}
