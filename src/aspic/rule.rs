use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::AspicError;
use super::formula::Formula;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleKind {
    Strict,
    Defeasible,
}

impl RuleKind {
    pub fn arrow(self) -> &'static str {
        match self {
            RuleKind::Strict => "->",
            RuleKind::Defeasible => "=>",
        }
    }
}

/// An inference rule `label: ant1,...,antn ARROW consequent`.
///
/// A rule whose consequent term starts `~[` is an undercutter: it names
/// the defeasible rule it argues against. Equality ignores the label so
/// the rule set keeps set semantics over content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub label: String,
    pub antecedents: Vec<Formula>,
    pub consequent: Formula,
    pub kind: RuleKind,
    pub is_undercutter: bool,
}

impl Rule {
    pub fn new(
        label: impl Into<String>,
        antecedents: Vec<Formula>,
        consequent: Formula,
        kind: RuleKind,
    ) -> Self {
        let is_undercutter = consequent.term.starts_with("~[");
        Self {
            label: label.into(),
            antecedents,
            consequent,
            kind,
            is_undercutter,
        }
    }

    /// Parses `ant1, ant2 => cons` (defeasible) or `ant1 -> cons`
    /// (strict). The defeasible arrow is checked first so `=>` is never
    /// read as `->`. Antecedents split on top-level commas; commas inside
    /// parameter lists stay put.
    pub fn from_string(label: &str, text: &str) -> Result<Rule, AspicError> {
        let (kind, arrow) = if text.contains("=>") {
            (RuleKind::Defeasible, "=>")
        } else if text.contains("->") {
            (RuleKind::Strict, "->")
        } else {
            return Err(AspicError::MalformedRule {
                label: label.to_string(),
                text: text.to_string(),
            });
        };
        let Some((lhs, rhs)) = text.split_once(arrow) else {
            return Err(AspicError::MalformedRule {
                label: label.to_string(),
                text: text.to_string(),
            });
        };

        let mut antecedents = Vec::new();
        for part in split_top_level(lhs) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            antecedents.push(Formula::parse(part)?);
        }
        let consequent = Formula::parse(rhs.trim())?;
        Ok(Rule::new(label, antecedents, consequent, kind))
    }
}

// Splits on commas that sit outside parameter lists.
fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, ch) in input.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ants: Vec<String> = self.antecedents.iter().map(|a| a.to_string()).collect();
        write!(
            f,
            "{} {}{}{}",
            self.label,
            ants.join(","),
            self.kind.arrow(),
            self.consequent
        )
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.antecedents == other.antecedents
            && self.consequent == other.consequent
            && self.kind == other.kind
    }
}

impl Eq for Rule {}
