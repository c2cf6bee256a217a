use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::formula::Formula;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    Axiom,
    Premise,
    Assumption,
}

/// A knowledge base element: a formula tagged with how strongly the
/// theory commits to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub kind: ElementKind,
    pub formula: Formula,
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.formula)
    }
}

#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    pub axioms: Vec<Element>,
    pub premises: Vec<Element>,
    pub assumptions: Vec<Element>,
    pub preferences: Vec<(String, String)>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_axiom(&mut self, formula: Formula) {
        self.axioms.push(Element {
            kind: ElementKind::Axiom,
            formula,
        });
    }

    pub fn add_premise(&mut self, formula: Formula) {
        self.premises.push(Element {
            kind: ElementKind::Premise,
            formula,
        });
    }

    pub fn add_assumption(&mut self, formula: Formula) {
        self.assumptions.push(Element {
            kind: ElementKind::Assumption,
            formula,
        });
    }

    /// Registers `less ≺ more` between elements. Pairs involving an
    /// axiom, or placing a premise below an assumption, are dropped.
    pub fn add_preference(&mut self, less: &Formula, more: &Formula) {
        let lp = less.to_string();
        let mp = more.to_string();
        let among = |set: &[Element], s: &str| set.iter().any(|e| e.formula.to_string() == s);

        if among(&self.axioms, &lp) || among(&self.axioms, &mp) {
            warn!("dropping element preference ({}, {}): axioms are not orderable", lp, mp);
            return;
        }
        if among(&self.premises, &lp) && among(&self.assumptions, &mp) {
            warn!(
                "dropping element preference ({}, {}): a premise cannot sit below an assumption",
                lp, mp
            );
            return;
        }
        self.preferences.push((lp, mp));
    }

    /// All elements in atomic-seeding order: premises, axioms,
    /// assumptions.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.premises
            .iter()
            .chain(self.axioms.iter())
            .chain(self.assumptions.iter())
    }
}
