use std::fmt;

use serde::{Deserialize, Serialize};

use super::formula::Formula;
use super::knowledge::{Element, ElementKind};
use super::rule::{Rule, RuleKind};

/// A single argument: either an atomic wrapper around one knowledge base
/// element, or the application of a top rule to a tuple of sub-arguments.
///
/// Arguments live in the theory's arena; `sub_arguments` (transitive) and
/// `last_sub_arguments` (the tuple feeding the top rule) cross-reference
/// other arguments by label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Argument {
    pub label: String,
    pub conclusion: Formula,
    pub premises: Vec<Element>,
    pub top_rule: Option<Rule>,
    pub rules: Vec<Rule>,
    pub defeasible_rules: Vec<Rule>,
    pub strict_rules: Vec<Rule>,
    pub sub_arguments: Vec<String>,
    pub last_sub_arguments: Vec<String>,
}

impl Argument {
    pub fn atomic(label: String, element: Element) -> Self {
        Self {
            label,
            conclusion: element.formula.clone(),
            premises: vec![element],
            top_rule: None,
            rules: Vec::new(),
            defeasible_rules: Vec::new(),
            strict_rules: Vec::new(),
            sub_arguments: Vec::new(),
            last_sub_arguments: Vec::new(),
        }
    }

    pub fn ruled(label: String, top_rule: Rule, last_subs: &[&Argument]) -> Self {
        let mut premises = Vec::new();
        let mut rules = vec![top_rule.clone()];
        let mut sub_arguments = Vec::new();
        for sub in last_subs {
            premises.extend(sub.premises.iter().cloned());
            for rule in &sub.rules {
                if !rules.contains(rule) {
                    rules.push(rule.clone());
                }
            }
            sub_arguments.push(sub.label.clone());
            sub_arguments.extend(sub.sub_arguments.iter().cloned());
        }
        let defeasible_rules = rules
            .iter()
            .filter(|r| r.kind == RuleKind::Defeasible)
            .cloned()
            .collect();
        let strict_rules = rules
            .iter()
            .filter(|r| r.kind == RuleKind::Strict)
            .cloned()
            .collect();
        Self {
            label,
            conclusion: top_rule.consequent.clone(),
            premises,
            last_sub_arguments: last_subs.iter().map(|a| a.label.clone()).collect(),
            top_rule: Some(top_rule),
            rules,
            defeasible_rules,
            strict_rules,
            sub_arguments,
        }
    }

    pub fn is_strict(&self) -> bool {
        self.defeasible_rules.is_empty()
    }

    pub fn is_defeasible(&self) -> bool {
        !self.is_strict()
    }

    pub fn is_firm(&self) -> bool {
        self.premises.iter().any(|p| p.kind == ElementKind::Axiom)
    }

    pub fn is_plausible(&self) -> bool {
        !self.is_firm()
    }

    /// Labels of the defeasible rules this argument ends with: the top
    /// rule's label when it is defeasible, nothing otherwise.
    pub fn last_def_rules(&self) -> Vec<String> {
        match &self.top_rule {
            Some(rule) if rule.kind == RuleKind::Defeasible => vec![rule.label.clone()],
            _ => Vec::new(),
        }
    }

    pub fn defeasible_rule_labels(&self) -> Vec<String> {
        self.defeasible_rules.iter().map(|r| r.label.clone()).collect()
    }

    pub fn uses_rule(&self, label: &str) -> bool {
        self.rules.iter().any(|r| r.label == label)
    }

    /// Structural identity used for deduplication during construction:
    /// the same sub-arguments combined through the same rules.
    pub fn same_structure(&self, other: &Argument) -> bool {
        self.sub_arguments == other.sub_arguments && self.rules == other.rules
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.top_rule {
            Some(rule) => write!(
                f,
                "{}: {}{}{}",
                self.label,
                self.last_sub_arguments.join(","),
                rule.kind.arrow(),
                self.conclusion
            ),
            None => write!(f, "{}: {}", self.label, self.conclusion),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aspic::formula::Formula;
    use crate::aspic::knowledge::{Element, ElementKind};

    fn premise(text: &str) -> Element {
        Element {
            kind: ElementKind::Premise,
            formula: Formula::parse(text).unwrap(),
        }
    }

    fn axiom(text: &str) -> Element {
        Element {
            kind: ElementKind::Axiom,
            formula: Formula::parse(text).unwrap(),
        }
    }

    #[test]
    fn test_atomic_argument() {
        let a = Argument::atomic("A1".to_string(), premise("p"));
        assert!(a.top_rule.is_none());
        assert_eq!(a.premises.len(), 1);
        assert!(a.sub_arguments.is_empty());
        assert!(a.is_strict());
        assert!(a.is_plausible());
        assert_eq!(a.to_string(), "A1: p");
    }

    #[test]
    fn test_ruled_argument_aggregation() {
        let a1 = Argument::atomic("A1".to_string(), premise("p"));
        let d1 = Rule::from_string("[d1]", "p => q").unwrap();
        let a2 = Argument::ruled("A2".to_string(), d1, &[&a1]);
        let s1 = Rule::from_string("[s1]", "q -> t").unwrap();
        let a3 = Argument::ruled("A3".to_string(), s1, &[&a2]);

        assert_eq!(a3.conclusion.to_string(), "t");
        assert_eq!(a3.sub_arguments, vec!["A2", "A1"]);
        assert_eq!(a3.last_sub_arguments, vec!["A2"]);
        assert_eq!(a3.rules.len(), 2);
        assert_eq!(a3.defeasible_rules.len(), 1);
        assert_eq!(a3.strict_rules.len(), 1);
        assert!(a3.is_defeasible());
        assert_eq!(a3.last_def_rules(), Vec::<String>::new());
        assert_eq!(a2.last_def_rules(), vec!["[d1]"]);
        assert_eq!(a3.to_string(), "A3: A2->t");
    }

    #[test]
    fn test_firmness_from_axiom() {
        let a1 = Argument::atomic("A1".to_string(), axiom("p"));
        let d1 = Rule::from_string("[d1]", "p => q").unwrap();
        let a2 = Argument::ruled("A2".to_string(), d1, &[&a1]);
        assert!(a2.is_firm());
        assert!(!a2.is_plausible());
    }

    #[test]
    fn test_structural_identity() {
        let a1 = Argument::atomic("A1".to_string(), premise("p"));
        let d1 = Rule::from_string("[d1]", "p => q").unwrap();
        let a2 = Argument::ruled("A2".to_string(), d1.clone(), &[&a1]);
        let a2_again = Argument::ruled("A9".to_string(), d1, &[&a1]);
        assert!(a2.same_structure(&a2_again));

        let d2 = Rule::from_string("[d2]", "p => q2").unwrap();
        let other = Argument::ruled("A3".to_string(), d2, &[&a1]);
        assert!(!a2.same_structure(&other));
    }
}
