use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use super::formula::{is_variable, Formula};
use super::rule::{Rule, RuleKind};

/// The argumentation system: the rule base with its preferences, the
/// contrariness relation, and the language of ground literals that the
/// constructed arguments populate.
#[derive(Debug, Clone, Default)]
pub struct ArgumentationSystem {
    pub language: Vec<Formula>,
    pub rules: Vec<Rule>,
    pub rule_preferences: Vec<(String, String)>,
    /// Canonical target string to the canonical strings of its contraries.
    pub contrariness: BTreeMap<String, BTreeSet<String>>,
    /// Registered `(contrary, of)` pairs, kept for re-instantiation over
    /// the populated language.
    contraries: Vec<(Formula, Formula)>,
    transposition: bool,
}

impl ArgumentationSystem {
    pub fn new(transposition: bool) -> Self {
        Self {
            transposition,
            ..Self::default()
        }
    }

    /// Inserts a rule (set semantics). When the system is closed under
    /// transposition, a strict rule also contributes its contrapositive
    /// variants `[L tp k]`.
    pub fn add_rule(&mut self, rule: Rule) {
        let transpose = rule.kind == RuleKind::Strict && self.transposition;
        if !self.rules.contains(&rule) {
            self.rules.push(rule.clone());
        }
        if transpose {
            self.add_transpositions(&rule);
        }
    }

    fn add_transpositions(&mut self, rule: &Rule) {
        let antecedents: Vec<String> = rule.antecedents.iter().map(|a| a.to_string()).collect();
        let inner = rule.label.trim_start_matches('[').trim_end_matches(']');
        let negated_consequent = format!("~{}", rule.consequent);

        // each variant drops one antecedent, which becomes the negated
        // consequent of the transposed rule
        let mut variants: Vec<(Vec<String>, String)> = Vec::new();
        if antecedents.len() == 1 {
            variants.push((
                vec![negated_consequent.clone()],
                format!("~{}", antecedents[0]),
            ));
        } else {
            for skip in 0..antecedents.len() {
                let mut kept: Vec<String> = antecedents
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != skip)
                    .map(|(_, a)| a.clone())
                    .collect();
                if kept.is_empty() {
                    continue;
                }
                kept.push(negated_consequent.clone());
                variants.push((kept, format!("~{}", antecedents[skip])));
            }
        }

        for (counter, (ants, consequent)) in variants.iter().enumerate() {
            let text = format!("{}->{}", ants.join(","), consequent);
            let label = format!("[{} tp {}]", inner, counter + 1);
            if let Ok(transposed) = Rule::from_string(&label, &text) {
                if !self.rules.contains(&transposed) {
                    self.rules.push(transposed);
                }
            }
        }
    }

    /// Registers `less ≺ more` between defeasible rules. Preferences
    /// naming an unknown or strict rule are dropped.
    pub fn add_rule_preference(&mut self, less: &str, more: &str) {
        let defeasible = |label: &str| {
            self.rules
                .iter()
                .any(|r| r.label == label && r.kind != RuleKind::Strict)
        };
        if !defeasible(less) || !defeasible(more) {
            warn!(
                "dropping rule preference ({}, {}): unknown or strict rule",
                less, more
            );
            return;
        }
        self.rule_preferences
            .push((less.to_string(), more.to_string()));
    }

    /// Registers `contrary` as a contrary of `of`. With `contradiction`
    /// the registration is mirrored, making the two formulas contradict.
    pub fn add_contrary(&mut self, contrary: Formula, of: Formula, contradiction: bool) {
        self.contrariness
            .entry(of.to_string())
            .or_default()
            .insert(contrary.to_string());
        let pair = (contrary.clone(), of.clone());
        if !self.contraries.contains(&pair) {
            self.contraries.push(pair);
        }
        if contradiction {
            self.add_contrary(of, contrary, false);
        }
    }

    pub fn add_to_language(&mut self, formula: Formula) {
        if !self.language.contains(&formula) {
            self.language.push(formula);
        }
    }

    /// Grounds a formula against every member of the language with the
    /// same term and arity. Each successful unification yields the ground
    /// formula together with its variable capture.
    pub fn instantiate_formula(&self, formula: &Formula) -> Vec<(Formula, BTreeMap<String, String>)> {
        if !formula.has_variables() {
            return vec![(formula.clone(), BTreeMap::new())];
        }
        let mut instantiated = Vec::new();
        for wff in &self.language {
            if formula.term != wff.term || formula.parameters.len() != wff.parameters.len() {
                continue;
            }
            let mut capture = BTreeMap::new();
            let mut grounded = Vec::new();
            for (fp, wp) in formula.parameters.iter().zip(&wff.parameters) {
                if fp == wp || is_variable(fp) {
                    grounded.push(wp.clone());
                    if is_variable(fp) {
                        capture.insert(fp.clone(), wp.clone());
                    }
                }
            }
            if grounded.len() != formula.parameters.len() {
                continue;
            }
            let text = format!("{}({})", formula.term, grounded.join(","));
            if let Ok(ground) = Formula::parse(&text) {
                instantiated.push((ground, capture));
            }
        }
        instantiated
    }

    /// Rebuilds contrariness over the populated language: every literal
    /// is contrary to its negation, and every registered contrary pair is
    /// instantiated over the language, keeping instantiation pairs whose
    /// variable captures are compatible.
    pub fn update_contrariness(&mut self) {
        let mut temp: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for wff in &self.language {
            let s = wff.to_string();
            let contrary = match s.strip_prefix('~') {
                Some(positive) => positive.to_string(),
                None => format!("~{}", s),
            };
            temp.insert(s, BTreeSet::from([contrary]));
        }

        let pairs = self.contraries.clone();
        for (contrary, of) in &pairs {
            let contrary_instantiations = self.instantiate_formula(contrary);
            let of_instantiations = self.instantiate_formula(of);
            for (of_inst, of_capture) in &of_instantiations {
                let target = of_inst.to_string();
                let mut contraries = BTreeSet::from([format!("~{}", target)]);
                for (contrary_inst, contrary_capture) in &contrary_instantiations {
                    if captures_compatible(contrary_capture, of_capture) {
                        contraries.insert(contrary_inst.to_string());
                    }
                }
                temp.insert(target, contraries);
            }
        }
        self.contrariness = temp;
    }
}

// Two captures are compatible when they agree: same variable, same value,
// and no value claimed by two different variables. An empty capture on
// either side is compatible with anything.
fn captures_compatible(m1: &BTreeMap<String, String>, m2: &BTreeMap<String, String>) -> bool {
    if m1 == m2 || m1.is_empty() || m2.is_empty() {
        return true;
    }
    m1.iter().any(|(k1, v1)| {
        m2.iter()
            .all(|(k2, v2)| !((v1 == v2 && k1 != k2) || (k1 == k2 && v1 != v2)))
    })
}
