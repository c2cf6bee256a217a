use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use super::argument::Argument;
use super::error::AspicError;
use super::formula::is_variable;
use super::knowledge::{Element, KnowledgeBase};
use super::preference::{check_preference, Ordering};
use super::rule::{Rule, RuleKind};
use super::solver::{
    ArgumentDescriptor, Evaluation, ExtensionRequest, ExtensionSet, ExtensionSolver, Semantics,
};
use super::system::ArgumentationSystem;

type Edge = (String, String);
type Captures = BTreeMap<String, BTreeMap<String, String>>;

/// An ASPIC+ argumentation theory: an argumentation system applied to a
/// knowledge base under an ordering principle.
///
/// The theory is populated once, evaluated once: `evaluate` (or the
/// individual `construct_arguments` / `calculate_attack` /
/// `calculate_defeat` steps) runs the closure and the theory is treated
/// as immutable afterwards.
pub struct ArgumentationTheory {
    pub system: ArgumentationSystem,
    pub knowledge_base: KnowledgeBase,
    ordering: Ordering,
    arg_count: usize,
    arguments: Vec<Argument>,
    argument_preferences: Vec<Edge>,
    attack: Vec<Edge>,
    defeat: Vec<Edge>,
}

impl ArgumentationTheory {
    pub fn new(
        system: ArgumentationSystem,
        knowledge_base: KnowledgeBase,
        ordering: Ordering,
    ) -> Self {
        Self {
            system,
            knowledge_base,
            ordering,
            arg_count: 0,
            arguments: Vec::new(),
            argument_preferences: Vec::new(),
            attack: Vec::new(),
            defeat: Vec::new(),
        }
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn argument_preferences(&self) -> &[Edge] {
        &self.argument_preferences
    }

    pub fn attacks(&self) -> &[Edge] {
        &self.attack
    }

    pub fn defeats(&self) -> &[Edge] {
        &self.defeat
    }

    /// Checks the two well-formedness principles of Prakken 2010: no
    /// defeasible consequent may be a contrary of a strict consequent,
    /// and no assumption may be a contrary of a rule consequent, axiom or
    /// premise.
    pub fn check_well_formed(&self) -> bool {
        let contrariness = &self.system.contrariness;

        let mut rule_consequents = Vec::new();
        for r1 in &self.system.rules {
            rule_consequents.push(r1.consequent.to_string());
            for r2 in &self.system.rules {
                if r1.label == r2.label {
                    continue;
                }
                if r1.kind == RuleKind::Strict && r2.kind == RuleKind::Defeasible {
                    if let Some(contraries) = contrariness.get(&r1.consequent.to_string()) {
                        if contraries.contains(&r2.consequent.to_string()) {
                            return false;
                        }
                    }
                }
            }
        }

        for assumption in &self.knowledge_base.assumptions {
            let a = assumption.formula.to_string();
            let elements = rule_consequents
                .iter()
                .cloned()
                .chain(self.knowledge_base.axioms.iter().map(|e| e.to_string()))
                .chain(self.knowledge_base.premises.iter().map(|e| e.to_string()));
            for el in elements {
                if contrariness.get(&el).is_some_and(|c| c.contains(&a)) {
                    return false;
                }
            }
        }
        true
    }

    /// Builds the full argument set: atomic arguments seeded from the
    /// knowledge base, then every rule applied against the growing set
    /// until a pass adds nothing. Conclusions (other than undercutter
    /// literals) populate the language; contrariness is rebuilt over the
    /// final language.
    pub fn construct_arguments(&mut self) {
        self.arguments.clear();
        self.arg_count = 0;

        let elements: Vec<Element> = self.knowledge_base.elements().cloned().collect();
        for element in elements {
            self.arg_count += 1;
            let argument = Argument::atomic(format!("A{}", self.arg_count), element);
            if !argument.conclusion.term.starts_with("~[") {
                self.system.add_to_language(argument.conclusion.clone());
            }
            debug!("constructed {}", argument);
            self.arguments.push(argument);
        }

        let rules = self.system.rules.clone();
        loop {
            let before = self.arguments.len();
            let used_defeasible: BTreeSet<String> = self
                .arguments
                .iter()
                .flat_map(|a| a.defeasible_rules.iter().map(|r| r.label.clone()))
                .collect();
            for rule in &rules {
                self.apply_rule(rule, &used_defeasible);
            }
            if self.arguments.len() == before {
                break;
            }
        }
        info!(
            "argument construction reached a fixed point with {} arguments",
            self.arguments.len()
        );
        self.system.update_contrariness();
    }

    fn apply_rule(&mut self, rule: &Rule, used_defeasible: &BTreeSet<String>) {
        // an undercutter is only worth firing once its target rule is in use
        if rule.is_undercutter {
            let target = rule.consequent.term[1..].trim();
            if !used_defeasible.contains(target) {
                return;
            }
        }

        let mut comparisons = Vec::new();
        let mut matching = Vec::new();
        for ant in &rule.antecedents {
            if ant.term.contains('<') || ant.term.contains('>') || ant.term.contains('=') {
                comparisons.push(ant);
            } else {
                matching.push(ant);
            }
        }
        if matching.is_empty() {
            return;
        }

        // collect fulfilling arguments per antecedent; variable captures
        // are keyed by the fulfilling conclusion
        let mut captures: Captures = BTreeMap::new();
        let mut fulfilment: Vec<Vec<usize>> = Vec::new();
        for ant in &matching {
            let mut fillers = Vec::new();
            for (idx, argument) in self.arguments.iter().enumerate() {
                // no rule may appear twice on a branch
                if argument.uses_rule(&rule.label) {
                    continue;
                }
                let conclusion = &argument.conclusion;
                if conclusion.term != ant.term
                    || conclusion.parameters.len() != ant.parameters.len()
                {
                    continue;
                }
                let mut matched = 0;
                for (cp, ap) in conclusion.parameters.iter().zip(&ant.parameters) {
                    if cp == ap || is_variable(ap) {
                        matched += 1;
                        let capture = captures.entry(conclusion.to_string()).or_default();
                        if is_variable(ap) {
                            capture.insert(ap.clone(), cp.clone());
                        }
                    }
                }
                if matched == ant.parameters.len() {
                    fillers.push(idx);
                }
            }
            if fillers.is_empty() {
                return; // antecedent coverage failed
            }
            fulfilment.push(fillers);
        }

        for combo in cartesian(&fulfilment) {
            let Some(harmonised) = harmonise(&combo, &self.arguments, &captures) else {
                continue;
            };
            if comparisons
                .iter()
                .any(|c| !c.evaluate_comparison(&harmonised))
            {
                continue;
            }
            let specialised = specialise(rule, &combo, &self.arguments, &captures);

            self.arg_count += 1;
            let argument = {
                let last_subs: Vec<&Argument> =
                    combo.iter().map(|&i| &self.arguments[i]).collect();
                Argument::ruled(format!("A{}", self.arg_count), specialised, &last_subs)
            };
            if !argument.conclusion.term.starts_with("~[") {
                self.system.add_to_language(argument.conclusion.clone());
            }
            if self
                .arguments
                .iter()
                .any(|existing| existing.same_structure(&argument))
            {
                self.arg_count -= 1;
            } else {
                debug!("constructed {}", argument);
                self.arguments.push(argument);
            }
        }
    }

    /// Lifts element and rule preferences to argument preferences under
    /// the configured ordering. Pairs read `(less preferred, more
    /// preferred)`; cross-preferring premises can produce both directions
    /// and both are kept.
    pub fn calculate_argument_preferences(&mut self) -> Vec<Edge> {
        let mut preferences = Vec::new();
        for arg1 in &self.arguments {
            for arg2 in &self.arguments {
                if arg1.label == arg2.label {
                    continue;
                }
                match self.ordering {
                    Ordering::LastLink => {
                        if arg1.is_strict()
                            && arg1.is_firm()
                            && (arg2.is_defeasible() || arg2.is_plausible())
                        {
                            preferences.push((arg2.label.clone(), arg1.label.clone()));
                        } else if arg1.last_def_rules().is_empty()
                            && arg2.last_def_rules().is_empty()
                        {
                            if check_preference(
                                &premise_strings(arg1),
                                &premise_strings(arg2),
                                &self.knowledge_base.preferences,
                            ) {
                                preferences.push((arg1.label.clone(), arg2.label.clone()));
                            }
                        } else if check_preference(
                            &arg1.last_def_rules(),
                            &arg2.last_def_rules(),
                            &self.system.rule_preferences,
                        ) {
                            preferences.push((arg1.label.clone(), arg2.label.clone()));
                        }
                    }
                    Ordering::WeakestLink => {
                        if check_preference(
                            &premise_strings(arg1),
                            &premise_strings(arg2),
                            &self.knowledge_base.preferences,
                        ) {
                            if !arg2.defeasible_rules.is_empty() {
                                if check_preference(
                                    &arg1.defeasible_rule_labels(),
                                    &arg2.defeasible_rule_labels(),
                                    &self.system.rule_preferences,
                                ) {
                                    preferences.push((arg1.label.clone(), arg2.label.clone()));
                                }
                            } else {
                                preferences.push((arg1.label.clone(), arg2.label.clone()));
                            }
                        }
                    }
                }
            }
        }
        self.argument_preferences = preferences.clone();
        preferences
    }

    // Direct attacks: rebuts through contrariness and undercuts through
    // rule-naming conclusions.
    fn simple_attacks(&self) -> Vec<Edge> {
        let mut attacks = Vec::new();
        for arg1 in &self.arguments {
            let conclusion = arg1.conclusion.to_string();
            if conclusion.starts_with("~[") {
                // an undercutter attacks every argument topped by the
                // defeasible rule it names
                let undercut = &conclusion[1..];
                for arg2 in &self.arguments {
                    if let Some(top) = &arg2.top_rule {
                        if top.kind == RuleKind::Defeasible && top.label == undercut {
                            debug!("{} undercuts {}", arg1.label, arg2.label);
                            attacks.push((arg1.label.clone(), arg2.label.clone()));
                        }
                    }
                }
                continue;
            }
            // arguments topped by a strict rule cannot be rebutted
            if arg1
                .top_rule
                .as_ref()
                .is_some_and(|r| r.kind == RuleKind::Strict)
            {
                continue;
            }
            if let Some(contraries) = self.system.contrariness.get(&conclusion) {
                for arg2 in &self.arguments {
                    if contraries.contains(&arg2.conclusion.to_string()) {
                        debug!("{} rebuts {}", arg2.label, arg1.label);
                        attacks.push((arg2.label.clone(), arg1.label.clone()));
                    }
                }
            }
        }
        attacks
    }

    // Propagates edges onto every argument containing the target as a
    // sub-argument, until nothing new appears.
    fn close_attacks(&self, mut attacks: Vec<Edge>) -> Vec<Edge> {
        loop {
            let snapshot = attacks.clone();
            for (attacker, target) in &snapshot {
                for argument in &self.arguments {
                    if argument.sub_arguments.iter().any(|label| label == target) {
                        let edge = (attacker.clone(), argument.label.clone());
                        if !attacks.contains(&edge) {
                            attacks.push(edge);
                        }
                    }
                }
            }
            if attacks.len() == snapshot.len() {
                return attacks;
            }
        }
    }

    /// Derives the full attack relation: direct rebuts and undercuts,
    /// closed over sub-argument containment.
    pub fn calculate_attack(&mut self) -> Vec<Edge> {
        let simple = self.simple_attacks();
        self.attack = self.close_attacks(simple);
        self.attack.clone()
    }

    /// Filters the direct attacks through the argument preferences and
    /// closes the surviving edges over sub-argument containment. An
    /// attack `(A1, A2)` survives when the preferences hold `(A2, A1)`,
    /// i.e. the attacker is not strictly worse than its target.
    pub fn calculate_defeat(&mut self) -> Vec<Edge> {
        let attacks = self.simple_attacks();
        let preferences = self.calculate_argument_preferences();
        let mut defeat = Vec::new();
        for (attacker, target) in attacks {
            let reverse = preferences
                .iter()
                .any(|(less, more)| *less == target && *more == attacker);
            if reverse {
                defeat.push((attacker, target));
            }
        }
        self.defeat = self.close_attacks(defeat);
        self.defeat.clone()
    }

    /// Runs the full pipeline (well-formedness, construction,
    /// preferences, attack, defeat) and hands the defeat graph to the
    /// extension solver. When the requested semantics is missing from the
    /// reply the evaluation falls back to grounded.
    pub fn evaluate(
        &mut self,
        semantics: Semantics,
        solver: &dyn ExtensionSolver,
    ) -> Result<Evaluation, AspicError> {
        if !self.check_well_formed() {
            return Err(AspicError::NotWellFormed);
        }
        self.construct_arguments();
        self.calculate_argument_preferences();
        self.calculate_attack();
        self.calculate_defeat();

        let request = ExtensionRequest {
            arguments: self.arguments.iter().map(|a| a.label.clone()).collect(),
            attacks: self
                .defeat
                .iter()
                .map(|(attacker, target)| format!("({},{})", attacker, target))
                .collect(),
            semantics: semantics.as_str().to_string(),
        };
        let response = solver.solve(&request)?;

        let mut selected = semantics;
        if !response.results.contains_key(selected.as_str()) {
            selected = Semantics::Grounded;
        }
        let Some(result) = response.results.get(selected.as_str()) else {
            return Err(AspicError::ExtensionServiceUnavailable(format!(
                "no {} extensions in solver response",
                selected.as_str()
            )));
        };

        let extensions: BTreeMap<usize, Vec<String>> = match result {
            ExtensionSet::Single(labels) => BTreeMap::from([(0, labels.clone())]),
            ExtensionSet::Multiple(sets) => sets.iter().cloned().enumerate().collect(),
        };

        let mut acceptable_conclusions = BTreeMap::new();
        for (&id, extension) in &extensions {
            let conclusions: Vec<String> = self
                .arguments
                .iter()
                .filter(|a| extension.contains(&a.label))
                .map(|a| a.conclusion.to_string())
                .collect();
            acceptable_conclusions.insert(id, conclusions);
        }

        let arguments = self
            .arguments
            .iter()
            .map(|a| {
                (
                    a.label.clone(),
                    ArgumentDescriptor {
                        conclusion: a.conclusion.to_string(),
                        defeasible_rules: a
                            .defeasible_rules
                            .iter()
                            .map(|r| r.to_string())
                            .collect(),
                        premises: a.premises.iter().map(|p| p.to_string()).collect(),
                        top_rule: a.top_rule.as_ref().map(|r| r.to_string()),
                        sub_arguments: a.sub_arguments.clone(),
                        last_sub_arguments: a.last_sub_arguments.clone(),
                    },
                )
            })
            .collect();

        Ok(Evaluation {
            semantics: selected.as_str().to_string(),
            extensions,
            acceptable_conclusions,
            arguments,
        })
    }
}

fn premise_strings(argument: &Argument) -> Vec<String> {
    argument.premises.iter().map(|p| p.to_string()).collect()
}

// Every combination of one filler per antecedent, rightmost antecedent
// varying fastest.
fn cartesian(sets: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let mut combos = vec![Vec::new()];
    for set in sets {
        let mut next = Vec::new();
        for combo in &combos {
            for &idx in set {
                let mut extended = combo.clone();
                extended.push(idx);
                next.push(extended);
            }
        }
        combos = next;
    }
    combos
}

// Merges the variable captures of a tuple of fulfilling arguments. A
// variable already bound to a different value kills the tuple; arguments
// without captures contribute nothing. For a single-argument tuple this
// is its capture unmodified.
fn harmonise(
    combo: &[usize],
    arguments: &[Argument],
    captures: &Captures,
) -> Option<BTreeMap<String, String>> {
    let mut harmonised = BTreeMap::new();
    for &idx in combo {
        let conclusion = arguments[idx].conclusion.to_string();
        let Some(capture) = captures.get(&conclusion) else {
            continue;
        };
        for (var, value) in capture {
            if let Some(existing) = harmonised.get(var) {
                if existing != value {
                    return None;
                }
            } else {
                harmonised.insert(var.clone(), value.clone());
            }
        }
    }
    Some(harmonised)
}

// Specialises a rule for one tuple of fulfilling arguments: consequent
// variables take their captured values, expression parameters resolve to
// integers, and the bindings are recorded on the antecedents as well.
fn specialise(rule: &Rule, combo: &[usize], arguments: &[Argument], captures: &Captures) -> Rule {
    if !rule.consequent.has_variables() {
        return rule.clone();
    }
    let mut specialised = rule.clone();
    for &idx in combo {
        let conclusion = arguments[idx].conclusion.to_string();
        let Some(capture) = captures.get(&conclusion) else {
            continue;
        };
        let variables = specialised.consequent.variables.clone();
        for var in &variables {
            if let Some(value) = capture.get(var) {
                for ant in &mut specialised.antecedents {
                    ant.variable_mapping.insert(var.clone(), value.clone());
                }
                specialised
                    .consequent
                    .variable_mapping
                    .insert(var.clone(), value.clone());
            }
        }
        specialised.consequent.resolve_expressions();
        for i in 0..specialised.consequent.parameters.len() {
            if let Some(value) = capture.get(&specialised.consequent.parameters[i]) {
                specialised.consequent.parameters[i] = value.clone();
            }
        }
    }
    specialised
}
