#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use anyhow::Result;

    use crate::aspic::argument::Argument;
    use crate::aspic::error::AspicError;
    use crate::aspic::formula::Formula;
    use crate::aspic::knowledge::{ElementKind, KnowledgeBase};
    use crate::aspic::preference::Ordering;
    use crate::aspic::rule::Rule;
    use crate::aspic::solver::{
        ExtensionRequest, ExtensionResponse, ExtensionSolver, Semantics,
    };
    use crate::aspic::system::ArgumentationSystem;
    use crate::aspic::theory::ArgumentationTheory;

    struct StubSolver(ExtensionResponse);

    impl ExtensionSolver for StubSolver {
        fn solve(&self, _request: &ExtensionRequest) -> Result<ExtensionResponse, AspicError> {
            Ok(self.0.clone())
        }
    }

    struct DownSolver;

    impl ExtensionSolver for DownSolver {
        fn solve(&self, _request: &ExtensionRequest) -> Result<ExtensionResponse, AspicError> {
            Err(AspicError::ExtensionServiceUnavailable(
                "connection refused".to_string(),
            ))
        }
    }

    fn f(text: &str) -> Formula {
        Formula::parse(text).unwrap()
    }

    fn r(label: &str, text: &str) -> Rule {
        Rule::from_string(label, text).unwrap()
    }

    fn label_of(theory: &ArgumentationTheory, conclusion: &str) -> String {
        theory
            .arguments()
            .iter()
            .find(|a| a.conclusion.to_string() == conclusion)
            .map(|a| a.label.clone())
            .unwrap_or_else(|| panic!("no argument concludes {}", conclusion))
    }

    // The fitness-goal theory: a 17 year old asking for a step goal, with
    // a previously rejected 13000-step suggestion.
    fn fitness_theory() -> ArgumentationTheory {
        let mut system = ArgumentationSystem::new(false);
        system.add_rule(r("[r1]", "current_goal(steps) => recommended(10000)"));
        system.add_rule(r("[r2]", "recommended(X) => set_goal(X)"));
        system.add_rule(r(
            "[r3]",
            "current_goal(steps), user_age(X), X>65 => suggested(7500)",
        ));
        system.add_rule(r(
            "[r4]",
            "current_goal(steps), user_age(X), X<18 => suggested(13000)",
        ));
        system.add_rule(r("[r5]", "suggested(X), => set_goal(X)"));
        system.add_rule(r("[r6]", "rejected_too_high(X) -> ~set_goal(X)"));
        system.add_rule(r("[r7]", "rejected_too_low(X) -> ~set_goal(X)"));
        system.add_rule(r("[r8]", "rejected_too_high(X) => suggested([X*0.8])"));
        system.add_rule(r("[r9]", "rejected_too_low(X) => suggested([X*1.2])"));
        system.add_contrary(f("set_goal(X)"), f("set_goal(Y)"), true);
        system.add_rule_preference("[r2]", "[r5]");
        system.add_rule_preference("[r2]", "[r8]");
        system.add_rule_preference("[r2]", "[r9]");

        let mut kb = KnowledgeBase::new();
        kb.add_premise(f("current_goal(steps)"));
        kb.add_premise(f("user_age(17)"));
        kb.add_premise(f("rejected_too_high(13000)"));

        ArgumentationTheory::new(system, kb, Ordering::WeakestLink)
    }

    #[test]
    fn test_fitness_construction() {
        let mut theory = fitness_theory();
        assert!(theory.check_well_formed());
        theory.construct_arguments();

        let conclusions: Vec<String> = theory
            .arguments()
            .iter()
            .map(|a| a.conclusion.to_string())
            .collect();
        assert_eq!(
            conclusions,
            vec![
                "current_goal(steps)",
                "user_age(17)",
                "rejected_too_high(13000)",
                "recommended(10000)",
                "set_goal(10000)",
                "suggested(13000)",
                "set_goal(13000)",
                "~set_goal(13000)",
                "suggested(10400)",
                "set_goal(10400)",
            ]
        );
        let labels: Vec<&str> = theory
            .arguments()
            .iter()
            .map(|a| a.label.as_str())
            .collect();
        assert_eq!(
            labels,
            vec!["A1", "A2", "A3", "A4", "A5", "A6", "A7", "A8", "A9", "A10"]
        );

        // the over-age suggestion (r3) and the rejected-too-low chain
        // (r7, r9) never fire
        assert!(!conclusions.contains(&"suggested(7500)".to_string()));

        // instantiated contraries cover the competing goals
        let contraries = &theory.system.contrariness["set_goal(13000)"];
        assert!(contraries.contains("set_goal(10000)"));
        assert!(contraries.contains("set_goal(10400)"));
        assert!(contraries.contains("~set_goal(13000)"));
        assert!(!contraries.contains("set_goal(13000)"));
    }

    #[test]
    fn test_fitness_preferences_and_defeat() {
        let mut theory = fitness_theory();
        theory.construct_arguments();
        theory.calculate_attack();
        theory.calculate_defeat();

        let a5 = label_of(&theory, "set_goal(10000)");
        let a7 = label_of(&theory, "set_goal(13000)");
        let a8 = label_of(&theory, "~set_goal(13000)");
        let a10 = label_of(&theory, "set_goal(10400)");

        let preferences = theory.argument_preferences();
        // the r2 conclusion sits below both r5 conclusions
        assert!(preferences.contains(&(a5.clone(), a7.clone())));
        assert!(preferences.contains(&(a5.clone(), a10.clone())));
        assert!(!preferences.contains(&(a7.clone(), a5.clone())));

        assert_eq!(
            theory.defeats(),
            &[
                (a7.clone(), a5.clone()),
                (a10.clone(), a5.clone()),
                (a8.clone(), a7.clone()),
            ]
        );

        // the strict rejection attacks but is never attacked back
        assert!(!theory.attacks().iter().any(|(_, target)| *target == a8));

        // recomputing defeat (and the preferences inside it) changes nothing
        let again = theory.calculate_defeat();
        assert_eq!(again.as_slice(), theory.defeats());
    }

    #[test]
    fn test_fitness_grounded_evaluation() -> Result<()> {
        let mut theory = fitness_theory();
        let response: ExtensionResponse = serde_json::from_value(serde_json::json!({
            "grounded": ["A1", "A2", "A3", "A4", "A6", "A8", "A9", "A10"]
        }))?;

        let evaluation = theory.evaluate(Semantics::Grounded, &StubSolver(response))?;
        assert_eq!(evaluation.semantics, "grounded");
        assert_eq!(evaluation.extensions.len(), 1);

        let accepted = &evaluation.acceptable_conclusions[&0];
        assert!(accepted.contains(&"~set_goal(13000)".to_string()));
        assert!(accepted.contains(&"set_goal(10400)".to_string()));
        assert!(!accepted.contains(&"set_goal(13000)".to_string()));
        assert!(!accepted.contains(&"set_goal(10000)".to_string()));

        let descriptor = &evaluation.arguments["A10"];
        assert_eq!(descriptor.conclusion, "set_goal(10400)");
        assert_eq!(descriptor.last_sub_arguments, vec!["A9"]);
        assert_eq!(descriptor.defeasible_rules.len(), 2);

        let json = serde_json::to_value(&evaluation)?;
        assert!(json.get("acceptableConclusions").is_some());
        Ok(())
    }

    #[test]
    fn test_evaluate_falls_back_to_grounded() -> Result<()> {
        let mut theory = fitness_theory();
        let response: ExtensionResponse = serde_json::from_value(serde_json::json!({
            "grounded": ["A1", "A2", "A3", "A4", "A6", "A8", "A9", "A10"]
        }))?;

        let evaluation = theory.evaluate(Semantics::Preferred, &StubSolver(response))?;
        assert_eq!(evaluation.semantics, "grounded");
        Ok(())
    }

    #[test]
    fn test_evaluate_without_usable_response() {
        let mut theory = fitness_theory();
        let err = theory
            .evaluate(Semantics::Grounded, &StubSolver(ExtensionResponse::default()))
            .unwrap_err();
        assert!(matches!(err, AspicError::ExtensionServiceUnavailable(_)));

        let mut theory = fitness_theory();
        let err = theory.evaluate(Semantics::Grounded, &DownSolver).unwrap_err();
        assert!(matches!(err, AspicError::ExtensionServiceUnavailable(_)));
    }

    #[test]
    fn test_evaluate_rejects_ill_formed_theory() {
        let mut system = ArgumentationSystem::new(false);
        system.add_rule(r("[s1]", "a -> b"));
        system.add_rule(r("[d1]", "c => d"));
        system.add_contrary(f("b"), f("d"), true);
        let mut kb = KnowledgeBase::new();
        kb.add_premise(f("a"));

        let mut theory = ArgumentationTheory::new(system, kb, Ordering::WeakestLink);
        let err = theory.evaluate(Semantics::Grounded, &DownSolver).unwrap_err();
        assert!(matches!(err, AspicError::NotWellFormed));
        assert!(theory.arguments().is_empty());
    }

    #[test]
    fn test_construction_is_deterministic() {
        let mut first = fitness_theory();
        first.construct_arguments();
        let mut second = fitness_theory();
        second.construct_arguments();

        let snapshot = |theory: &ArgumentationTheory| -> Vec<(String, String)> {
            theory
                .arguments()
                .iter()
                .map(|a| (a.label.clone(), a.conclusion.to_string()))
                .collect()
        };
        assert_eq!(snapshot(&first), snapshot(&second));
    }

    #[test]
    fn test_argument_invariants_hold() {
        let mut theory = fitness_theory();
        theory.construct_arguments();

        let by_label: BTreeMap<&str, &Argument> = theory
            .arguments()
            .iter()
            .map(|a| (a.label.as_str(), a))
            .collect();

        for argument in theory.arguments() {
            if let Some(top) = &argument.top_rule {
                assert_eq!(argument.conclusion, top.consequent);
            } else {
                assert_eq!(argument.premises.len(), 1);
                assert!(argument.sub_arguments.is_empty());
            }
            assert_eq!(
                argument.rules.len(),
                argument.defeasible_rules.len() + argument.strict_rules.len()
            );
            assert_eq!(argument.is_strict(), argument.defeasible_rules.is_empty());
            assert_eq!(
                argument.is_firm(),
                argument
                    .premises
                    .iter()
                    .any(|p| p.kind == ElementKind::Axiom)
            );
            assert_branch_labels_unique(argument, &by_label, &mut Vec::new());
        }
    }

    fn assert_branch_labels_unique(
        argument: &Argument,
        by_label: &BTreeMap<&str, &Argument>,
        path: &mut Vec<String>,
    ) {
        if let Some(top) = &argument.top_rule {
            assert!(
                !path.contains(&top.label),
                "rule {} appears twice on a branch",
                top.label
            );
            path.push(top.label.clone());
        }
        for label in &argument.last_sub_arguments {
            assert_branch_labels_unique(by_label[label.as_str()], by_label, path);
        }
        if argument.top_rule.is_some() {
            path.pop();
        }
    }

    fn divergence_theory(ordering: Ordering) -> ArgumentationTheory {
        let mut system = ArgumentationSystem::new(false);
        system.add_rule(r("[ra]", "p1 => c1"));
        system.add_rule(r("[rb]", "p2 => c2"));

        let mut kb = KnowledgeBase::new();
        kb.add_premise(f("p1"));
        kb.add_premise(f("p2"));
        kb.add_preference(&f("p1"), &f("p2"));

        ArgumentationTheory::new(system, kb, ordering)
    }

    #[test]
    fn test_weakest_and_last_link_diverge_on_premise_preferences() {
        let mut weakest = divergence_theory(Ordering::WeakestLink);
        weakest.construct_arguments();
        let preferences = weakest.calculate_argument_preferences();

        let c1 = label_of(&weakest, "c1");
        let c2 = label_of(&weakest, "c2");
        // weakest link orders the conclusions by their premises
        assert!(preferences.contains(&(c1.clone(), c2.clone())));
        assert!(!preferences.contains(&(c2.clone(), c1.clone())));

        let mut last = divergence_theory(Ordering::LastLink);
        last.construct_arguments();
        let preferences = last.calculate_argument_preferences();
        // last link ignores the premises: with no rule preferences the
        // top rules compare as peers in both directions
        assert!(preferences.contains(&(c1.clone(), c2.clone())));
        assert!(preferences.contains(&(c2, c1)));
    }

    #[test]
    fn test_transposition_produces_contrapositive_attack() {
        // with transposition on, ~c flows back against the antecedent
        let mut system = ArgumentationSystem::new(true);
        system.add_rule(r("[s]", "a -> c"));
        system.add_rule(r("[d]", "w => ~c"));

        let mut kb = KnowledgeBase::new();
        kb.add_premise(f("a"));
        kb.add_premise(f("w"));

        let mut theory = ArgumentationTheory::new(system, kb, Ordering::WeakestLink);
        theory.construct_arguments();

        // [s tp 1]: ~c -> ~a fires on top of the defeasible ~c argument
        assert!(theory
            .arguments()
            .iter()
            .any(|arg| arg.conclusion.to_string() == "~a"));

        let attacks = theory.calculate_attack();
        let not_a = label_of(&theory, "~a");
        let a = label_of(&theory, "a");
        assert!(attacks.contains(&(not_a, a)));
    }
}
