//! Run the fixture scripts end to end through Z3.

use kinduct_ir::compile_source;
use kinduct_symbolic::{
    replay, verify, verify_script, Event, Report, SymbolicConfig, SymbolicMode, Verdict,
};
use kinduct_term::Value;
use std::path::PathBuf;
use std::sync::mpsc;

fn load(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {}: {}", name, e))
}

fn run(name: &str, config: &SymbolicConfig) -> Vec<Report> {
    verify_script(&load(name), config).unwrap_or_else(|e| panic!("{}: {}", name, e))
}

fn verdict<'r>(report: &'r Report, goal: &str) -> &'r Verdict {
    report
        .verdict(goal)
        .unwrap_or_else(|| panic!("no verdict for {} in\n{}", goal, report))
}

#[test]
fn test_counter_holds_at_depth_zero() {
    let reports = run("counter.kin", &SymbolicConfig::default());
    assert_eq!(reports.len(), 2);
    for report in &reports {
        assert_eq!(verdict(report, "nonneg"), &Verdict::AllHold { depth: 0 });
    }
    // Assumed relations are hypotheses, not goals.
    assert!(reports[1].verdict("inc_on_input").is_none());
}

#[test]
fn test_toggle_falsified_at_depth_ten() {
    let reports = run("toggle.kin", &SymbolicConfig::default());
    match verdict(&reports[0], "bounded") {
        Verdict::Violated { depth, trace } => {
            assert_eq!(*depth, 10);
            assert_eq!(trace.len(), 11);
            assert_eq!(trace.last().and_then(|s| s.get("out")), Some(&Value::int(11)));
        }
        other => panic!("expected a violation, got {}", other),
    }
    // nonneg keeps being proved once bounded is dropped.
    assert!(verdict(&reports[1], "bounded").is_violated());
    assert!(verdict(&reports[1], "nonneg").holds());
}

#[test]
fn test_toggle_unknown_below_minimal_depth() {
    let config = SymbolicConfig::default().with_max_depth(6);
    let reports = run("toggle.kin", &config);
    let bounded = verdict(&reports[0], "bounded");
    assert!(bounded.is_unknown(), "{}", bounded);
    assert_eq!(bounded.depth(), 6);
}

#[test]
fn test_assumed_lemma_strengthens() {
    let reports = run("strengthen.kin", &SymbolicConfig::default());
    assert_eq!(verdict(&reports[0], "y_nonneg"), &Verdict::AllHold { depth: 1 });
    assert_eq!(verdict(&reports[1], "y_nonneg"), &Verdict::AllHold { depth: 0 });
    assert_eq!(verdict(&reports[2], "y_nonneg"), &Verdict::AllHold { depth: 0 });
    assert_eq!(verdict(&reports[2], "x_nonneg"), &Verdict::AllHold { depth: 0 });
}

#[test]
fn test_invariant_generation_strengthens() {
    let plain = run("drift.kin", &SymbolicConfig::default());
    let stays_ok = verdict(&plain[0], "stays_ok");
    assert!(stays_ok.is_unknown(), "{}", stays_ok);
    assert_eq!(stays_ok.depth(), 10);

    let (tx, rx) = mpsc::channel();
    let config = SymbolicConfig::default().with_invgen(true).with_events(tx);
    let strengthened = run("drift.kin", &config);
    assert_eq!(verdict(&strengthened[0], "stays_ok"), &Verdict::AllHold { depth: 0 });
    drop(config);
    let invariants = rx
        .iter()
        .find_map(|e| match e {
            Event::Strengthened { invariants, .. } => Some(invariants),
            _ => None,
        })
        .unwrap_or_default();
    assert!(
        invariants.contains(&"(>= (_ curr n) 0)".to_string()),
        "{:?}",
        invariants
    );
}

#[test]
fn test_literals_beyond_machine_integers() {
    let source = "
        (define-sys big ((x Int))
          (= (_ curr x) 100000000000000000000)
          (= (_ next x) (+ (_ curr x) 1))
          ())
        (define-prop above big (> (_ curr x) 99999999999999999999))
        (define-prop below big (< (_ curr x) 100000000000000000001))
        (verify big (above below))";
    let reports = verify_script(source, &SymbolicConfig::default()).unwrap();
    // `below` fails at depth 1, so `above` is proved alone there.
    assert_eq!(verdict(&reports[0], "above"), &Verdict::AllHold { depth: 1 });
    match verdict(&reports[0], "below") {
        Verdict::Violated { depth: 1, trace } => {
            let big: num::BigInt = "100000000000000000001".parse().unwrap();
            assert_eq!(trace.states[1].get("x"), Some(&Value::Int(big)));
        }
        other => panic!("expected a violation at depth 1, got {}", other),
    }
}

#[test]
fn test_irrational_counterexample() {
    let source = "
        (define-sys root ((r Real))
          (= (* (_ curr r) (_ curr r)) 2.0)
          (= (_ next r) (_ curr r))
          ())
        (define-prop negative root (< (_ curr r) 0.0))
        (verify root (negative))";
    let reports = verify_script(source, &SymbolicConfig::default()).unwrap();
    match verdict(&reports[0], "negative") {
        Verdict::Violated { depth: 0, trace } => {
            assert!(trace.approximate);
            let r = trace.states[0].get("r").and_then(Value::as_rational).unwrap();
            let low = num::BigRational::new(14142.into(), 10000.into());
            let high = num::BigRational::new(14143.into(), 10000.into());
            assert!(low < r && r < high, "r = {}", r);
            assert!(reports[0].to_string().contains("approximated"));
        }
        other => panic!("expected a violation at depth 0, got {}", other),
    }
}

#[test]
fn test_composition_over_reals() {
    let config = SymbolicConfig::default().with_prune(true);
    let reports = run("composition.kin", &config);
    assert!(reports[0].all_hold(), "{}", reports[0]);
    // rate = 0.5 implies rate >= 0.
    assert_eq!(reports[0].redundant, vec!["rate_nonneg"]);
}

#[test]
fn test_relations_and_rigid_constants() {
    let reports = run("relations.kin", &SymbolicConfig::default());

    assert_eq!(verdict(&reports[0], "nonneg"), &Verdict::AllHold { depth: 0 });
    assert_eq!(verdict(&reports[0], "increasing"), &Verdict::AllHold { depth: 0 });

    match verdict(&reports[1], "jumps_by_two") {
        Verdict::Violated { depth, trace } => {
            assert_eq!(*depth, 1);
            assert_eq!(trace.states[0].get("x"), Some(&Value::int(0)));
            assert_eq!(trace.states[1].get("x"), Some(&Value::int(1)));
        }
        other => panic!("expected a violation, got {}", other),
    }
    assert!(verdict(&reports[1], "nonneg").holds());

    assert_eq!(verdict(&reports[2], "keeps_start"), &Verdict::AllHold { depth: 0 });
    match verdict(&reports[2], "positive") {
        Verdict::Violated { depth, trace } => {
            assert_eq!(*depth, 0);
            let start = &trace.constants["start"];
            assert_eq!(trace.states[0].get("v"), Some(start));
            assert!(start.as_rational().map_or(false, |s| s <= num::zero()));
        }
        other => panic!("expected a violation, got {}", other),
    }
}

#[test]
fn test_counterexamples_replay() {
    let program = compile_source(&load("relations.kin")).unwrap();
    for task in program.tasks().unwrap() {
        let report = verify(&task, &SymbolicConfig::default()).unwrap();
        for goal in &task.goals {
            if let Some(trace) = report.verdict(&goal.name).and_then(Verdict::trace) {
                replay(&task, goal, trace).unwrap();
            }
        }
    }
}

#[test]
fn test_bmc_mode_never_proves() {
    let config = SymbolicConfig::default()
        .with_mode(SymbolicMode::Bmc)
        .with_max_depth(3);
    let reports = run("relations.kin", &config);
    assert!(verdict(&reports[0], "nonneg").is_unknown());
    assert!(verdict(&reports[1], "jumps_by_two").is_violated());
    assert!(verdict(&reports[2], "positive").is_violated());
}

#[test]
fn test_events_report_progress() {
    let program = compile_source(&load("counter.kin")).unwrap();
    let task = program.task(&program.verifies[0]).unwrap();
    let (tx, rx) = mpsc::channel();
    let config = SymbolicConfig::default().with_events(tx);
    verify(&task, &config).unwrap();
    drop(config);

    let events: Vec<Event> = rx.iter().collect();
    assert_eq!(
        events,
        vec![
            Event::Started {
                system: "counter".into(),
                goals: vec!["nonneg".into()],
            },
            Event::BaseClean {
                system: "counter".into(),
                depth: 0,
                goals: vec!["nonneg".into()],
            },
            Event::Proved {
                system: "counter".into(),
                depth: 0,
                goals: vec!["nonneg".into()],
            },
        ]
    );
}

#[test]
fn test_timeout_is_accepted() {
    let config = SymbolicConfig::default().with_timeout_ms(10_000);
    let reports = run("counter.kin", &config);
    assert!(reports.iter().all(Report::all_hold));
}
