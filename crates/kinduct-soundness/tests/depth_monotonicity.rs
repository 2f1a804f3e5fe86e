//! Raising the depth limit never turns a verdict around.
//!
//! A goal violated within depth K stays violated, at the same depth, for
//! every larger limit. A goal proved at depth k is proved at k for every
//! limit from k on. Below the minimal depth the answer is unknown, never
//! a wrong verdict.

use kinduct_soundness::{check_script, fixture, verdict};
use kinduct_symbolic::{SymbolicConfig, Verdict};

fn run(name: &str, max_depth: usize) -> Vec<kinduct_symbolic::Report> {
    let config = SymbolicConfig::default().with_max_depth(max_depth);
    check_script(&fixture(name).unwrap(), &config).unwrap()
}

#[test]
fn toggle_violation_needs_depth_ten() {
    for max_depth in [0, 3, 9, 10, 12] {
        let reports = run("toggle.kin", max_depth);
        let bounded = verdict(&reports, 0, "bounded").unwrap();
        if max_depth < 10 {
            assert!(bounded.is_unknown(), "K = {}: {}", max_depth, bounded);
            assert_eq!(bounded.depth(), max_depth);
        } else {
            match bounded {
                Verdict::Violated { depth, trace } => {
                    assert_eq!(*depth, 10, "K = {}", max_depth);
                    assert_eq!(trace.len(), 11);
                }
                other => panic!("K = {}: expected a violation, got {}", max_depth, other),
            }
        }
    }
}

#[test]
fn proofs_are_stable_under_larger_limits() {
    for max_depth in [1, 2, 5, 10] {
        let reports = run("strengthen.kin", max_depth);
        assert_eq!(
            verdict(&reports, 0, "y_nonneg"),
            Some(&Verdict::AllHold { depth: 1 }),
            "K = {}",
            max_depth
        );
        assert_eq!(
            verdict(&reports, 1, "y_nonneg"),
            Some(&Verdict::AllHold { depth: 0 }),
            "K = {}",
            max_depth
        );
    }
    let shallow = run("strengthen.kin", 0);
    assert!(verdict(&shallow, 0, "y_nonneg").is_some_and(Verdict::is_unknown));
}

#[test]
fn counter_holds_at_every_limit() {
    for max_depth in [0, 1, 4] {
        let reports = run("counter.kin", max_depth);
        for (i, report) in reports.iter().enumerate() {
            assert_eq!(
                verdict(&reports, i, "nonneg"),
                Some(&Verdict::AllHold { depth: 0 }),
                "K = {}\n{}",
                max_depth,
                report
            );
        }
    }
}
