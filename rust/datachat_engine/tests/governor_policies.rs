//! Tool-Call Governor policies observed through its public API.

mod common;

use std::sync::Arc;

use datachat_engine::DenialReason;

#[test]
fn test_budget_denies_call_after_maximum() {
    let governor = common::governor(5, 3);
    for i in 0..5 {
        let sql = format!("SELECT {i}");
        assert!(governor.check_before_call("s", "query", Some(&sql)).allowed);
        governor.record_call("s", "query", true, Some(&sql));
    }

    let decision = governor.check_before_call("s", "query", Some("SELECT 99"));
    assert!(!decision.allowed);
    assert_eq!(decision.denial, Some(DenialReason::BudgetExhausted));
    assert!(decision.reason.contains("5 calls"));

    // Terminal: still denied on later checks, for any tool.
    assert!(!governor.check_before_call("s", "list_tables", None).allowed);
}

#[test]
fn test_identical_success_is_suppressed() {
    let governor = common::governor(25, 3);
    let sql = "SELECT region, SUM(amount) FROM sales GROUP BY region";
    assert!(governor.check_before_call("s", "query", Some(sql)).allowed);
    governor.record_call("s", "query", true, Some(sql));

    let decision = governor.check_before_call("s", "query", Some(sql));
    assert!(!decision.allowed);
    assert_eq!(decision.denial, Some(DenialReason::DuplicateSuccess));
}

#[test]
fn test_formatting_differences_do_not_evade_dedup() {
    let governor = common::governor(25, 3);
    governor.record_call("s", "query", true, Some("SELECT * FROM orders WHERE id = 1"));
    let decision = governor.check_before_call(
        "s",
        "query",
        Some("  select *\n  from ORDERS\twhere id = 1 "),
    );
    assert_eq!(decision.denial, Some(DenialReason::DuplicateSuccess));
}

#[test]
fn test_different_literals_remain_distinct() {
    let governor = common::governor(25, 3);
    governor.record_call("s", "query", true, Some("SELECT * FROM orders WHERE id = 1"));
    assert!(
        governor
            .check_before_call("s", "query", Some("SELECT * FROM orders WHERE id = 2"))
            .allowed
    );
    // Same query text under another tool name is a different pair.
    assert!(
        governor
            .check_before_call("s", "check_query", Some("SELECT * FROM orders WHERE id = 1"))
            .allowed
    );
}

#[test]
fn test_failed_call_can_be_retried() {
    let governor = common::governor(25, 3);
    governor.record_call("s", "query", false, Some("SELECT broken"));
    assert!(governor.check_before_call("s", "query", Some("SELECT broken")).allowed);
}

#[test]
fn test_consecutive_failures_trip_cutoff() {
    let governor = common::governor(25, 3);
    for sql in ["SELECT a", "SELECT b", "SELECT c"] {
        assert!(governor.check_before_call("s", "query", Some(sql)).allowed);
        governor.record_call("s", "query", false, Some(sql));
    }

    let decision = governor.check_before_call("s", "query", Some("SELECT d"));
    assert_eq!(decision.denial, Some(DenialReason::ConsecutiveFailures));
    assert!(decision.reason.contains("'query'"));
    assert!(governor.check_before_call("s", "list_tables", None).allowed);
}

#[test]
fn test_success_resets_failure_streak() {
    let governor = common::governor(25, 3);
    governor.record_call("s", "query", false, Some("SELECT a"));
    governor.record_call("s", "query", false, Some("SELECT b"));
    governor.record_call("s", "query", true, Some("SELECT c"));
    governor.record_call("s", "query", false, Some("SELECT d"));
    governor.record_call("s", "query", false, Some("SELECT e"));
    assert!(governor.check_before_call("s", "query", Some("SELECT f")).allowed);

    let snapshot = governor.snapshot("s").unwrap();
    assert_eq!(snapshot.total_calls, 5);
    assert_eq!(snapshot.consecutive_failures, vec![("query".to_string(), 2)]);
}

#[test]
fn test_budget_wins_over_other_policies() {
    let governor = common::governor(3, 3);
    for sql in ["SELECT a", "SELECT b", "SELECT c"] {
        governor.record_call("s", "query", false, Some(sql));
    }
    let decision = governor.check_before_call("s", "query", Some("SELECT a"));
    assert_eq!(decision.denial, Some(DenialReason::BudgetExhausted));
}

#[test]
fn test_ledgers_are_isolated_and_closable() {
    let governor = common::governor(25, 3);
    governor.record_call("a", "list_tables", true, None);
    assert!(!governor.check_before_call("a", "list_tables", None).allowed);
    assert!(governor.check_before_call("b", "list_tables", None).allowed);

    assert!(governor.close("a"));
    assert!(governor.check_before_call("a", "list_tables", None).allowed);
    assert!(governor.snapshot("a").is_none());
}

#[test]
fn test_concurrent_recording_keeps_exact_totals() {
    let governor = common::governor(10_000, 3);
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let governor = Arc::clone(&governor);
            std::thread::spawn(move || {
                let session = format!("s{}", t % 2);
                for i in 0..100 {
                    let sql = format!("SELECT {t}, {i}");
                    governor.record_call(&session, "query", true, Some(&sql));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(governor.active_sessions(), vec!["s0".to_string(), "s1".to_string()]);
    assert_eq!(governor.snapshot("s0").unwrap().total_calls, 400);
    assert_eq!(governor.snapshot("s1").unwrap().successful_calls, 400);
}
