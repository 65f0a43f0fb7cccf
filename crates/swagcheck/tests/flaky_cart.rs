//! End-to-end runs of the cart scenario against the simulated shop.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::fs;
use std::path::Path;
use swagcheck::attachment::ResultFile;
use swagcheck::driver::simulated::SimulatedEngine;
use swagcheck::{scenario, AttemptStatus, RetryRunner, Session, SuiteConfig, TestStatus};

const BASE: &str = "https://shop.test";

fn start(root: &Path, retries: u32) -> (SimulatedEngine, Session) {
    let config = SuiteConfig::default()
        .with_root(root)
        .with_base_url(BASE)
        .with_max_retries(retries);
    let engine = SimulatedEngine::new(scenario::shop_site(BASE, config.credentials.clone()));
    let session = Session::start(&engine, config).expect("session starts");
    (engine, session)
}

#[test]
fn test_fail_then_pass_is_flaky() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, mut session) = start(dir.path(), 1);

    let outcome = RetryRunner::new()
        .run(
            &mut session,
            scenario::cart_badge_item(),
            scenario::flaky_cart_body(1),
        )
        .unwrap();
    session.end().unwrap();

    assert_eq!(outcome.status, TestStatus::Flaky);
    assert_eq!(outcome.attempts(), 2);
    let first = outcome.ledger.get(1).unwrap();
    assert_eq!(first.status, AttemptStatus::Failed);
    assert_eq!(first.error.as_deref(), Some("AssertionError: 2 != 3"));
    assert_eq!(first.url.as_deref(), Some("https://shop.test/cart.html"));
    assert_eq!(outcome.ledger.get(2).unwrap().status, AttemptStatus::Passed);

    let html = &outcome.summary.as_ref().unwrap().html;
    assert!(html.contains(
        r#"Attempt 1 ❌</span><span class="arrow">→</span><span class="attempt-badge passed">Attempt 2 ✔"#
    ));
    assert!(html.contains("Failed 1 times, then passed on retry"));
    assert!(html.contains("Likely flaky test (unstable behavior)"));

    let card_1 = &html[html.find(r#"id="attempt-1""#).unwrap()..html.find(r#"id="attempt-2""#).unwrap()];
    assert!(card_1.contains(r#"id="panel-1""#));
    assert!(card_1.contains("/cart.html"));
    assert!(card_1.contains("data:image/png;base64,"));
    let card_2 = &html[html.find(r#"id="attempt-2""#).unwrap()..];
    assert!(!card_2.contains("failure-panel"));

    let attempt_1 = dir
        .path()
        .join("artifacts/test_cart/TestCart/test_cart_badge_counts_items/attempt_1");
    assert!(attempt_1.join("failure.png").is_file());
    assert!(attempt_1.join("trace.zip").is_file());
    assert!(!dir
        .path()
        .join("artifacts/test_cart/TestCart/test_cart_badge_counts_items/attempt_2")
        .exists());
    assert!(!dir.path().join("videos/attempt_2").exists());
    assert!(!dir.path().join("tracing/attempt_2").exists());
    assert_eq!(engine.stats().open_contexts(), 0);
    assert_eq!(engine.stats().browsers_closed, 1);
}

#[test]
fn test_result_file_lists_attachments() {
    let dir = tempfile::tempdir().unwrap();
    let (_engine, mut session) = start(dir.path(), 1);
    let outcome = RetryRunner::new()
        .run(
            &mut session,
            scenario::cart_badge_item(),
            scenario::flaky_cart_body(1),
        )
        .unwrap();

    let path = outcome.result_file.unwrap();
    assert!(path.starts_with(dir.path().join("report-results")));
    let result: ResultFile = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(result.attempts, 2);
    let names: Vec<&str> = result.attachments.iter().map(|a| a.name.as_str()).collect();
    assert!(names.contains(&"Failure Panel (Attempt 1)"));
    assert!(names.contains(&"Attempt Summary"));
    assert!(!names.contains(&"Failure Panel (Attempt 2)"));
    for entry in &result.attachments {
        assert!(dir.path().join("report-results").join(&entry.source).is_file());
    }
}

#[test]
fn test_every_attempt_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (_engine, mut session) = start(dir.path(), 2);
    let outcome = RetryRunner::new()
        .without_publishing()
        .run(
            &mut session,
            scenario::cart_badge_item(),
            scenario::flaky_cart_body(u32::MAX),
        )
        .unwrap();

    assert_eq!(outcome.status, TestStatus::Failed);
    assert_eq!(outcome.attempts(), 3);
    let html = &outcome.summary.unwrap().html;
    assert!(html.contains("Attempts: 3 failures"));
    assert!(html.contains("All 3 attempts failed"));
    assert!(html.contains("Same error across failed attempts"));
    for n in 1..=3 {
        let dir = dir
            .path()
            .join(format!("artifacts/test_cart/TestCart/test_cart_badge_counts_items/attempt_{n}"));
        assert!(dir.join("url.txt").is_file(), "attempt {n} has no url.txt");
    }
}

#[test]
fn test_first_attempt_pass_has_no_summary() {
    let dir = tempfile::tempdir().unwrap();
    let (_engine, mut session) = start(dir.path(), 1);
    let outcome = RetryRunner::new()
        .run(
            &mut session,
            scenario::cart_badge_item(),
            scenario::flaky_cart_body(0),
        )
        .unwrap();
    assert_eq!(outcome.status, TestStatus::Passed);
    assert!(outcome.summary.is_none());
    assert!(fs::read_dir(dir.path().join("artifacts")).unwrap().next().is_none());
}
