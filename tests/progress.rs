//! Progress, cancellation and option tests.

use thumbsheet::{CancellationToken, GenerateOptions};

// ── CancellationToken ──────────────────────────────────────────────

#[test]
fn cancellation_token_default_not_cancelled() {
    assert!(!CancellationToken::new().is_cancelled());
    assert!(!CancellationToken::default().is_cancelled());
}

#[test]
fn cancellation_token_clone_shares_state() {
    let token = CancellationToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());

    token.cancel();
    assert!(clone.is_cancelled());
}

#[test]
fn cancellation_token_crosses_threads() {
    let token = CancellationToken::new();
    let remote = token.clone();
    std::thread::spawn(move || remote.cancel())
        .join()
        .expect("Cancelling thread panicked");
    assert!(token.is_cancelled());
}

// ── GenerateOptions ────────────────────────────────────────────────

#[test]
fn options_default_has_no_cancellation() {
    let options = GenerateOptions::default();
    assert!(options.cancellation().is_none());
    let debug = format!("{options:?}");
    assert!(debug.contains("has_progress: false"));
}

#[test]
fn options_keep_cancellation_token() {
    let token = CancellationToken::new();
    let options = GenerateOptions::new().with_cancellation(token.clone());
    token.cancel();
    assert!(options.cancellation().is_some_and(CancellationToken::is_cancelled));
}

#[test]
fn options_batch_size_is_at_least_one() {
    let debug = format!("{:?}", GenerateOptions::new().with_batch_size(0));
    assert!(debug.contains("batch_size: 1"));
}
