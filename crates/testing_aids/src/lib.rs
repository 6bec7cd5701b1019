// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! An unpublished crate containing testing utilities for use within this repo.

use std::sync::mpsc;
use std::time::Duration;
use std::{env, thread};

mod log;
mod metrics;

pub use log::*;
pub use metrics::*;

/// If something (whatever) does not happen in a test within this time, the test will fail.
///
/// This only exists to break out of deadlocks in concurrency tests, not for any situations
/// that are actually expected.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Returns `true` when running under `cargo mutants` with `MUTATION_TESTING=1` set.
#[must_use]
pub fn is_mutation_testing() -> bool {
    env::var("MUTATION_TESTING").as_deref() == Ok("1")
}

/// Executes a thread-safe function on a background thread and abandons it if
/// it does not complete before [`TEST_TIMEOUT`].
///
/// Returns `None` if the function panicked or timed out.
#[cfg_attr(test, mutants::skip)] // This is test logic - pointless to mutate.
#[must_use]
pub fn execute_or_abandon<F, R>(f: F) -> Option<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if is_mutation_testing() {
        // Timeouts must surface as "timeout" mutation results, not as test failures.
        return Some(f());
    }

    let (sender, receiver) = mpsc::channel();

    // A panic or a hang both leave the channel without a value.
    thread::spawn(move || {
        let result = f();
        // The receiver is gone if we already timed out.
        let _ = sender.send(result);
    });

    receiver.recv_timeout(TEST_TIMEOUT).ok()
}
