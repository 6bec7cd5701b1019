// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::Level;

/// Records formatted `tracing` output of every level so tests can search it.
///
/// ```
/// use testing_aids::LogCapture;
///
/// let capture = LogCapture::new();
/// tracing::subscriber::with_default(capture.subscriber(), || {
///     tracing::debug!(answer = 42, "computed");
/// });
/// capture.assert_contains("computed");
/// capture.assert_contains("answer=42");
/// capture.assert_not_contains("failed");
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    lines: Arc<Mutex<String>>,
}

impl LogCapture {
    /// Creates a capture with nothing recorded yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A subscriber that appends to this capture; install it with
    /// `tracing::subscriber::with_default`.
    #[must_use]
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + use<> {
        let lines = Arc::clone(&self.lines);
        tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .with_ansi(false)
            .with_writer(move || Appender(Arc::clone(&lines)))
            .finish()
    }

    /// # Panics
    ///
    /// Panics if nothing recorded so far contains `needle`.
    pub fn assert_contains(&self, needle: &str) {
        let lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        assert!(lines.contains(needle), "no log line contains '{needle}', got:\n{lines}");
    }

    /// # Panics
    ///
    /// Panics if anything recorded so far contains `needle`.
    pub fn assert_not_contains(&self, needle: &str) {
        let lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        assert!(!lines.contains(needle), "unexpected log line containing '{needle}', got:\n{lines}");
    }
}

struct Appender(Arc<Mutex<String>>);

impl io::Write for Appender {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push_str(&String::from_utf8_lossy(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
