// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache group operations.

use std::sync::Arc;

/// A boxed, thread-safe error, as returned by backing sources and peer fetchers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An error from a cache group or registry operation.
///
/// Errors are cheap to clone so that every caller waiting on the same coalesced load can
/// receive its own copy.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The key was empty.
    #[error("key is required")]
    InvalidKey,

    /// The backing source failed to produce a value. The source's error is kept unchanged and
    /// is reachable through [`Error::source_as`] or [`std::error::Error::source`].
    #[error("backing source failed: {0}")]
    Source(#[source] Arc<BoxError>),

    /// A group or registry was configured incorrectly, e.g. a group was built without a
    /// backing source.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub(crate) fn source_failed(cause: BoxError) -> Self {
        // `Arc<BoxError>` is not itself an error, so `source()` yields the error inside the box.
        Self::Source(Arc::new(cause))
    }

    /// Returns the backing source's error as a concrete type, if this is a
    /// [`Source`](Self::Source) error of that type.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io;
    ///
    /// use lookaside::{Error, Registry};
    ///
    /// let registry = Registry::new();
    /// let group = registry.new_group("scores", 0, |key: &str| -> Result<Vec<u8>, io::Error> {
    ///     Err(io::Error::new(io::ErrorKind::NotFound, format!("{key} not exist")))
    /// });
    ///
    /// let error = group.get("unknown").unwrap_err();
    /// let cause = error.source_as::<io::Error>().expect("source error is an io::Error");
    /// assert_eq!(cause.kind(), io::ErrorKind::NotFound);
    /// ```
    #[must_use]
    pub fn source_as<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            Self::Source(cause) => cause.downcast_ref::<E>(),
            _ => None,
        }
    }
}

/// A specialized [`Result`] type for cache group operations.
pub type Result<T> = std::result::Result<T, Error>;
