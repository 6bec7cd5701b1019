// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::BoxError;

/// The backing source of a cache group, consulted only on a cache miss.
///
/// Implement this for a type that loads data from the source of truth, or use a closure:
/// every `Fn(&str) -> Result<Vec<u8>, E>` where `E` converts into [`BoxError`] is a getter.
///
/// A getter is called synchronously on the thread that missed the cache and may block. Any
/// error it returns is handed to the caller of [`Group::get`](crate::Group::get) unchanged
/// and is not cached.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
///
/// use lookaside::{BoxError, Getter};
///
/// struct SlowDb(HashMap<&'static str, &'static str>);
///
/// impl Getter for SlowDb {
///     fn get(&self, key: &str) -> Result<Vec<u8>, BoxError> {
///         self.0
///             .get(key)
///             .map(|value| value.as_bytes().to_vec())
///             .ok_or_else(|| format!("{key} not exist").into())
///     }
/// }
///
/// let db = SlowDb(HashMap::from([("Tom", "630")]));
/// assert_eq!(db.get("Tom").unwrap(), b"630");
/// assert!(db.get("Sam").is_err());
/// ```
pub trait Getter: Send + Sync {
    /// Loads the value for `key` from the source of truth.
    ///
    /// # Errors
    ///
    /// Returns whatever error the source produced; it is surfaced to the caller verbatim.
    fn get(&self, key: &str) -> Result<Vec<u8>, BoxError>;
}

impl<F, E> Getter for F
where
    F: Fn(&str) -> Result<Vec<u8>, E> + Send + Sync,
    E: Into<BoxError>,
{
    fn get(&self, key: &str) -> Result<Vec<u8>, BoxError> {
        self(key).map_err(Into::into)
    }
}
