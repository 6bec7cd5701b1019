// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Display};

use bytes::Bytes;

/// An immutable view over cached bytes.
///
/// A `ByteView` never changes after construction. Clones are cheap and share the same
/// underlying buffer; callers that need a mutable buffer get an independent copy from
/// [`byte_slice`](Self::byte_slice), so nothing they do can alter what the cache holds.
///
/// # Examples
///
/// ```
/// use lookaside_tier::ByteView;
///
/// let view = ByteView::from("630");
/// assert_eq!(view.len(), 3);
/// assert_eq!(view.to_string(), "630");
///
/// let mut copy = view.byte_slice();
/// copy[0] = b'9';
/// assert_eq!(view.as_bytes(), b"630");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ByteView {
    bytes: Bytes,
}

impl ByteView {
    /// Creates a view holding a copy of `data`.
    #[must_use]
    pub fn copy_from_slice(data: &[u8]) -> Self {
        Self {
            bytes: Bytes::copy_from_slice(data),
        }
    }

    /// Returns the length of the view in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the view holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrows the bytes of the view.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the view's bytes as UTF-8 text, or `None` if they are not valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }

    /// Returns an independent, mutable copy of the bytes.
    #[must_use]
    pub fn byte_slice(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }

    /// Returns the underlying buffer. This does not copy; `Bytes` is itself immutable.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        self.bytes.clone()
    }
}

impl Display for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}

impl AsRef<[u8]> for ByteView {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(data: Vec<u8>) -> Self {
        Self { bytes: Bytes::from(data) }
    }
}

impl From<String> for ByteView {
    fn from(data: String) -> Self {
        Self { bytes: Bytes::from(data) }
    }
}

impl From<&str> for ByteView {
    fn from(data: &str) -> Self {
        Self::copy_from_slice(data.as_bytes())
    }
}

impl From<Bytes> for ByteView {
    fn from(bytes: Bytes) -> Self {
        Self { bytes }
    }
}
