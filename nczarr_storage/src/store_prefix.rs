use derive_more::{Display, From};
use thiserror::Error;

use crate::{StoreKey, StoreKeyError};

/// A map prefix.
///
/// A prefix is either empty (the root of the map) or a valid [`StoreKey`] followed by `/`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub struct StorePrefix(String);

/// An invalid store prefix.
#[derive(Clone, Debug, Eq, PartialEq, Error, From)]
#[error("invalid store prefix {0}")]
pub struct StorePrefixError(String);

/// A list of [`StorePrefix`].
pub type StorePrefixes = Vec<StorePrefix>;

impl StorePrefix {
    /// Create a new prefix from `prefix`.
    ///
    /// # Errors
    /// Returns [`StorePrefixError`] if `prefix` is not valid according to [`StorePrefix::validate`()].
    pub fn new(prefix: impl Into<String>) -> Result<Self, StorePrefixError> {
        let prefix = prefix.into();
        if Self::validate(&prefix) {
            Ok(Self(prefix))
        } else {
            Err(StorePrefixError(prefix))
        }
    }

    /// Create a new prefix from `prefix` without validation.
    ///
    /// # Safety
    /// `prefix` is not validated, so this can result in an invalid store prefix.
    #[must_use]
    pub unsafe fn new_unchecked(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        debug_assert!(Self::validate(&prefix));
        Self(prefix)
    }

    /// The root prefix.
    #[must_use]
    pub const fn root() -> Self {
        Self(String::new())
    }

    /// Create a prefix from a `/` separated path such as `/group/array` or `group`.
    ///
    /// Leading and trailing `/` are ignored, and an empty path or `/` is the root.
    ///
    /// # Errors
    /// Returns [`StorePrefixError`] if the path has invalid components.
    pub fn from_path(path: &str) -> Result<Self, StorePrefixError> {
        let path = path.trim_matches('/');
        if path.is_empty() {
            Ok(Self::root())
        } else {
            Self::new(path.to_string() + "/")
        }
    }

    /// Extracts a string slice containing the prefix.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this is the root prefix.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Validates a prefix.
    #[must_use]
    pub fn validate(prefix: &str) -> bool {
        prefix.is_empty()
            || prefix
                .strip_suffix('/')
                .is_some_and(StoreKey::validate)
    }

    /// Returns the key of `name` under this prefix.
    ///
    /// # Errors
    /// Returns [`StoreKeyError`] if the resulting key is invalid.
    pub fn key(&self, name: &str) -> Result<StoreKey, StoreKeyError> {
        StoreKey::new(self.0.clone() + name)
    }

    /// Returns the prefix of the parent, if it has one.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let trimmed = self.0.strip_suffix('/')?;
        Some(match trimmed.rsplit_once('/') {
            Some((parent, _)) => Self(parent.to_string() + "/"),
            None => Self::root(),
        })
    }
}

impl TryFrom<&str> for StorePrefix {
    type Error = StorePrefixError;

    fn try_from(prefix: &str) -> Result<Self, StorePrefixError> {
        Self::new(prefix)
    }
}

impl From<&StoreKey> for StorePrefix {
    fn from(key: &StoreKey) -> Self {
        key.to_prefix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid() {
        assert!(StorePrefix::new("").is_ok());
        assert!(StorePrefix::new("a/").is_ok());
        assert!(StorePrefix::new("a/b/").is_ok());
        assert!(StorePrefix::try_from("a/").is_ok());
    }

    #[test]
    fn invalid() {
        assert!(StorePrefix::new("a").is_err());
        assert!(StorePrefix::new("/a/").is_err());
        assert!(StorePrefix::new("/").is_err());
        assert!(StorePrefix::new("a//").is_err());
    }

    #[test]
    fn from_path() {
        assert_eq!(StorePrefix::from_path("/").unwrap(), StorePrefix::root());
        assert_eq!(StorePrefix::from_path("").unwrap(), StorePrefix::root());
        assert_eq!(
            StorePrefix::from_path("/g1/a2").unwrap(),
            StorePrefix::new("g1/a2/").unwrap()
        );
        assert_eq!(
            StorePrefix::from_path("g1/").unwrap().key(".zattrs").unwrap(),
            StoreKey::new("g1/.zattrs").unwrap()
        );
    }

    #[test]
    fn parent() {
        assert_eq!(
            StorePrefix::new("a/b/").unwrap().parent(),
            Some(StorePrefix::new("a/").unwrap())
        );
        assert_eq!(
            StorePrefix::new("a/").unwrap().parent(),
            Some(StorePrefix::root())
        );
        assert_eq!(StorePrefix::root().parent(), None);
    }
}
