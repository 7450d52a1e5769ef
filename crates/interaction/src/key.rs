use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_KEY_PATH: &str = "keys/simple_interaction";
const DEFAULT_INPUT_ACTION: &str = "interact";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyPathError {
    #[error("interaction key path must not be empty")]
    Empty,
    #[error("interaction key path must not start with '/'")]
    LeadingSlash,
    #[error("interaction key path must not contain '\\\\'")]
    Backslash,
    #[error("interaction key path must not contain '..'")]
    ParentTraversal,
    #[error("interaction key path contains invalid character '{character}'")]
    InvalidCharacter { character: char },
}

pub fn validate_key_path(path: &str) -> Result<(), KeyPathError> {
    if path.is_empty() {
        return Err(KeyPathError::Empty);
    }
    if path.starts_with('/') {
        return Err(KeyPathError::LeadingSlash);
    }
    if path.contains('\\') {
        return Err(KeyPathError::Backslash);
    }
    if path.contains("..") {
        return Err(KeyPathError::ParentTraversal);
    }
    for ch in path.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '/' | '-') {
            continue;
        }
        return Err(KeyPathError::InvalidCharacter { character: ch });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionKey {
    pub path: String,
    pub consume_after_interaction: bool,
    pub input_action: String,
}

/// Shared handle to a registered key. Two handles are equal only when they
/// point at the same registered key, never by comparing contents.
#[derive(Clone)]
pub struct KeyHandle(Rc<InteractionKey>);

impl KeyHandle {
    pub fn new(key: InteractionKey) -> Self {
        Self(Rc::new(key))
    }

    pub fn key(&self) -> &InteractionKey {
        &self.0
    }

    pub fn path(&self) -> &str {
        &self.0.path
    }

    pub fn consume_after_interaction(&self) -> bool {
        self.0.consume_after_interaction
    }
}

impl PartialEq for KeyHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for KeyHandle {}

impl Hash for KeyHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Rc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeyHandle").field(&self.0.path).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyRef(String);

impl KeyRef {
    pub fn new(path: impl Into<String>) -> Result<Self, KeyPathError> {
        let path = path.into();
        validate_key_path(&path)?;
        Ok(Self(path))
    }

    pub fn default_key() -> Self {
        Self(DEFAULT_KEY_PATH.to_string())
    }

    pub fn path(&self) -> &str {
        &self.0
    }
}

impl Default for KeyRef {
    fn default() -> Self {
        Self::default_key()
    }
}

impl TryFrom<String> for KeyRef {
    type Error = KeyPathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<KeyRef> for String {
    fn from(value: KeyRef) -> Self {
        value.0
    }
}

#[derive(Debug, Default, Clone)]
pub struct KeyRegistry {
    keys_by_path: HashMap<String, KeyHandle>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default() -> Self {
        let mut registry = Self::new();
        registry.keys_by_path.insert(
            DEFAULT_KEY_PATH.to_string(),
            KeyHandle::new(InteractionKey {
                path: DEFAULT_KEY_PATH.to_string(),
                consume_after_interaction: false,
                input_action: DEFAULT_INPUT_ACTION.to_string(),
            }),
        );
        registry
    }

    pub fn register(
        &mut self,
        path: &str,
        consume_after_interaction: bool,
        input_action: &str,
    ) -> Result<KeyHandle, KeyPathError> {
        validate_key_path(path)?;
        let handle = KeyHandle::new(InteractionKey {
            path: path.to_string(),
            consume_after_interaction,
            input_action: input_action.to_string(),
        });
        self.keys_by_path.insert(path.to_string(), handle.clone());
        Ok(handle)
    }

    pub fn resolve(&self, key_ref: &KeyRef) -> Option<KeyHandle> {
        self.keys_by_path.get(key_ref.path()).cloned()
    }

    pub fn by_path(&self, path: &str) -> Option<KeyHandle> {
        self.keys_by_path.get(path).cloned()
    }

    pub fn default_key(&self) -> Option<KeyHandle> {
        self.by_path(DEFAULT_KEY_PATH)
    }

    pub fn len(&self) -> usize {
        self.keys_by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys_by_path.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_key_paths() {
        for path in ["keys/use", "keys/simple_interaction", "a-b/c_d1"] {
            assert!(validate_key_path(path).is_ok(), "path={path}");
        }
    }

    #[test]
    fn rejects_invalid_key_paths() {
        for path in ["", "/keys", "..", "keys/../x", r"keys\x", "Keys/use", "keys.use"] {
            assert!(validate_key_path(path).is_err(), "path={path}");
        }
    }

    #[test]
    fn handles_compare_by_identity_not_contents() {
        let a = KeyHandle::new(InteractionKey {
            path: "keys/use".to_string(),
            consume_after_interaction: false,
            input_action: "use".to_string(),
        });
        let b = KeyHandle::new(a.key().clone());
        assert_eq!(a.key(), b.key());
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn registry_resolves_same_handle_for_same_path() {
        let mut registry = KeyRegistry::with_default();
        let registered = registry.register("keys/pickup", true, "pickup").expect("register");
        let key_ref = KeyRef::new("keys/pickup").expect("key ref");

        assert_eq!(registry.resolve(&key_ref), Some(registered));
        assert!(registry.resolve(&KeyRef::new("keys/missing").expect("ref")).is_none());
        assert_eq!(
            registry.resolve(&KeyRef::default_key()),
            registry.default_key()
        );
    }

    #[test]
    fn re_registering_a_path_breaks_identity_with_old_handle() {
        let mut registry = KeyRegistry::new();
        let old = registry.register("keys/use", false, "use").expect("old");
        let new = registry.register("keys/use", false, "use").expect("new");
        assert_ne!(old, new);
        assert_eq!(registry.by_path("keys/use"), Some(new));
    }

    #[test]
    fn key_ref_deserialization_validates_path() {
        let parsed: KeyRef = serde_json::from_str("\"keys/door\"").expect("valid");
        assert_eq!(parsed.path(), "keys/door");
        assert!(serde_json::from_str::<KeyRef>("\"../door\"").is_err());
    }
}
