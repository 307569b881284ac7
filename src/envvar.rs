//! Access to the environment we're exporting into.

use std::collections::BTreeMap;
use std::env;

/// Somewhere we can look up environment variables.
pub trait Environment {
    /// Get the value of `name`, if it's set.
    fn var(&self, name: &str) -> Option<String>;

    /// Is `name` set to a non-empty value?
    fn is_set(&self, name: &str) -> bool {
        self.var(name).map_or(false, |value| !value.is_empty())
    }
}

/// The environment of the current process.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        env::var(name).ok()
    }
}

impl Environment for BTreeMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

#[test]
fn test_var() {
    env::set_var("VAULT_EXPORTS_TEST_USERNAME", "user");
    let env = ProcessEnvironment;
    assert_eq!(Some("user".to_owned()), env.var("VAULT_EXPORTS_TEST_USERNAME"));
    assert!(env.is_set("VAULT_EXPORTS_TEST_USERNAME"));
    assert!(env.var("VAULT_EXPORTS_TEST_NOSUCHVAR").is_none());
}

#[test]
fn test_empty_is_unset() {
    let mut env = BTreeMap::new();
    env.insert("EMPTY".to_owned(), String::new());
    env.insert("FULL".to_owned(), "x".to_owned());
    assert!(!env.is_set("EMPTY"));
    assert!(env.is_set("FULL"));
    assert!(!env.is_set("MISSING"));
}
