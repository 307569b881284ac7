//! Secrets fetched from the backend, and the collection they live in for
//! the rest of the run.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::backend::SecretSource;
use crate::errors::*;

/// A single field value stored in a secret.
///
/// Vault stores arbitrary JSON. Objects and arrays are kept as they are so
/// the rest of the secret can still be used, but they can't be exported.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SecretValue {
    /// A JSON string.
    String(String),
    /// A JSON number.
    Number(serde_json::Number),
    /// A JSON boolean.
    Bool(bool),
    /// A JSON `null`.
    Null,
    /// A JSON object or array.
    Nested(serde_json::Value),
}

impl fmt::Display for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretValue::String(s) => f.write_str(s),
            SecretValue::Number(n) => write!(f, "{}", n),
            SecretValue::Bool(b) => write!(f, "{}", b),
            SecretValue::Null => Ok(()),
            SecretValue::Nested(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for SecretValue {
    fn from(s: &str) -> Self {
        SecretValue::String(s.to_owned())
    }
}

impl From<i64> for SecretValue {
    fn from(n: i64) -> Self {
        SecretValue::Number(n.into())
    }
}

impl From<bool> for SecretValue {
    fn from(b: bool) -> Self {
        SecretValue::Bool(b)
    }
}

/// The key-value pairs stored in one secret.
pub type Secret = BTreeMap<String, SecretValue>;

/// Every secret requested on the command line, keyed by the path used to
/// fetch it.
#[derive(Debug, Default)]
pub struct SecretCollection {
    secrets: BTreeMap<String, Secret>,
}

impl SecretCollection {
    /// Create an empty collection.
    pub fn new() -> SecretCollection {
        SecretCollection::default()
    }

    /// Store `secret` under `path`. Returns `false` and leaves the existing
    /// entry alone if `path` is already present.
    pub fn insert(&mut self, path: &str, secret: Secret) -> bool {
        if self.secrets.contains_key(path) {
            return false;
        }
        self.secrets.insert(path.to_owned(), secret);
        true
    }

    /// Look up a secret by the path it was fetched from.
    pub fn get(&self, path: &str) -> Option<&Secret> {
        self.secrets.get(path)
    }

    /// Does this collection contain `path`?
    pub fn contains(&self, path: &str) -> bool {
        self.secrets.contains_key(path)
    }

    /// Look up a single exportable field, failing if the secret or the
    /// field is absent, or if the field isn't a scalar.
    pub fn field(&self, path: &str, key: &str) -> Result<&SecretValue> {
        let secret = self.get(path).ok_or_else(|| Error::MissingSecret {
            secret: path.to_owned(),
        })?;
        match secret.get(key) {
            None => Err(Error::MissingKeyInSecret {
                secret: path.to_owned(),
                key: key.to_owned(),
            }),
            Some(SecretValue::Nested(_)) => Err(Error::NotScalar {
                secret: path.to_owned(),
                key: key.to_owned(),
            }),
            Some(value) => Ok(value),
        }
    }
}

/// Fetch each of `paths` in order. The first failure stops the run.
pub async fn fetch_secrets<S>(source: &S, paths: &[String]) -> Result<SecretCollection>
where
    S: SecretSource + ?Sized,
{
    let mut collection = SecretCollection::new();
    for path in paths {
        if collection.contains(path) {
            debug!("secret {} requested more than once", path);
            continue;
        }
        let secret = source.read_secret(path).await.map_err(|err| Error::SecretRead {
            path: path.to_owned(),
            source: Box::new(err),
        })?;
        debug!("read {} fields from {}", secret.len(), path);
        collection.insert(path, secret);
    }
    Ok(collection)
}
