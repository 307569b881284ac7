//! Generic interface to secret storage backends.

use async_trait::async_trait;

use crate::errors::*;
use crate::secret::Secret;

/// Generic interface to a secret-storage backend.
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Read every field of the secret stored at `path`.
    async fn read_secret(&self, path: &str) -> Result<Secret>;
}
