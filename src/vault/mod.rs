//! A very basic client for Hashicorp's Vault

use async_trait::async_trait;
use serde::Deserialize;
use std::env;
use std::fs;

use crate::backend::SecretSource;
use crate::errors::*;
use crate::secret::Secret;

mod aws_ec2;

pub use self::aws_ec2::{
    bootstrap, fetch_identity_document, read_nonce, BootstrapConfig, DEFAULT_AUTH_PATH,
    DEFAULT_METADATA_URL, DEFAULT_ROLE,
};

/// The address the `vault` CLI uses when `VAULT_ADDR` isn't set.
pub const DEFAULT_ADDR: &str = "https://127.0.0.1:8200";

/// The header Vault reads our token from.
const VAULT_TOKEN_HEADER: &str = "X-Vault-Token";

/// The default vault token.
fn default_token() -> Result<String> {
    // Wrap everything in a local function and call it so that
    // we can wrap all errors in a custom type.
    (|| -> Result<String> {
        if let Ok(token) = env::var("VAULT_TOKEN") {
            // The env var `VAULT_TOKEN` overrides everything.
            Ok(token)
        } else {
            // Build a path to ~/.vault-token.
            let mut path = dirs::home_dir().ok_or(Error::NoHomeDirectory)?;
            path.push(".vault-token");

            // Read the file.
            let token = fs::read_to_string(&path).map_err(|err| Error::FileRead {
                path: path.clone(),
                source: Box::new(err.into()),
            })?;
            Ok(token.trim().to_owned())
        }
    })()
    .map_err(|err| Error::MissingVaultToken(Box::new(err)))
}

/// Secret data retrieved from Vault. This has a bunch more fields, but we
/// only need the data itself.
#[derive(Debug, Deserialize)]
struct SecretResponse {
    /// The key-value pairs associated with this secret.
    #[serde(default)]
    data: Option<Secret>,
    // How long this secret will remain valid for, in seconds.
    #[serde(default)]
    lease_duration: u64,
    /// Anything Vault wants to tell us about this request.
    #[serde(default)]
    warnings: Option<Vec<String>>,
}

/// A basic Vault client.
#[derive(Debug)]
pub struct Client {
    /// Our HTTP client.
    client: reqwest::Client,
    /// The address of our Vault server.
    addr: reqwest::Url,
    /// The token which we'll use to access Vault, once we have one.
    token: Option<String>,
}

impl Client {
    /// Create a new Vault client talking to `addr`, without a token.
    pub fn new(addr: &str) -> Result<Client> {
        // Idle connections are never reused. Both Vault and the metadata
        // service may close them under us between requests.
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|err| Error::Other(err.into()))?;
        Client::with_http_client(client, addr)
    }

    /// Create a new Vault client using an existing HTTP client.
    pub fn with_http_client(client: reqwest::Client, addr: &str) -> Result<Client> {
        let mut addr = reqwest::Url::parse(addr)?;
        if !matches!(addr.scheme(), "http" | "https") || addr.cannot_be_a_base() {
            return Err(Error::InvalidUrl {
                url: addr.to_string(),
            });
        }
        // Make sure `join` appends to any path prefix instead of replacing
        // its last segment.
        if !addr.path().ends_with('/') {
            let path = format!("{}/", addr.path());
            addr.set_path(&path);
        }
        Ok(Client {
            client,
            addr,
            token: None,
        })
    }

    /// Use the same token as the `vault` CLI tool: `VAULT_TOKEN`, or the
    /// contents of `~/.vault-token`.
    pub fn load_default_token(&mut self) -> Result<()> {
        self.set_token(default_token()?);
        Ok(())
    }

    /// Use `token` for every request from now on.
    pub fn set_token<S: Into<String>>(&mut self, token: S) {
        self.token = Some(token.into());
    }

    /// The token we're currently using, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Our underlying HTTP client.
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// Build a URL for a Vault API path.
    fn api_url(&self, path: &str) -> Result<reqwest::Url> {
        Ok(self.addr.join(&format!("v1/{}", path.trim_start_matches('/')))?)
    }

    /// Fetch a secret from the Vault server.
    pub async fn read(&self, path: &str) -> Result<Secret> {
        let url = self.api_url(path)?;
        debug!("Getting secret {}", url);

        let mkerr = |err| Error::Url {
            url: url.clone(),
            source: Box::new(err),
        };
        let mut req = self
            .client
            .get(url.clone())
            // Leaving the connection open will cause errors on reconnect
            // after inactivity.
            .header("Connection", "close");
        if let Some(token) = &self.token {
            req = req.header(VAULT_TOKEN_HEADER, token);
        }
        let res = req
            .send()
            .await
            .map_err(|err| (&mkerr)(Error::Other(err.into())))?;

        // Read our HTTP body.
        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|err| (&mkerr)(Error::Other(err.into())))?;

        if status.is_success() {
            let res: SecretResponse =
                serde_json::from_str(&body).map_err(|err| (&mkerr)(err.into()))?;
            for warning in res.warnings.iter().flatten() {
                warn!("Vault warning for {}: {}", path, warning);
            }
            trace!("secret {} has a lease of {}s", path, res.lease_duration);
            Ok(res.data.unwrap_or_default())
        } else {
            // Generate informative errors for HTTP failures, because these can
            // be caused by everything from bad URLs to overly restrictive vault
            // policies.
            Err(mkerr(Error::UnexpectedHttpStatus {
                status,
                body: body.trim().to_owned(),
            }))
        }
    }
}

#[async_trait]
impl SecretSource for Client {
    async fn read_secret(&self, path: &str) -> Result<Secret> {
        self.read(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::Client;
    use crate::errors::Error;
    use crate::secret::SecretValue;
    use httpmock::prelude::*;
    use serde_json::json;

    fn test_client(server: &MockServer) -> Client {
        let mut client = Client::new(&server.base_url()).unwrap();
        client.set_token("123");
        client
    }

    #[test]
    fn test_addr_normalization() {
        let client = Client::new("https://vault.example.com:8200/prefix").unwrap();
        assert_eq!(
            client.api_url("secret/foo").unwrap().as_str(),
            "https://vault.example.com:8200/prefix/v1/secret/foo"
        );
        let client = Client::new("http://127.0.0.1:8200").unwrap();
        assert_eq!(
            client.api_url("/secret/foo").unwrap().as_str(),
            "http://127.0.0.1:8200/v1/secret/foo"
        );
    }

    #[test]
    fn test_bad_addr() {
        match Client::new("not a url") {
            Err(err @ Error::UnparseableUrl(_)) => assert_eq!(err.exit_code(), 1),
            other => panic!("unexpected result: {:?}", other),
        }
        match Client::new("mailto:vault@example.com") {
            Err(err @ Error::InvalidUrl { .. }) => assert_eq!(err.exit_code(), 1),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_secret() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v1/secret/foo")
                    .header("X-Vault-Token", "123");
                then.status(200).json_body(json!({
                    "data": {"value": "bar", "port": 5432, "enabled": true, "note": null},
                    "lease_duration": 2592000,
                    "warnings": null
                }));
            })
            .await;

        let secret = test_client(&server).read("secret/foo").await.unwrap();
        mock.assert_async().await;
        assert_eq!(secret["value"], SecretValue::from("bar"));
        assert_eq!(secret["port"].to_string(), "5432");
        assert_eq!(secret["enabled"], SecretValue::Bool(true));
        assert_eq!(secret["note"], SecretValue::Null);
    }

    #[tokio::test]
    async fn test_missing_data_is_empty() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/secret/empty");
                then.status(200)
                    .json_body(json!({"data": null, "warnings": ["nothing here"]}));
            })
            .await;

        let secret = test_client(&server).read("secret/empty").await.unwrap();
        assert!(secret.is_empty());
    }

    #[tokio::test]
    async fn test_http_errors_include_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/secret/forbidden");
                then.status(403)
                    .body("{\"errors\":[\"permission denied\"]}\n");
            })
            .await;

        match test_client(&server).read("secret/forbidden").await {
            Err(Error::Url { source, .. }) => match *source {
                Error::UnexpectedHttpStatus { status, body } => {
                    assert_eq!(status, reqwest::StatusCode::FORBIDDEN);
                    assert_eq!(body, "{\"errors\":[\"permission denied\"]}");
                }
                other => panic!("unexpected cause: {:?}", other),
            },
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_nested_fields_do_not_fail_the_read() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/secret/db");
                then.status(200)
                    .json_body(json!({"data": {"user": "alice", "hosts": ["a", "b"]}}));
            })
            .await;

        let secret = test_client(&server).read("secret/db").await.unwrap();
        assert_eq!(secret["user"], SecretValue::from("alice"));
        assert_eq!(secret["hosts"], SecretValue::Nested(json!(["a", "b"])));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/secret/broken");
                then.status(200).body("<html>not vault</html>");
            })
            .await;

        match test_client(&server).read("secret/broken").await {
            Err(Error::Url { source, .. }) => assert!(matches!(*source, Error::Json(_))),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
