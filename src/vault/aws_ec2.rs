use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::Client;
use crate::errors::*;

/// The Vault role we log in as unless told otherwise.
pub const DEFAULT_ROLE: &str = "apps-role";

/// Where Vault's EC2 auth method is mounted unless told otherwise.
pub const DEFAULT_AUTH_PATH: &str = "aws-ec2";

/// The instance metadata endpoint serving our signed identity document.
pub const DEFAULT_METADATA_URL: &str =
    "http://169.254.169.254/latest/dynamic/instance-identity/pkcs7";

/// Header carrying an IMDSv2 session token.
const IMDS_TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";

/// Header requesting an IMDSv2 session token with the given lifetime.
const IMDS_TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";

/// Read the nonce we registered with Vault on our first login.
pub fn read_nonce(path: &Path) -> Result<String> {
    let nonce = fs::read_to_string(path).map_err(|err| Error::FileRead {
        path: path.to_owned(),
        source: Box::new(err.into()),
    })?;
    Ok(nonce.trim().to_owned())
}

/// Ask the metadata service for an IMDSv2 session token. Instances which
/// only speak IMDSv1 won't give us one, and that's fine.
async fn imds_session_token(client: &reqwest::Client, url: &reqwest::Url) -> Option<String> {
    let token_url = url.join("/latest/api/token").ok()?;
    let res = client
        .put(token_url)
        .header(IMDS_TOKEN_TTL_HEADER, "60")
        .send()
        .await
        .ok()?;
    if !res.status().is_success() {
        debug!("no IMDSv2 session token ({}), using IMDSv1", res.status());
        return None;
    }
    res.text().await.ok().map(|token| token.trim().to_owned())
}

/// Fetch the PKCS7-signed identity document of the instance we're running
/// on.
pub async fn fetch_identity_document(
    client: &reqwest::Client,
    url: &reqwest::Url,
) -> Result<String> {
    debug!("Getting identity document {}", url);
    let mkerr = |err| Error::IdentityDocument {
        url: url.to_owned(),
        source: Box::new(err),
    };

    let mut req = client.get(url.clone());
    if let Some(token) = imds_session_token(client, url).await {
        req = req.header(IMDS_TOKEN_HEADER, token);
    }
    let res = req
        .send()
        .await
        .map_err(|err| (&mkerr)(Error::Other(err.into())))?;

    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|err| (&mkerr)(Error::Other(err.into())))?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(mkerr(Error::UnexpectedHttpStatus {
            status,
            body: body.trim().to_owned(),
        }))
    }
}

/// Vault login information for an EC2 instance login.
#[derive(Debug, Serialize)]
struct VaultAwsEc2Login<'a> {
    role: &'a str,
    nonce: &'a str,
    pkcs7: &'a str,
}

/// Vault authentication response.
#[derive(Debug, Deserialize)]
struct VaultAuthResponse {
    /// Information about the authentication.
    auth: VaultAuth,
}

/// Vault authentication data.
#[derive(Debug, Deserialize)]
struct VaultAuth {
    /// Our Vault client token.
    client_token: String,
}

impl Client {
    /// Authenticate against the EC2 auth method mounted at `auth_path`,
    /// returning a client token.
    ///
    /// Vault answers 404 when the auth method isn't mounted; that's an
    /// error like any other failed status.
    #[tracing::instrument(level = "trace", skip(self, pkcs7, nonce))]
    pub async fn login_aws_ec2(
        &self,
        auth_path: &str,
        role: &str,
        pkcs7: &str,
        nonce: &str,
    ) -> Result<String> {
        let url = self.api_url(&format!("auth/{}/login", auth_path))?;
        let payload = VaultAwsEc2Login { role, nonce, pkcs7 };
        let mkerr = |err| Error::Url {
            url: url.to_owned(),
            source: Box::new(err),
        };
        let res = self
            .http()
            .post(url.clone())
            .header("Connection", "close")
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&payload)?)
            .send()
            .await
            .map_err(|err| (&mkerr)(Error::Other(err.into())))?;

        if res.status().is_success() {
            // Parse our body and get the auth token.
            let auth_res = res
                .json::<VaultAuthResponse>()
                .await
                .map_err(|err| (&mkerr)(Error::Other(err.into())))?;
            Ok(auth_res.auth.client_token)
        } else {
            // Generate informative errors for HTTP failures.
            let status = res.status().to_owned();
            let body = res
                .text()
                .await
                .map_err(|err| (&mkerr)(Error::Other(err.into())))?;

            Err(mkerr(Error::UnexpectedHttpStatus {
                status,
                body: body.trim().to_owned(),
            }))
        }
    }
}

/// How to log into Vault using this instance's identity.
#[derive(Clone, Debug)]
pub struct BootstrapConfig {
    /// File holding our login nonce.
    pub nonce_filename: PathBuf,
    /// The Vault role to log in as.
    pub role: String,
    /// Where the EC2 auth method is mounted.
    pub auth_path: String,
    /// Where to fetch our identity document.
    pub metadata_url: reqwest::Url,
}

impl BootstrapConfig {
    /// Log in with the default role, auth path and metadata service.
    pub fn new<P: Into<PathBuf>>(nonce_filename: P) -> Result<BootstrapConfig> {
        Ok(BootstrapConfig {
            nonce_filename: nonce_filename.into(),
            role: DEFAULT_ROLE.to_owned(),
            auth_path: DEFAULT_AUTH_PATH.to_owned(),
            metadata_url: DEFAULT_METADATA_URL.parse()?,
        })
    }
}

/// Log `client` into Vault using our nonce and instance identity.
pub async fn bootstrap(client: &mut Client, config: &BootstrapConfig) -> Result<()> {
    let nonce = read_nonce(&config.nonce_filename)?;
    let pkcs7 = fetch_identity_document(client.http(), &config.metadata_url).await?;
    let token = client
        .login_aws_ec2(&config.auth_path, &config.role, &pkcs7, &nonce)
        .await
        .map_err(|err| Error::Login {
            source: Box::new(err),
        })?;
    debug!("logged into Vault as {}", config.role);
    client.set_token(token);
    Ok(())
}
