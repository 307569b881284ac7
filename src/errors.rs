//! Various error types used internally, and in our public APIs.

use std::io;
use std::path::PathBuf;
use std::result;

/// A result returned by functions in `vault_exports`.
pub type Result<T> = result::Result<T, Error>;

/// An error returned by `vault_exports`.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Could not read file.
    #[non_exhaustive]
    #[error("problem reading file {}: {source}", path.display())]
    FileRead {
        /// The file we couldn't access.
        path: PathBuf,
        /// The reason why we couldn't access it.
        source: Box<Error>,
    },

    /// Could not fetch the instance identity document.
    #[non_exhaustive]
    #[error("couldn't read PKCS7 identity document from {url}: {source}")]
    IdentityDocument {
        /// The metadata URL we queried.
        url: reqwest::Url,
        /// The reason why we couldn't fetch it.
        source: Box<Error>,
    },

    /// We encountered an invalid URL.
    #[non_exhaustive]
    #[error("invalid URL {url:?}")]
    InvalidUrl {
        /// The invalid URL.
        url: String,
    },

    /// An export spec could not be parsed.
    #[non_exhaustive]
    #[error("invalid export {input:?}, expected NAME=secret.field")]
    InvalidExportSpec {
        /// The input we couldn't parse.
        input: String,
    },

    /// An error occurred doing I/O.
    #[non_exhaustive]
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),

    /// We failed to parse JSON data.
    #[non_exhaustive]
    #[error("could not parse JSON: {0}")]
    Json(#[source] serde_json::Error),

    /// Logging into Vault failed.
    #[non_exhaustive]
    #[error("login failed: {source}")]
    Login {
        /// The reason why the login failed.
        source: Box<Error>,
    },

    /// Secret does not have value for specified key.
    #[non_exhaustive]
    #[error("the secret '{secret}' does not have a value for the key '{key}'")]
    MissingKeyInSecret {
        /// The name of the secret.
        secret: String,
        /// The key for which we have no value.
        key: String,
    },

    /// An export refers to a secret that was not requested.
    #[non_exhaustive]
    #[error("the secret '{secret}' was not fetched (add it to --secrets)")]
    MissingSecret {
        /// The path of the secret.
        secret: String,
    },

    /// Cannot get either `VAULT_TOKEN` or `~/.vault-token`.
    #[error("cannot get VAULT_TOKEN or ~/.vault-token: {0}")]
    MissingVaultToken(Box<Error>),

    /// Can't find home directory.
    #[error("can't find home directory")]
    NoHomeDirectory,

    /// `--nonce-filename` wasn't given.
    #[error("can't read nonce: no --nonce-filename specified")]
    NoNonceFilename,

    /// `--secrets` was empty.
    #[error("no secrets specified")]
    NoSecrets,

    /// A secret field holds an object or array, which can't be exported.
    #[non_exhaustive]
    #[error("the key '{key}' of secret '{secret}' is not a string, number or boolean")]
    NotScalar {
        /// The name of the secret.
        secret: String,
        /// The key holding a nested value.
        key: String,
    },

    /// An unspecified kind of error occurred.
    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync + 'static>),

    /// Reading a secret failed.
    #[non_exhaustive]
    #[error("failed to read secret '{path}': {source}")]
    SecretRead {
        /// The path of the secret.
        path: String,
        /// The reason why we couldn't read it.
        source: Box<Error>,
    },

    /// Unexpected HTTP status.
    #[non_exhaustive]
    #[error("unexpected HTTP status: {status} ({body})")]
    UnexpectedHttpStatus {
        /// The status we received.
        status: reqwest::StatusCode,
        /// The HTTP body we received.
        body: String,
    },

    /// We failed to parse a URL.
    #[error("could not parse URL: {0}")]
    UnparseableUrl(#[source] url::ParseError),

    /// Could not access URL.
    #[non_exhaustive]
    #[error("could not access URL '{url}': {source}")]
    Url {
        /// The URL we couldn't access.
        url: reqwest::Url,
        /// The reason we couldn't access it.
        source: Box<Error>,
    },
}

impl Error {
    /// The process exit status for this error.
    ///
    /// Problems preparing the login or the client exit with 1. Missing
    /// input, failed logins, failed reads and unresolvable exports exit
    /// with 2.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::FileRead { .. }
            | Error::IdentityDocument { .. }
            | Error::InvalidUrl { .. }
            | Error::MissingVaultToken(_)
            | Error::NoHomeDirectory
            | Error::NoNonceFilename
            | Error::UnparseableUrl(_) => 1,
            _ => 2,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::UnparseableUrl(err)
    }
}
