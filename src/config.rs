//! What to fetch and what to export, independent of how we were invoked.

use crate::errors::*;
use crate::export::{ExportMode, ExportSpec};

/// Everything needed to turn secrets into shell exports.
#[derive(Clone, Debug)]
pub struct Config {
    /// Secret paths to fetch, in order.
    pub secrets: Vec<String>,
    /// Exports to print once every secret has been fetched.
    pub exports: Vec<ExportSpec>,
    /// How to treat variables which are already set.
    pub mode: ExportMode,
}

impl Config {
    /// Build a config from raw comma-split values. Blank entries are
    /// ignored, and at least one secret is required.
    pub fn new<S, E>(secrets: S, exports: E, mode: ExportMode) -> Result<Config>
    where
        S: IntoIterator,
        S::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let secrets = secrets
            .into_iter()
            .map(|s| s.as_ref().trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();
        if secrets.is_empty() {
            return Err(Error::NoSecrets);
        }
        let exports = exports
            .into_iter()
            .filter(|e| !e.as_ref().trim().is_empty())
            .map(|e| e.as_ref().parse())
            .collect::<Result<Vec<ExportSpec>>>()?;
        Ok(Config {
            secrets,
            exports,
            mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_secrets() {
        let none: Vec<String> = vec![];
        assert!(matches!(
            Config::new(&none, &none, ExportMode::Always),
            Err(Error::NoSecrets)
        ));
        assert!(matches!(
            Config::new(&[""], &["DB_USER=db.user"], ExportMode::Always),
            Err(Error::NoSecrets)
        ));
    }

    #[test]
    fn test_blank_entries_are_skipped() {
        let config = Config::new(&["db", "", " cache "], &["", "DB_USER=db.user"], ExportMode::SkipIfSet)
            .unwrap();
        assert_eq!(config.secrets, vec!["db".to_owned(), "cache".to_owned()]);
        assert_eq!(config.exports.len(), 1);
        assert_eq!(config.exports[0].name, "DB_USER");
        assert_eq!(config.mode, ExportMode::SkipIfSet);
    }

    #[test]
    fn test_bad_export() {
        match Config::new(&["db"], &["DB_USER"], ExportMode::Always) {
            Err(err @ Error::InvalidExportSpec { .. }) => assert_eq!(err.exit_code(), 2),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
