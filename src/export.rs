//! Map environment variable names onto fields of fetched secrets, and
//! format them as shell `export` statements.
//!
//! An export spec looks like `DB_USER=secret/db.user`: the environment
//! variable `DB_USER` gets the `user` field of the secret at `secret/db`.

use regex::Regex;
use std::fmt;
use std::str::FromStr;

use crate::envvar::Environment;
use crate::errors::*;
use crate::secret::SecretCollection;

/// Where to find the value of one environment variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportSpec {
    /// The environment variable to export.
    pub name: String,
    /// The path of the secret holding the value.
    pub secret: String,
    /// The field within that secret.
    pub field: String,
}

impl FromStr for ExportSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<ExportSpec> {
        lazy_static! {
            // `NAME=path.field`. The path ends at the first `.`, so fields
            // may contain dots but paths may not.
            static ref RE: Regex = Regex::new(
                r"^(?P<name>[A-Za-z_][A-Za-z0-9_]*)=(?P<secret>[^.]+)\.(?P<field>.+)$"
            )
            .unwrap();
        }
        let caps = RE.captures(s.trim()).ok_or_else(|| Error::InvalidExportSpec {
            input: s.to_owned(),
        })?;
        Ok(ExportSpec {
            name: caps["name"].to_owned(),
            secret: caps["secret"].to_owned(),
            field: caps["field"].to_owned(),
        })
    }
}

impl fmt::Display for ExportSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}.{}", self.name, self.secret, self.field)
    }
}

/// What to do when the variable we're about to export is already set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportMode {
    /// Export it anyway.
    Always,
    /// Leave it alone and say so in a shell comment.
    SkipIfSet,
}

/// One line of shell output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportLine {
    /// `export NAME=value`
    Export {
        /// The environment variable.
        name: String,
        /// Its new value.
        value: String,
    },
    /// `# NAME is already set, ignoring`
    AlreadySet {
        /// The environment variable we skipped.
        name: String,
    },
}

impl fmt::Display for ExportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportLine::Export { name, value } => write!(f, "export {}={}", name, value),
            ExportLine::AlreadySet { name } => write!(f, "# {} is already set, ignoring", name),
        }
    }
}

/// Resolve a single export against the fetched secrets.
pub fn render_export(
    spec: &ExportSpec,
    secrets: &SecretCollection,
    mode: ExportMode,
    env: &dyn Environment,
) -> Result<ExportLine> {
    if mode == ExportMode::SkipIfSet && env.is_set(&spec.name) {
        debug!("not exporting {}, it's already set", spec.name);
        return Ok(ExportLine::AlreadySet {
            name: spec.name.clone(),
        });
    }
    let value = secrets.field(&spec.secret, &spec.field)?;
    Ok(ExportLine::Export {
        name: spec.name.clone(),
        value: value.to_string(),
    })
}

/// Resolve every export. Nothing is returned unless all of them resolve.
pub fn render_exports(
    specs: &[ExportSpec],
    secrets: &SecretCollection,
    mode: ExportMode,
    env: &dyn Environment,
) -> Result<Vec<ExportLine>> {
    specs
        .iter()
        .map(|spec| render_export(spec, secrets, mode, env))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::Secret;
    use std::collections::BTreeMap;

    fn secrets() -> SecretCollection {
        let mut db = Secret::new();
        db.insert("user".to_owned(), "alice".into());
        db.insert("port".to_owned(), 5432i64.into());
        let mut collection = SecretCollection::new();
        collection.insert("db", db);
        collection
    }

    fn spec(s: &str) -> ExportSpec {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            spec("DB_USER=secret/db.user"),
            ExportSpec {
                name: "DB_USER".to_owned(),
                secret: "secret/db".to_owned(),
                field: "user".to_owned(),
            }
        );
        assert_eq!(spec("TLS=certs.tls.key").field, "tls.key");
        assert_eq!(spec("X=a=b.c").secret, "a=b");
        assert_eq!(spec("DB_USER=db.user").to_string(), "DB_USER=db.user");
    }

    #[test]
    fn test_parse_errors() {
        for input in &["", "DB_USER", "DB_USER=db", "DB_USER=.user", "DB_USER=db.", "=db.user", "1X=db.user"] {
            match input.parse::<ExportSpec>() {
                Err(Error::InvalidExportSpec { input: got }) => assert_eq!(got, *input),
                other => panic!("{:?} parsed as {:?}", input, other),
            }
        }
    }

    #[test]
    fn exports_string_and_number_fields() {
        let env: BTreeMap<String, String> = BTreeMap::new();
        let line = render_export(&spec("DB_USER=db.user"), &secrets(), ExportMode::Always, &env).unwrap();
        assert_eq!(line.to_string(), "export DB_USER=alice");
        let line = render_export(&spec("DB_PORT=db.port"), &secrets(), ExportMode::Always, &env).unwrap();
        assert_eq!(line.to_string(), "export DB_PORT=5432");
    }

    #[test]
    fn skips_variables_that_are_already_set() {
        let mut env = BTreeMap::new();
        env.insert("DB_USER".to_owned(), "bob".to_owned());
        let line = render_export(&spec("DB_USER=db.user"), &secrets(), ExportMode::SkipIfSet, &env).unwrap();
        assert_eq!(line.to_string(), "# DB_USER is already set, ignoring");

        // Without skipping, the existing value is overridden.
        let line = render_export(&spec("DB_USER=db.user"), &secrets(), ExportMode::Always, &env).unwrap();
        assert_eq!(line.to_string(), "export DB_USER=alice");
    }

    #[test]
    fn empty_variables_count_as_unset() {
        let mut env = BTreeMap::new();
        env.insert("DB_USER".to_owned(), String::new());
        let line = render_export(&spec("DB_USER=db.user"), &secrets(), ExportMode::SkipIfSet, &env).unwrap();
        assert_eq!(line.to_string(), "export DB_USER=alice");
    }

    #[test]
    fn already_set_variables_need_no_secret() {
        let mut env = BTreeMap::new();
        env.insert("CACHE_URL".to_owned(), "redis://".to_owned());
        let line = render_export(&spec("CACHE_URL=cache.url"), &secrets(), ExportMode::SkipIfSet, &env).unwrap();
        assert_eq!(line, ExportLine::AlreadySet { name: "CACHE_URL".to_owned() });
    }

    #[test]
    fn one_bad_export_fails_them_all() {
        let env: BTreeMap<String, String> = BTreeMap::new();
        let specs = vec![spec("DB_USER=db.user"), spec("DB_PASS=db.password")];
        match render_exports(&specs, &secrets(), ExportMode::Always, &env) {
            Err(Error::MissingKeyInSecret { secret, key }) => {
                assert_eq!(secret, "db");
                assert_eq!(key, "password");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
