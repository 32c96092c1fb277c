use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379/0";
pub const DEFAULT_ENVIRONMENT: &str = "development";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
    #[error("read env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

/// Process settings, built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub redis_url: String,
    pub environment: String,
    pub debug: bool,
    pub host: String,
    pub port: u16,
}

impl Settings {
    /// Location of the optional `.env` file, fixed relative to the crate root.
    pub fn env_file() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join(".env")
    }

    /// Process environment first, then the `.env` file if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let file = read_env_file(&Self::env_file())?;
        Self::from_sources(|key| std::env::var(key).ok(), &file)
    }

    /// Merge an environment lookup with env-file values. Both match keys case-insensitively;
    /// the environment wins.
    pub fn from_sources<F>(env: F, file: &HashMap<String, String>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup(|key| {
            let lower = key.to_ascii_lowercase();
            env(key)
                .or_else(|| env(&lower))
                .or_else(|| file.get(&lower).cloned())
        })
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // A blank URL can never connect; treat it as unset.
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let redis_url = lookup("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.into());
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| DEFAULT_ENVIRONMENT.into());
        let debug = match lookup("DEBUG") {
            Some(v) => parse_bool("DEBUG", &v)?,
            None => false,
        };
        let host = lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match lookup("APP_PORT") {
            Some(v) => v.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                key: "APP_PORT",
                value: v,
            })?,
            None => 8080,
        };

        Ok(Self {
            database_url,
            redis_url,
            environment,
            debug,
            host,
            port,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

// Keys are lowercased; lookups against the file ignore case.
fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) if e.not_found() => return Ok(HashMap::new()),
        Err(source) => {
            return Err(ConfigError::EnvFile {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut vars = HashMap::new();
    for item in iter {
        let (key, value) = item.map_err(|source| ConfigError::EnvFile {
            path: path.to_path_buf(),
            source,
        })?;
        vars.insert(key.to_ascii_lowercase(), value);
    }
    Ok(vars)
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let err = Settings::from_lookup(lookup_from(&[("DEBUG", "true")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn blank_database_url_counts_as_missing() {
        let err = Settings::from_lookup(lookup_from(&[("DATABASE_URL", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let settings =
            Settings::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost/app")]))
                .expect("settings");
        assert_eq!(settings.database_url, "postgres://localhost/app");
        assert_eq!(settings.redis_url, "redis://localhost:6379/0");
        assert_eq!(settings.environment, "development");
        assert!(!settings.debug);
        assert_eq!(settings.addr().unwrap().to_string(), "0.0.0.0:8080");
        assert!(!settings.is_production());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db/app"),
            ("REDIS_URL", "redis://cache:6379/1"),
            ("ENVIRONMENT", "Production"),
            ("DEBUG", "Yes"),
            ("APP_HOST", "127.0.0.1"),
            ("APP_PORT", "9000"),
        ]))
        .expect("settings");
        assert_eq!(settings.redis_url, "redis://cache:6379/1");
        assert!(settings.debug);
        assert!(settings.is_production());
        assert_eq!(settings.addr().unwrap().to_string(), "127.0.0.1:9000");
    }

    #[test]
    fn debug_flag_rejects_garbage() {
        let err = Settings::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db/app"),
            ("DEBUG", "maybe"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "DEBUG", .. }));
    }

    #[test]
    fn port_must_be_numeric() {
        let err = Settings::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db/app"),
            ("APP_PORT", "http"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("APP_PORT"));
    }

    fn write_env_file(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(".env");
        std::fs::write(&path, contents).expect("write env file");
        (dir, path)
    }

    #[test]
    fn env_file_fills_in_what_the_environment_lacks() {
        let (_dir, path) = write_env_file(
            "database_url=postgres://file/db\nDEBUG=on\nREDIS_URL=redis://file\n",
        );
        let file = read_env_file(&path).expect("read env file");

        let settings =
            Settings::from_sources(lookup_from(&[("REDIS_URL", "redis://env")]), &file)
                .expect("settings");
        assert_eq!(settings.database_url, "postgres://file/db");
        assert_eq!(settings.redis_url, "redis://env");
        assert!(settings.debug);
        assert_eq!(settings.environment, "development");
    }

    #[test]
    fn environment_beats_env_file() {
        let (_dir, path) = write_env_file("DATABASE_URL=postgres://file/db\nENVIRONMENT=staging\n");
        let file = read_env_file(&path).expect("read env file");

        let settings = Settings::from_sources(
            lookup_from(&[("DATABASE_URL", "postgres://env/db")]),
            &file,
        )
        .expect("settings");
        assert_eq!(settings.database_url, "postgres://env/db");
        assert_eq!(settings.environment, "staging");
    }

    #[test]
    fn lowercase_environment_keys_are_accepted() {
        let settings = Settings::from_sources(
            lookup_from(&[("database_url", "postgres://env/db"), ("debug", "1")]),
            &HashMap::new(),
        )
        .expect("settings");
        assert_eq!(settings.database_url, "postgres://env/db");
        assert!(settings.debug);
    }

    #[test]
    fn missing_everywhere_is_still_an_error() {
        let (_dir, path) = write_env_file("REDIS_URL=redis://file\n");
        let file = read_env_file(&path).expect("read env file");
        let err = Settings::from_sources(lookup_from(&[]), &file).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn missing_env_file_is_not_an_error() {
        let vars = read_env_file(Path::new("/nonexistent/dir/.env")).expect("no file is fine");
        assert!(vars.is_empty());
    }
}
