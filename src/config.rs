use std::env;

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_PAGE_SIZE: u32 = 20;
const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value `{value}` for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Backend {
    Postgres { database_url: String },
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingConfig {
    pub default_size: u32,
    pub max_size: u32,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_size: DEFAULT_PAGE_SIZE,
            max_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub backend: Backend,
    pub bind_address: String,
    pub max_connections: u32,
    pub paging: PagingConfig,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let backend = match lookup("STORE_BACKEND").as_deref().unwrap_or("postgres") {
            "postgres" => Backend::Postgres {
                database_url: lookup("DATABASE_URL")
                    .filter(|url| !url.is_empty())
                    .ok_or(ConfigError::Missing("DATABASE_URL"))?,
            },
            "memory" => Backend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    key: "STORE_BACKEND",
                    value: other.to_owned(),
                })
            }
        };

        let paging = PagingConfig {
            default_size: parse_positive(&lookup, "DEFAULT_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
            max_size: parse_positive(&lookup, "MAX_PAGE_SIZE", DEFAULT_MAX_PAGE_SIZE)?,
        };
        if paging.default_size > paging.max_size {
            return Err(ConfigError::Invalid {
                key: "DEFAULT_PAGE_SIZE",
                value: paging.default_size.to_string(),
            });
        }

        Ok(Self {
            backend,
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_owned()),
            max_connections: parse_positive(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_MAX_CONNECTIONS,
            )?,
            paging,
        })
    }
}

fn parse_positive(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u32,
) -> Result<u32, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<u32>() {
            Ok(parsed) if parsed > 0 => Ok(parsed),
            _ => Err(ConfigError::Invalid { key, value }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_with_database_url() {
        let settings = settings(&[("DATABASE_URL", "postgres://localhost/staff")]).unwrap();
        assert_eq!(
            settings.backend,
            Backend::Postgres {
                database_url: "postgres://localhost/staff".to_owned()
            }
        );
        assert_eq!(settings.bind_address, "127.0.0.1:8080");
        assert_eq!(settings.max_connections, 5);
        assert_eq!(settings.paging, PagingConfig::default());
    }

    #[test]
    fn postgres_requires_database_url() {
        assert_eq!(settings(&[]), Err(ConfigError::Missing("DATABASE_URL")));
        assert_eq!(
            settings(&[("DATABASE_URL", "")]),
            Err(ConfigError::Missing("DATABASE_URL"))
        );
    }

    #[test]
    fn memory_backend_needs_no_url() {
        let settings = settings(&[("STORE_BACKEND", "memory"), ("BIND_ADDRESS", "0.0.0.0:9000")]).unwrap();
        assert_eq!(settings.backend, Backend::Memory);
        assert_eq!(settings.bind_address, "0.0.0.0:9000");
    }

    #[test]
    fn rejects_unknown_backend() {
        assert!(matches!(
            settings(&[("STORE_BACKEND", "mysql")]),
            Err(ConfigError::Invalid { key: "STORE_BACKEND", .. })
        ));
    }

    #[test]
    fn rejects_bad_numbers() {
        for (key, value) in [
            ("MAX_PAGE_SIZE", "0"),
            ("MAX_PAGE_SIZE", "lots"),
            ("DATABASE_MAX_CONNECTIONS", "-1"),
            ("DEFAULT_PAGE_SIZE", "500"),
        ] {
            let result = settings(&[("STORE_BACKEND", "memory"), (key, value)]);
            assert!(result.is_err(), "{}={} accepted", key, value);
        }
    }
}
