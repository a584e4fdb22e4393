use shuttle_runtime::SecretStore;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Runtime settings read from Shuttle secrets (`Secrets.toml` locally)
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// `DB_MAX_CONNECTIONS`
    pub db_max_connections: u32,
    /// `RUN_MIGRATIONS`
    pub run_migrations: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_max_connections: DEFAULT_MAX_CONNECTIONS,
            run_migrations: true,
        }
    }
}

impl AppConfig {
    pub fn from_secrets(secrets: &SecretStore) -> Self {
        Self::from_lookup(|key| secrets.get(key))
    }

    /// Unset keys keep their default; unparsable ones are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup("DB_MAX_CONNECTIONS") {
            match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => config.db_max_connections = n,
                _ => tracing::warn!(
                    "Ignoring DB_MAX_CONNECTIONS={:?}, using {}",
                    raw,
                    config.db_max_connections
                ),
            }
        }

        if let Some(raw) = lookup("RUN_MIGRATIONS") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => config.run_migrations = true,
                "0" | "false" | "no" => config.run_migrations = false,
                _ => tracing::warn!("Ignoring RUN_MIGRATIONS={:?}", raw),
            }
        }

        config
    }
}
