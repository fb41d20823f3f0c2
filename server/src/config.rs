//! Process configuration: environment variables read once at startup into a
//! typed `Config`, following the enumerated keys.

use std::env;

const DEFAULT_ENGINE_DEPTH: u8 = 18;
const DEFAULT_ENGINE_TIME_LIMIT_MS: u64 = 1_000;
const IMPORTS_QUEUE_CONCURRENCY: usize = 1;
const DEFAULT_ANALYSIS_QUEUE_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoachProvider {
    ExternalApi,
    LocalLlm,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub engine_path: String,
    pub engine_depth: u8,
    pub engine_time_limit_ms: u64,

    pub broker_url: String,
    pub database_url: String,

    /// Fixed at 1 to serialize provider imports; rejected if the
    /// environment tries to override it to anything else.
    pub imports_queue_concurrency: usize,
    pub analysis_queue_concurrency: usize,

    pub coach_enabled: bool,
    pub coach_provider: CoachProvider,
    pub coach_endpoint: Option<String>,
    pub coach_model: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
    #[error("IMPORTS_QUEUE_CONCURRENCY must be 1, got {0}")]
    ImportsConcurrencyOverridden(usize),
}

impl Config {
    /// Load `.env` (if present), then read the enumerated environment
    /// variables. Fails hard if `DATABASE_URL` or `ENGINE_PATH` is absent.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let database_url = required("DATABASE_URL")?;
        let engine_path = required("ENGINE_PATH")?;

        let engine_depth = optional_parse("ENGINE_DEPTH", DEFAULT_ENGINE_DEPTH)?;
        let engine_time_limit_ms =
            optional_parse("ENGINE_TIME_LIMIT_MS", DEFAULT_ENGINE_TIME_LIMIT_MS)?;

        let broker_url =
            env::var("BROKER_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let imports_queue_concurrency = match env::var("IMPORTS_QUEUE_CONCURRENCY") {
            Ok(raw) => {
                let parsed: usize = raw.parse().map_err(|_| ConfigError::Invalid {
                    key: "IMPORTS_QUEUE_CONCURRENCY",
                    value: raw.clone(),
                })?;
                if parsed != IMPORTS_QUEUE_CONCURRENCY {
                    return Err(ConfigError::ImportsConcurrencyOverridden(parsed));
                }
                parsed
            }
            Err(_) => IMPORTS_QUEUE_CONCURRENCY,
        };

        let analysis_queue_concurrency = optional_parse(
            "ANALYSIS_QUEUE_CONCURRENCY",
            DEFAULT_ANALYSIS_QUEUE_CONCURRENCY,
        )?;

        let coach_enabled = env::var("COACH_ENABLED")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let coach_provider = match env::var("COACH_PROVIDER").as_deref() {
            Ok("local_llm") => CoachProvider::LocalLlm,
            _ => CoachProvider::ExternalApi,
        };
        let coach_endpoint = env::var("COACH_ENDPOINT").ok();
        let coach_model = env::var("COACH_MODEL").ok();

        Ok(Config {
            engine_path,
            engine_depth,
            engine_time_limit_ms,
            broker_url,
            database_url,
            imports_queue_concurrency,
            analysis_queue_concurrency,
            coach_enabled,
            coach_provider,
            coach_endpoint,
            coach_model,
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn optional_parse<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            key,
            value: raw.clone(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for key in [
            "DATABASE_URL",
            "ENGINE_PATH",
            "ENGINE_DEPTH",
            "ENGINE_TIME_LIMIT_MS",
            "BROKER_URL",
            "IMPORTS_QUEUE_CONCURRENCY",
            "ANALYSIS_QUEUE_CONCURRENCY",
            "COACH_ENABLED",
            "COACH_PROVIDER",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn fails_without_database_url() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("ENGINE_PATH", "/usr/bin/stockfish");
        assert!(matches!(Config::load(), Err(ConfigError::Missing("DATABASE_URL"))));
        clear_env();
    }

    #[test]
    fn rejects_imports_concurrency_override() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("DATABASE_URL", "sqlite::memory:");
        env::set_var("ENGINE_PATH", "/usr/bin/stockfish");
        env::set_var("IMPORTS_QUEUE_CONCURRENCY", "3");
        assert!(matches!(
            Config::load(),
            Err(ConfigError::ImportsConcurrencyOverridden(3))
        ));
        clear_env();
    }

    #[test]
    fn defaults_apply_when_optional_keys_absent() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("DATABASE_URL", "sqlite::memory:");
        env::set_var("ENGINE_PATH", "/usr/bin/stockfish");
        let config = Config::load().unwrap();
        assert_eq!(config.engine_depth, DEFAULT_ENGINE_DEPTH);
        assert_eq!(config.imports_queue_concurrency, 1);
        assert_eq!(
            config.analysis_queue_concurrency,
            DEFAULT_ANALYSIS_QUEUE_CONCURRENCY
        );
        clear_env();
    }
}
