use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub gemini: GeminiConfig,
    pub seed_defaults: bool,
    pub exercises_import_path: Option<PathBuf>,
}

/// Settings for the external text-generation endpoint.
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_GEMINI_API_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        let timeout_secs = env::var("GENERATOR_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:fitos.db?mode=rwc".to_string()),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .unwrap_or(3001),
            gemini: GeminiConfig {
                api_key: env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
                api_url: env::var("GEMINI_API_URL")
                    .unwrap_or_else(|_| DEFAULT_GEMINI_API_URL.to_string()),
                model: env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
                timeout: Duration::from_secs(timeout_secs),
            },
            seed_defaults: env::var("SEED_DEFAULTS")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
            exercises_import_path: env::var("EXERCISES_IMPORT_PATH")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag("1"));
        assert!(parse_flag("yes"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(" OFF "));
        assert!(!parse_flag("0"));
    }

    #[test]
    fn test_server_addr() {
        let config = Config {
            database_url: ":memory:".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8080,
            gemini: GeminiConfig::default(),
            seed_defaults: false,
            exercises_import_path: None,
        };
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
    }
}
