use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to parse {name} as boolean: {value}")]
    ParseBool { name: String, value: String },
}

/// Crawler configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Target
    pub user_id: u64,
    pub cookie: String,

    // Selection
    pub only_original: bool,
    pub order: TimelineOrder,

    // Media
    pub pic_download: bool,
    pub video_download: bool,

    // Output
    pub output_dir: PathBuf,
    pub output_charset: String,

    // Origin
    pub base_url: String,
    pub video_host: String,
    pub request_timeout: Duration,

    // Pacing
    pub rate_limit_step: Duration,
    pub rate_limit_max_retries: Option<u32>,
    pub flush_every_pages: usize,
    pub pause_min: Duration,
    pub pause_max: Duration,
}

/// Direction in which the timeline is traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineOrder {
    /// Oldest post first: pages are walked from the last one backwards and
    /// each page's entries are reversed.
    Ascending,
    /// Newest post first, the order the listing renders.
    Descending,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let rate_limit_max_retries = match optional_env("RATE_LIMIT_MAX_RETRIES") {
            Some(_) => Some(parse_env_u32("RATE_LIMIT_MAX_RETRIES", 0)?),
            None => None,
        };

        Ok(Self {
            // Target
            user_id: parse_required_u64("WEIBO_USER_ID")?,
            cookie: required_env("WEIBO_COOKIE")?,

            // Selection
            only_original: parse_env_bool("ONLY_ORIGINAL", false)?,
            order: parse_order(&env_or_default("TIMELINE_ORDER", "time desc"))?,

            // Media
            pic_download: parse_env_bool("PIC_DOWNLOAD", false)?,
            video_download: parse_env_bool("VIDEO_DOWNLOAD", false)?,

            // Output
            output_dir: PathBuf::from(env_or_default("OUTPUT_DIR", "./weibo")),
            output_charset: env_or_default("OUTPUT_CHARSET", "utf-8"),

            // Origin
            base_url: env_or_default("WEIBO_BASE_URL", "https://weibo.cn"),
            video_host: env_or_default("VIDEO_HOST", "m.weibo.cn"),
            request_timeout: Duration::from_secs(parse_env_u64("REQUEST_TIMEOUT_SECS", 30)?),

            // Pacing
            rate_limit_step: Duration::from_secs(parse_env_u64("RATE_LIMIT_STEP_SECS", 10)?),
            rate_limit_max_retries,
            flush_every_pages: parse_env_usize("FLUSH_EVERY_PAGES", 20)?,
            pause_min: Duration::from_secs(parse_env_u64("PAUSE_MIN_SECS", 6)?),
            pause_max: Duration::from_secs(parse_env_u64("PAUSE_MAX_SECS", 10)?),
        })
    }

    /// Configuration suitable for tests: no real cookie, zero pauses.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            user_id: 1_669_879_400,
            cookie: "SUB=test-cookie".to_string(),
            only_original: false,
            order: TimelineOrder::Descending,
            pic_download: false,
            video_download: false,
            output_dir: PathBuf::from("./weibo"),
            output_charset: "utf-8".to_string(),
            base_url: "https://weibo.cn".to_string(),
            video_host: "m.weibo.cn".to_string(),
            request_timeout: Duration::from_secs(10),
            rate_limit_step: Duration::from_secs(10),
            rate_limit_max_retries: None,
            flush_every_pages: 20,
            pause_min: Duration::ZERO,
            pause_max: Duration::ZERO,
        }
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_id == 0 {
            return Err(ConfigError::InvalidValue {
                name: "WEIBO_USER_ID".to_string(),
                message: "must be a positive number".to_string(),
            });
        }
        if self.cookie.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "WEIBO_COOKIE".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if encoding_rs::Encoding::for_label(self.output_charset.as_bytes()).is_none() {
            return Err(ConfigError::InvalidValue {
                name: "OUTPUT_CHARSET".to_string(),
                message: format!("unknown charset label '{}'", self.output_charset),
            });
        }
        if self.flush_every_pages == 0 {
            return Err(ConfigError::InvalidValue {
                name: "FLUSH_EVERY_PAGES".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.pause_min > self.pause_max {
            return Err(ConfigError::InvalidValue {
                name: "PAUSE_MIN_SECS".to_string(),
                message: "cannot exceed PAUSE_MAX_SECS".to_string(),
            });
        }
        if url::Url::parse(&self.base_url).is_err() {
            return Err(ConfigError::InvalidValue {
                name: "WEIBO_BASE_URL".to_string(),
                message: format!("'{}' is not an absolute URL", self.base_url),
            });
        }
        Ok(())
    }
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_required_u64(name: &str) -> Result<u64, ConfigError> {
    required_env(name)?
        .trim()
        .parse()
        .map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        })
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_usize(name: &str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseBool {
                name: name.to_string(),
                value: val,
            }),
        },
        _ => Ok(default),
    }
}

fn parse_order(value: &str) -> Result<TimelineOrder, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "time asc" | "asc" => Ok(TimelineOrder::Ascending),
        "time desc" | "desc" => Ok(TimelineOrder::Descending),
        _ => Err(ConfigError::InvalidValue {
            name: "TIMELINE_ORDER".to_string(),
            message: format!("must be 'time asc' or 'time desc', got '{value}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_order() {
        assert_eq!(parse_order("time asc").unwrap(), TimelineOrder::Ascending);
        assert_eq!(parse_order("ASC").unwrap(), TimelineOrder::Ascending);
        assert_eq!(parse_order("time desc").unwrap(), TimelineOrder::Descending);
        assert_eq!(parse_order(" desc ").unwrap(), TimelineOrder::Descending);
        assert!(parse_order("newest").is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_env_bool("NONEXISTENT_VAR", true).unwrap());
        assert!(!parse_env_bool("NONEXISTENT_VAR", false).unwrap());
    }

    #[test]
    fn test_testing_config_is_valid() {
        assert!(Config::for_testing().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            cookie: "  ".to_string(),
            ..Config::for_testing()
        };
        assert!(config.validate().is_err());

        let config = Config {
            output_charset: "klingon".to_string(),
            ..Config::for_testing()
        };
        assert!(config.validate().is_err());

        let config = Config {
            flush_every_pages: 0,
            ..Config::for_testing()
        };
        assert!(config.validate().is_err());

        let config = Config {
            pause_min: Duration::from_secs(11),
            pause_max: Duration::from_secs(10),
            ..Config::for_testing()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env() {
        std::env::set_var("WEIBO_USER_ID", "1669879400");
        std::env::set_var("WEIBO_COOKIE", "SUB=abc");
        std::env::set_var("TIMELINE_ORDER", "time asc");
        std::env::set_var("ONLY_ORIGINAL", "1");
        std::env::set_var("RATE_LIMIT_MAX_RETRIES", "7");

        let config = Config::from_env().unwrap();
        assert_eq!(config.user_id, 1_669_879_400);
        assert_eq!(config.cookie, "SUB=abc");
        assert_eq!(config.order, TimelineOrder::Ascending);
        assert!(config.only_original);
        assert_eq!(config.rate_limit_max_retries, Some(7));
        assert_eq!(config.flush_every_pages, 20);
        assert_eq!(config.rate_limit_step, Duration::from_secs(10));

        std::env::remove_var("TIMELINE_ORDER");
        std::env::remove_var("ONLY_ORIGINAL");
        std::env::remove_var("RATE_LIMIT_MAX_RETRIES");
        std::env::remove_var("WEIBO_USER_ID");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::MissingEnvVar(name)) if name == "WEIBO_USER_ID"
        ));
        std::env::remove_var("WEIBO_COOKIE");
    }
}
