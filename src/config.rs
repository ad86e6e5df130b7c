//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;

use crate::error::ConfigError;
use crate::plans::DigestTemplate;

/// Runtime configuration for the digest bot.
#[derive(Debug, Clone)]
pub struct DigestConfig {
    /// Plan document on disk.
    pub plans_path: PathBuf,
    /// Local wall-clock time of the daily pass.
    pub fire_at: NaiveTime,
    /// Interval between passes after the first.
    pub tick_interval: Duration,
    pub template: DigestTemplate,
    /// Telegram bot token; `None` falls back to the CLI channel.
    pub telegram_token: Option<String>,
    pub telegram_allowed_users: Vec<String>,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            plans_path: PathBuf::from("plans.json"),
            fire_at: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            tick_interval: Duration::from_secs(24 * 60 * 60),
            template: DigestTemplate::default(),
            telegram_token: None,
            telegram_allowed_users: vec!["*".to_string()],
        }
    }
}

impl DigestConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let plans_path = lookup("PLANS_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.plans_path);

        let fire_at = match lookup("PLANS_FIRE_TIME") {
            Some(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|e| {
                ConfigError::InvalidValue {
                    key: "PLANS_FIRE_TIME".into(),
                    message: format!("'{raw}' is not HH:MM ({e})"),
                }
            })?,
            None => defaults.fire_at,
        };

        let tick_interval = match lookup("PLANS_TICK_INTERVAL_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "PLANS_TICK_INTERVAL_SECS".into(),
                        message: format!("'{raw}' is not a positive number of seconds"),
                    });
                }
            },
            None => defaults.tick_interval,
        };

        let template = DigestTemplate {
            header: lookup("PLANS_DIGEST_HEADER").unwrap_or(defaults.template.header),
            empty: lookup("PLANS_DIGEST_EMPTY").unwrap_or(defaults.template.empty),
        };

        let telegram_token = lookup("TELEGRAM_BOT_TOKEN").filter(|t| !t.trim().is_empty());

        let telegram_allowed_users: Vec<String> = lookup("TELEGRAM_ALLOWED_USERS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            plans_path,
            fire_at,
            tick_interval,
            template,
            telegram_token,
            telegram_allowed_users,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = DigestConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.plans_path, PathBuf::from("plans.json"));
        assert_eq!(config.fire_at, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(config.tick_interval, Duration::from_secs(86_400));
        assert_eq!(config.template, DigestTemplate::default());
        assert!(config.telegram_token.is_none());
        assert_eq!(config.telegram_allowed_users, vec!["*"]);
    }

    #[test]
    fn overrides_applied() {
        let config = DigestConfig::from_lookup(lookup(&[
            ("PLANS_FILE", "/var/lib/plans.json"),
            ("PLANS_FIRE_TIME", "06:30"),
            ("PLANS_TICK_INTERVAL_SECS", "3600"),
            ("PLANS_DIGEST_HEADER", "Today:"),
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_ALLOWED_USERS", "alice, 555 ,"),
        ]))
        .unwrap();

        assert_eq!(config.plans_path, PathBuf::from("/var/lib/plans.json"));
        assert_eq!(config.fire_at, NaiveTime::from_hms_opt(6, 30, 0).unwrap());
        assert_eq!(config.tick_interval, Duration::from_secs(3600));
        assert_eq!(config.template.header, "Today:");
        assert_eq!(config.template.empty, "No plans for today");
        assert_eq!(config.telegram_token.as_deref(), Some("123:abc"));
        assert_eq!(config.telegram_allowed_users, vec!["alice", "555"]);
    }

    #[test]
    fn blank_token_means_no_telegram() {
        let config = DigestConfig::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "  ")])).unwrap();
        assert!(config.telegram_token.is_none());
    }

    #[test]
    fn bad_fire_time_rejected() {
        let err = DigestConfig::from_lookup(lookup(&[("PLANS_FIRE_TIME", "8am")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "PLANS_FIRE_TIME"));
    }

    #[test]
    fn zero_tick_interval_rejected() {
        for raw in ["0", "-5", "daily"] {
            let err = DigestConfig::from_lookup(lookup(&[("PLANS_TICK_INTERVAL_SECS", raw)]))
                .unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "PLANS_TICK_INTERVAL_SECS"),
                "{raw}"
            );
        }
    }
}
