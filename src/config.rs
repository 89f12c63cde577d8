use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::filter::{ContentFilter, FilterConfig, Lexicon, Locale, TermSeverity};
use crate::moderation::{ModerationConfig, Moderator};
use crate::ratelimit::{RateLimitPolicy, RateLimiter, MAX_POLICY_DURATION};

/// Central configuration loaded from environment variables.
///
/// Every variable is optional; unset ones fall back to the policy defaults.
/// Secrets come from env vars only. The binary loads a .env file first via
/// dotenvy.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub rate_limit: RateLimitPolicy,
    pub filter: FilterConfig,
    pub moderation: ModerationConfig,
    /// Extra whitelist words layered over the built-in list
    pub extra_whitelist: Vec<String>,
    /// Extra English terms layered over the built-in lexicon
    pub extra_terms: Vec<String>,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key → value lookup. Unparsable values are
    /// errors: bad configuration should stop startup, not surface per message.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let d = RateLimitPolicy::default();
        let rate_limit = RateLimitPolicy {
            max_burst_messages: parse(&lookup, "CHATGUARD_MAX_BURST", d.max_burst_messages)?,
            rapid_threshold: parse(&lookup, "CHATGUARD_RAPID_THRESHOLD", d.rapid_threshold)?,
            rapid_window: millis(&lookup, "CHATGUARD_RAPID_WINDOW_MS", d.rapid_window)?,
            min_interval: millis(&lookup, "CHATGUARD_MIN_INTERVAL_MS", d.min_interval)?,
            cooldown: millis(&lookup, "CHATGUARD_COOLDOWN_MS", d.cooldown)?,
            history_window: millis(&lookup, "CHATGUARD_HISTORY_WINDOW_MS", d.history_window)?,
        };

        let d = FilterConfig::default();
        let filter = FilterConfig {
            min_scan_len: parse(&lookup, "CHATGUARD_MIN_SCAN_LEN", d.min_scan_len)?,
            always_pattern_pass: flag(
                &lookup,
                "CHATGUARD_ALWAYS_PATTERN_PASS",
                d.always_pattern_pass,
            )?,
            max_token_repeats: parse(&lookup, "CHATGUARD_MAX_TOKEN_REPEATS", d.max_token_repeats)?,
            repeat_min_token_len: parse(
                &lookup,
                "CHATGUARD_REPEAT_MIN_TOKEN_LEN",
                d.repeat_min_token_len,
            )?,
            max_char_run: parse(&lookup, "CHATGUARD_MAX_CHAR_RUN", d.max_char_run)?,
            placeholder: parse(&lookup, "CHATGUARD_PLACEHOLDER", d.placeholder)?,
        };

        let d = ModerationConfig::default();
        let moderation = ModerationConfig {
            remote_enabled: flag(&lookup, "CHATGUARD_REMOTE_MODERATION", d.remote_enabled)?,
            api_key: lookup("OPENAI_API_KEY").unwrap_or_default(),
            classifier_url: lookup("CHATGUARD_CLASSIFIER_URL").unwrap_or(d.classifier_url),
            classifier_model: lookup("CHATGUARD_CLASSIFIER_MODEL").unwrap_or(d.classifier_model),
            classifier_timeout: millis(
                &lookup,
                "CHATGUARD_CLASSIFIER_TIMEOUT_MS",
                d.classifier_timeout,
            )?,
            classifier_qps: parse(&lookup, "CHATGUARD_CLASSIFIER_QPS", d.classifier_qps)?,
        };

        let config = Self {
            rate_limit,
            filter,
            moderation,
            extra_whitelist: list(&lookup, "CHATGUARD_EXTRA_WHITELIST"),
            extra_terms: list(&lookup, "CHATGUARD_EXTRA_TERMS"),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject policies the components can't honor.
    pub fn validate(&self) -> Result<()> {
        if self.rate_limit.max_burst_messages == 0 {
            anyhow::bail!("CHATGUARD_MAX_BURST must be at least 1");
        }
        if self.rate_limit.min_interval.is_zero() {
            anyhow::bail!("CHATGUARD_MIN_INTERVAL_MS must be greater than 0");
        }
        if self.rate_limit.cooldown.is_zero() {
            anyhow::bail!("CHATGUARD_COOLDOWN_MS must be greater than 0");
        }
        for (key, duration) in [
            ("CHATGUARD_RAPID_WINDOW_MS", self.rate_limit.rapid_window),
            ("CHATGUARD_MIN_INTERVAL_MS", self.rate_limit.min_interval),
            ("CHATGUARD_COOLDOWN_MS", self.rate_limit.cooldown),
            ("CHATGUARD_HISTORY_WINDOW_MS", self.rate_limit.history_window),
        ] {
            if duration > MAX_POLICY_DURATION {
                anyhow::bail!(
                    "{key} must be at most {} (one day)",
                    MAX_POLICY_DURATION.as_millis()
                );
            }
        }
        let placeholder = self.filter.placeholder;
        if placeholder.is_alphanumeric() || placeholder.is_whitespace() {
            anyhow::bail!(
                "CHATGUARD_PLACEHOLDER must be a symbol, got {:?}. \
                 Letters, digits and whitespace would make masked text scannable.",
                placeholder
            );
        }
        self.require_classifier()
    }

    /// Check that remote moderation has what it needs.
    pub fn require_classifier(&self) -> Result<()> {
        if self.moderation.remote_enabled && self.moderation.api_key.is_empty() {
            anyhow::bail!(
                "CHATGUARD_REMOTE_MODERATION is on but OPENAI_API_KEY is not set.\n\
                 Add it to your .env file or turn remote moderation off."
            );
        }
        Ok(())
    }

    /// The built-in lexicon with this config's extras applied.
    pub fn lexicon(&self) -> Lexicon {
        let mut lexicon = Lexicon::default();
        lexicon.add_whitelist(self.extra_whitelist.iter().map(String::as_str));
        lexicon.add_terms(
            Locale::English,
            TermSeverity::Strong,
            self.extra_terms.iter().map(String::as_str),
        );
        lexicon
    }

    pub fn build_rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(self.rate_limit.clone())
    }

    pub fn build_filter(&self) -> ContentFilter {
        ContentFilter::new(self.filter.clone(), self.lexicon())
    }

    pub fn build_moderator(&self) -> Result<Moderator> {
        Moderator::from_config(self.build_filter(), &self.moderation)
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

fn millis(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Result<Duration> {
    let ms = parse(lookup, key, default.as_millis() as u64)?;
    Ok(Duration::from_millis(ms))
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> Result<bool> {
    match lookup(key).as_deref().map(str::trim) {
        None => Ok(default),
        Some("1" | "true" | "on" | "yes") => Ok(true),
        Some("0" | "false" | "off" | "no") => Ok(false),
        Some(other) => anyhow::bail!("Invalid value for {key}: {other:?} (expected true/false)"),
    }
}

fn list(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Vec<String> {
    lookup(key)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.rate_limit, RateLimitPolicy::default());
        assert_eq!(config.filter, FilterConfig::default());
        assert!(!config.moderation.remote_enabled);
        assert!(config.extra_whitelist.is_empty());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = from_pairs(&[
            ("CHATGUARD_MAX_BURST", "5"),
            ("CHATGUARD_COOLDOWN_MS", "30000"),
            ("CHATGUARD_PLACEHOLDER", "#"),
            ("CHATGUARD_ALWAYS_PATTERN_PASS", "off"),
            ("CHATGUARD_EXTRA_WHITELIST", "scunthorpe, , Cockburn"),
        ])
        .unwrap();
        assert_eq!(config.rate_limit.max_burst_messages, 5);
        assert_eq!(config.rate_limit.cooldown, Duration::from_secs(30));
        assert_eq!(config.filter.placeholder, '#');
        assert!(!config.filter.always_pattern_pass);
        assert_eq!(config.extra_whitelist, vec!["scunthorpe", "Cockburn"]);
    }

    #[test]
    fn malformed_values_are_fatal() {
        assert!(from_pairs(&[("CHATGUARD_MAX_BURST", "lots")]).is_err());
        assert!(from_pairs(&[("CHATGUARD_REMOTE_MODERATION", "maybe")]).is_err());
        assert!(from_pairs(&[("CHATGUARD_PLACEHOLDER", "ab")]).is_err());
    }

    #[test]
    fn invalid_policies_are_fatal() {
        assert!(from_pairs(&[("CHATGUARD_MAX_BURST", "0")]).is_err());
        assert!(from_pairs(&[("CHATGUARD_COOLDOWN_MS", "99999999999")]).is_err());
        assert!(from_pairs(&[("CHATGUARD_HISTORY_WINDOW_MS", "86400001")]).is_err());
        assert!(from_pairs(&[("CHATGUARD_COOLDOWN_MS", "86400000")]).is_ok());
        assert!(from_pairs(&[("CHATGUARD_PLACEHOLDER", "x")]).is_err());
        assert!(from_pairs(&[("CHATGUARD_REMOTE_MODERATION", "true")]).is_err());
        assert!(from_pairs(&[
            ("CHATGUARD_REMOTE_MODERATION", "true"),
            ("OPENAI_API_KEY", "sk-test"),
        ])
        .is_ok());
    }

    #[test]
    fn extra_terms_reach_the_filter() {
        let config = from_pairs(&[("CHATGUARD_EXTRA_TERMS", "zorp")]).unwrap();
        assert!(!config.build_filter().scan("total zorp").is_clean);
    }
}
