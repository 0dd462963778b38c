use crate::logging::LoggingConfig;
use crate::media::RetryPolicy;
use crate::message::{LabelTemplate, TemplateComposer};
use crate::twitter::oauth::OAuthSigner;
use crate::twitter_message::{BotAccount, ReplyMode, TwitterUser};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONSUMER_KEY_ENV: &str = "SUTABA_CONSUMER_KEY";
pub const CONSUMER_SECRET_ENV: &str = "SUTABA_CONSUMER_SECRET";

const REDACTED: &str = "[REDACTED]";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub twitter: TwitterConfig,
    pub bots: Vec<BotConfig>,
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TwitterConfig {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub api_url: String,
    pub timeout_secs: u64,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            consumer_key: String::new(),
            consumer_secret: String::new(),
            api_url: "https://api.twitter.com".to_string(),
            timeout_secs: 10,
        }
    }
}

impl fmt::Debug for TwitterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwitterConfig")
            .field("consumer_key", &REDACTED)
            .field("consumer_secret", &REDACTED)
            .field("api_url", &self.api_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// One subscribed account and the user tokens it posts with.
#[derive(Clone, Deserialize)]
pub struct BotConfig {
    pub id: u64,
    pub screen_name: String,
    pub target_keyword: String,
    #[serde(default)]
    pub is_error_reporter: bool,
    #[serde(default)]
    pub reply_mode: ReplyMode,
    pub access_token: String,
    pub access_token_secret: String,
}

impl BotConfig {
    pub fn account(&self) -> BotAccount {
        BotAccount {
            user: TwitterUser::new(self.id, self.screen_name.clone()),
            target_keyword: self.target_keyword.clone(),
            is_error_reporter: self.is_error_reporter,
            reply_mode: self.reply_mode,
        }
    }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("id", &self.id)
            .field("screen_name", &self.screen_name)
            .field("target_keyword", &self.target_keyword)
            .field("is_error_reporter", &self.is_error_reporter)
            .field("reply_mode", &self.reply_mode)
            .field("access_token", &REDACTED)
            .field("access_token_secret", &REDACTED)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    pub endpoint: String,
    #[serde(default = "default_classifier_timeout")]
    pub timeout_secs: u64,
}

fn default_classifier_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub retry_count: u32,
    pub retry_interval_secs: u64,
    pub deadline_secs: Option<u64>,
    pub timeout_secs: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            retry_count: 3,
            retry_interval_secs: 1,
            deadline_secs: None,
            timeout_secs: 10,
        }
    }
}

impl MediaConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retry_count: self.retry_count,
            interval: Duration::from_secs(self.retry_interval_secs),
            deadline: self.deadline_secs.map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    pub error: String,
    pub sorry: String,
    pub unsure_threshold: f64,
    pub fallback: Option<String>,
    pub labels: BTreeMap<String, LabelTemplate>,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            error: "Failed to classify the image.".to_string(),
            sorry: "Sorry, something went wrong. Please try again later.".to_string(),
            unsure_threshold: 0.0,
            fallback: None,
            labels: BTreeMap::new(),
        }
    }
}

impl MessagesConfig {
    pub fn composer(&self) -> TemplateComposer {
        TemplateComposer::new(
            self.labels.clone(),
            self.fallback.clone(),
            self.unsure_threshold,
        )
    }
}

impl Config {
    /// `<config_dir>/sutaba/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("could not determine the config directory")?;
        Ok(dir.join("sutaba").join("config.toml"))
    }

    /// Load from `path` (or the default location), apply environment
    /// overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Replace app credentials with values from `lookup` when present.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(CONSUMER_KEY_ENV) {
            self.twitter.consumer_key = key;
        }
        if let Some(secret) = lookup(CONSUMER_SECRET_ENV) {
            self.twitter.consumer_secret = secret;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.bots.is_empty() {
            bail!("at least one [[bots]] entry is required");
        }

        let mut seen = HashSet::new();
        for bot in &self.bots {
            if bot.target_keyword.trim().is_empty() {
                bail!("bot {} has an empty target_keyword", bot.screen_name);
            }
            if !seen.insert(bot.id) {
                bail!("bot id {} is configured more than once", bot.id);
            }
        }

        if self.twitter.consumer_key.is_empty() || self.twitter.consumer_secret.is_empty() {
            bail!(
                "twitter consumer key and secret are required (set them in [twitter] or via {} and {})",
                CONSUMER_KEY_ENV,
                CONSUMER_SECRET_ENV
            );
        }

        if self.classifier.endpoint.trim().is_empty() {
            bail!("classifier endpoint must not be empty");
        }

        if !(0.0..=1.0).contains(&self.messages.unsure_threshold) {
            bail!(
                "messages.unsure_threshold must be within [0, 1], got {}",
                self.messages.unsure_threshold
            );
        }

        if self.messages.labels.is_empty() && self.messages.fallback.is_none() {
            bail!("no reply templates: configure [messages.labels] or messages.fallback");
        }

        Ok(())
    }

    pub fn bot_accounts(&self) -> Vec<BotAccount> {
        self.bots.iter().map(BotConfig::account).collect()
    }

    pub fn signer_for(&self, bot: &BotConfig) -> OAuthSigner {
        OAuthSigner::new(
            self.twitter.consumer_key.clone(),
            self.twitter.consumer_secret.clone(),
            bot.access_token.clone(),
            bot.access_token_secret.clone(),
        )
    }
}
