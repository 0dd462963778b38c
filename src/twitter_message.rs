use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwitterUser {
    pub id: u64,
    pub screen_name: String,
}

impl TwitterUser {
    pub fn new(id: u64, screen_name: impl Into<String>) -> Self {
        Self {
            id,
            screen_name: screen_name.into(),
        }
    }
}

/// A tweet as delivered by the Account Activity webhook.
///
/// The quote tweet is owned: Twitter never returns cyclic quote chains, and
/// the webhook only ever nests one level deep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tweet {
    pub id: u64,
    pub user: TwitterUser,
    pub text: String,
    pub media_urls: Vec<String>,
    pub quote_tweet: Option<Box<Tweet>>,
    pub in_reply_to_status_id: Option<u64>,
    pub in_reply_to_user_id: Option<u64>,
    pub in_reply_to_screen_name: Option<String>,
}

impl Tweet {
    pub fn id_str(&self) -> String {
        self.id.to_string()
    }

    pub fn quote_tweet(&self) -> Option<&Tweet> {
        self.quote_tweet.as_deref()
    }

    /// Only the first attachment is ever classified.
    pub fn first_media_url(&self) -> Option<&str> {
        self.media_urls.first().map(String::as_str)
    }

    /// Permalink used when a tweet is quoted by URL.
    pub fn permalink(&self) -> String {
        quote_permalink(&self.user.screen_name, &self.id_str())
    }
}

pub fn quote_permalink(screen_name: &str, tweet_id: &str) -> String {
    format!("https://twitter.com/{}/status/{}", screen_name, tweet_id)
}

/// How a bot delivers its classification result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyMode {
    Tweet,
    Reply,
    QuoteTweet,
    #[default]
    ReplyWithQuote,
}

impl fmt::Display for ReplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tweet => write!(f, "tweet"),
            Self::Reply => write!(f, "reply"),
            Self::QuoteTweet => write!(f, "quote_tweet"),
            Self::ReplyWithQuote => write!(f, "reply_with_quote"),
        }
    }
}

/// A subscribed bot account and the rules that trigger it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotAccount {
    pub user: TwitterUser,
    pub target_keyword: String,
    pub is_error_reporter: bool,
    pub reply_mode: ReplyMode,
}

impl BotAccount {
    pub fn id(&self) -> u64 {
        self.user.id
    }
}
