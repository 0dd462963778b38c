//! Outbound Twitter access used by the dispatcher.

pub mod client;
pub mod crc;
pub mod oauth;

use crate::error::TwitterResult;
use crate::twitter_message::{ReplyMode, Tweet, TwitterUser};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use client::TwitterApiClient;

/// A tweet created by one of the bot accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedTweet {
    pub id: String,
    pub text: String,
}

/// Posting operations the bot accounts need, nothing more.
#[async_trait]
pub trait TwitterGateway: Send + Sync {
    async fn post(&self, from: &TwitterUser, text: &str) -> TwitterResult<PostedTweet>;

    async fn reply(
        &self,
        from: &TwitterUser,
        to: &TwitterUser,
        to_tweet_id: &str,
        text: &str,
    ) -> TwitterResult<PostedTweet>;

    async fn reply_with_quote(
        &self,
        from: &TwitterUser,
        to: &TwitterUser,
        to_tweet_id: &str,
        quoted_tweet_id: &str,
        quoted_screen_name: &str,
        text: &str,
    ) -> TwitterResult<PostedTweet>;
}

impl ReplyMode {
    /// Deliver `text` for a classification of `target`, triggered by `primary`.
    ///
    /// `target` is either `primary` itself or the tweet it quotes.
    pub async fn deliver(
        self,
        gateway: &dyn TwitterGateway,
        bot: &TwitterUser,
        primary: &Tweet,
        target: &Tweet,
        text: &str,
    ) -> TwitterResult<PostedTweet> {
        match self {
            Self::Tweet => gateway.post(bot, text).await,
            Self::Reply => {
                gateway
                    .reply(bot, &primary.user, &primary.id_str(), text)
                    .await
            }
            Self::QuoteTweet => {
                let text = format!("{} {}", text, target.permalink());
                gateway.post(bot, &text).await
            }
            Self::ReplyWithQuote => {
                gateway
                    .reply_with_quote(
                        bot,
                        &primary.user,
                        &primary.id_str(),
                        &target.id_str(),
                        &target.user.screen_name,
                        text,
                    )
                    .await
            }
        }
    }
}
