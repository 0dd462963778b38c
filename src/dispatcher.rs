//! Per-account orchestration: decide, classify, reply, and report failures.

use crate::classifier::{HttpClassifier, ImageClassifier};
use crate::config::Config;
use crate::eligibility::{evaluate, is_addressed_to, Eligibility, IneligibleReason};
use crate::error::{error_chain, DispatchError};
use crate::media::{HttpMediaFetcher, MediaDownloader};
use crate::message::MessageComposer;
use crate::twitter::{PostedTweet, TwitterApiClient, TwitterGateway};
use crate::twitter_message::{BotAccount, Tweet};
use crate::twitter_parser::TweetCreateEvents;
use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Texts posted by error-reporter accounts when a reply fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessages {
    /// Posted with a timestamp appended so repeated failures are not
    /// rejected as duplicates.
    pub error: String,
    pub sorry: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Posted(PostedTweet),
    Ignored(String),
}

/// Result of handling one tweet for one subscribed account.
#[derive(Debug)]
pub struct AccountReport {
    pub tweet_id: u64,
    pub account_id: u64,
    pub screen_name: String,
    pub result: Result<ReplyOutcome, DispatchError>,
}

pub struct ReplyDispatcher {
    gateway: Arc<dyn TwitterGateway>,
    media: Arc<dyn MediaDownloader>,
    classifier: Arc<dyn ImageClassifier>,
    composer: Arc<dyn MessageComposer>,
    messages: NotificationMessages,
}

impl ReplyDispatcher {
    pub fn new(
        gateway: Arc<dyn TwitterGateway>,
        media: Arc<dyn MediaDownloader>,
        classifier: Arc<dyn ImageClassifier>,
        composer: Arc<dyn MessageComposer>,
        messages: NotificationMessages,
    ) -> Self {
        Self {
            gateway,
            media,
            classifier,
            composer,
            messages,
        }
    }

    /// Wire the HTTP collaborators described by `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut twitter = TwitterApiClient::new(
            &config.twitter.api_url,
            Duration::from_secs(config.twitter.timeout_secs),
        )
        .context("failed to build Twitter client")?;
        for bot in &config.bots {
            twitter = twitter.with_account(bot.id, config.signer_for(bot));
        }

        let media = HttpMediaFetcher::new(
            config.media.retry_policy(),
            Duration::from_secs(config.media.timeout_secs),
        );
        let classifier = HttpClassifier::new(
            config.classifier.endpoint.clone(),
            Duration::from_secs(config.classifier.timeout_secs),
        );

        Ok(Self::new(
            Arc::new(twitter),
            Arc::new(media),
            Arc::new(classifier),
            Arc::new(config.messages.composer()),
            NotificationMessages {
                error: config.messages.error.clone(),
                sorry: config.messages.sorry.clone(),
            },
        ))
    }

    /// Handle every tweet of a webhook delivery.
    ///
    /// When the delivery names the account it was made for, only that
    /// account is considered.
    pub async fn handle_events(
        &self,
        events: &TweetCreateEvents,
        bots: &[BotAccount],
    ) -> Vec<AccountReport> {
        let subscribed: Vec<BotAccount> = match events.for_user_id {
            Some(id) => bots.iter().filter(|bot| bot.id() == id).cloned().collect(),
            None => bots.to_vec(),
        };
        if subscribed.is_empty() {
            warn!(for_user_id = ?events.for_user_id, "No configured account for this delivery");
        }

        let mut reports = Vec::new();
        for tweet in &events.tweets {
            reports.extend(self.reply_to_users(tweet, &subscribed).await);
        }
        reports
    }

    /// Run [`reply_to_user`](Self::reply_to_user) for each account in order.
    /// A failure for one account never stops the others.
    pub async fn reply_to_users(&self, tweet: &Tweet, bots: &[BotAccount]) -> Vec<AccountReport> {
        let mut reports = Vec::with_capacity(bots.len());
        for bot in bots {
            let result = self.reply_to_user(tweet, bot).await;
            reports.push(AccountReport {
                tweet_id: tweet.id,
                account_id: bot.id(),
                screen_name: bot.user.screen_name.clone(),
                result,
            });
        }
        reports
    }

    /// Reply to `tweet` as `bot` if it, or failing that its quote tweet,
    /// is a valid trigger.
    #[instrument(skip_all, fields(tweet_id = tweet.id, account = %bot.user.screen_name))]
    pub async fn reply_to_user(
        &self,
        tweet: &Tweet,
        bot: &BotAccount,
    ) -> Result<ReplyOutcome, DispatchError> {
        if !is_addressed_to(tweet, bot) {
            return Ok(ignored(IneligibleReason::NotAddressed.to_string()));
        }

        let reason = match evaluate(tweet, bot) {
            Eligibility::Eligible => return self.classify_and_reply(tweet, tweet, bot).await,
            Eligibility::Ineligible(reason) => reason,
        };

        let Some(quote) = tweet.quote_tweet() else {
            return Ok(ignored(reason.to_string()));
        };

        match evaluate(quote, bot) {
            Eligibility::Eligible => self.classify_and_reply(tweet, quote, bot).await,
            Eligibility::Ineligible(quote_reason) => {
                Ok(ignored(format!("{reason}, and {quote_reason}")))
            }
        }
    }

    async fn classify_and_reply(
        &self,
        primary: &Tweet,
        target: &Tweet,
        bot: &BotAccount,
    ) -> Result<ReplyOutcome, DispatchError> {
        match self.post_prediction(primary, target, bot).await {
            Ok(posted) => Ok(ReplyOutcome::Posted(posted)),
            Err(err) => {
                error!(stage = err.stage(), error = %error_chain(&err), target_id = target.id, "Failed to reply with prediction");
                if bot.is_error_reporter {
                    self.notify_failure(bot).await;
                }
                Err(err)
            }
        }
    }

    async fn post_prediction(
        &self,
        primary: &Tweet,
        target: &Tweet,
        bot: &BotAccount,
    ) -> Result<PostedTweet, DispatchError> {
        let image = self.media.download(target).await?;
        let prediction = self.classifier.predict(image).await?;
        info!(pred = %prediction.pred, confidence = %prediction.confidence, "Prediction received");

        let text = self.composer.compose(&prediction)?;

        bot.reply_mode
            .deliver(self.gateway.as_ref(), &bot.user, primary, target, &text)
            .await
            .map_err(DispatchError::PostFailed)
    }

    /// Post the error and sorry messages. Failures here are only logged so
    /// the caller still sees the original error.
    async fn notify_failure(&self, bot: &BotAccount) {
        let error_text = format!(
            "{} {}",
            self.messages.error,
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
        );

        for text in [error_text.as_str(), self.messages.sorry.as_str()] {
            if let Err(err) = self.gateway.post(&bot.user, text).await {
                warn!(error = %error_chain(&err), "Failed to tweet error notify message");
            }
        }
    }
}

fn ignored(reason: String) -> ReplyOutcome {
    info!(%reason, "Tweet is ignored");
    ReplyOutcome::Ignored(reason)
}
