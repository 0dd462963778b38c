//! Trigger rules deciding whether a tweet should be classified.

use crate::twitter_message::{BotAccount, Tweet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IneligibleReason {
    NotAddressed,
    NoMedia,
    NoKeyword,
    SentByBot,
}

impl fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAddressed => write!(f, "not sent to subscribe user"),
            Self::NoMedia => write!(f, "no media"),
            Self::NoKeyword => write!(f, "no keyword"),
            Self::SentByBot => write!(f, "sent by bot"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Ineligible(IneligibleReason),
}

/// Whether the tweet names this bot account as its addressee, either as a
/// reply or as a leading @mention.
pub fn is_addressed_to(tweet: &Tweet, bot: &BotAccount) -> bool {
    tweet.in_reply_to_user_id == Some(bot.id())
}

/// Check the three trigger rules in order; the first failing rule wins.
pub fn evaluate(tweet: &Tweet, bot: &BotAccount) -> Eligibility {
    if tweet.media_urls.is_empty() {
        return Eligibility::Ineligible(IneligibleReason::NoMedia);
    }
    if !tweet.text.contains(&bot.target_keyword) {
        return Eligibility::Ineligible(IneligibleReason::NoKeyword);
    }
    if tweet.user.id == bot.id() {
        return Eligibility::Ineligible(IneligibleReason::SentByBot);
    }
    Eligibility::Eligible
}
