use crate::twitter_message::{Tweet, TwitterUser};
use serde::Deserialize;

/// A `tweet_create_events` delivery from the Account Activity API.
#[derive(Debug, Clone, Default)]
pub struct TweetCreateEvents {
    /// The subscribed account the delivery was made for.
    pub for_user_id: Option<u64>,
    pub tweets: Vec<Tweet>,
}

#[derive(Debug, Deserialize)]
struct RawEvents {
    #[serde(default)]
    for_user_id: Option<String>,
    #[serde(default)]
    tweet_create_events: Vec<RawStatus>,
}

#[derive(Debug, Deserialize)]
struct RawStatus {
    id: u64,
    #[serde(default)]
    text: String,
    #[serde(default)]
    full_text: Option<String>,
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    extended_tweet: Option<RawExtendedTweet>,
    user: RawUser,
    #[serde(default)]
    entities: Option<RawEntities>,
    #[serde(default)]
    extended_entities: Option<RawEntities>,
    #[serde(default)]
    in_reply_to_status_id: Option<u64>,
    #[serde(default)]
    in_reply_to_user_id: Option<u64>,
    #[serde(default)]
    in_reply_to_screen_name: Option<String>,
    #[serde(default)]
    quoted_status_id: Option<u64>,
    #[serde(default)]
    quoted_status: Option<Box<RawStatus>>,
}

#[derive(Debug, Deserialize)]
struct RawExtendedTweet {
    full_text: String,
    #[serde(default)]
    entities: Option<RawEntities>,
    #[serde(default)]
    extended_entities: Option<RawEntities>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    id: u64,
    screen_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawEntities {
    #[serde(default)]
    media: Vec<RawMedia>,
}

#[derive(Debug, Deserialize)]
struct RawMedia {
    media_url_https: String,
}

/// Parse a webhook body into domain tweets.
///
/// Non-tweet activity (favorites, follows, DMs) parses to an empty list.
pub fn parse_tweet_create_events(body: &str) -> Result<TweetCreateEvents, serde_json::Error> {
    let raw: RawEvents = serde_json::from_str(body)?;
    Ok(TweetCreateEvents {
        for_user_id: raw.for_user_id.and_then(|id| id.parse().ok()),
        tweets: raw.tweet_create_events.into_iter().map(to_tweet).collect(),
    })
}

fn to_tweet(raw: RawStatus) -> Tweet {
    let RawStatus {
        id,
        text,
        full_text,
        truncated,
        extended_tweet,
        user,
        entities,
        extended_entities,
        in_reply_to_status_id,
        in_reply_to_user_id,
        in_reply_to_screen_name,
        quoted_status_id,
        quoted_status,
    } = raw;

    // Truncated statuses carry the real text and media in extended_tweet
    let (text, entities, extended_entities) = match extended_tweet {
        Some(ext) if truncated => (ext.full_text, ext.entities, ext.extended_entities),
        _ => (full_text.unwrap_or(text), entities, extended_entities),
    };

    // extended_entities lists every photo, entities only the first
    let media_urls = extended_entities
        .filter(|e| !e.media.is_empty())
        .or(entities)
        .unwrap_or_default()
        .media
        .into_iter()
        .map(|m| m.media_url_https)
        .collect();

    let mut tweet = Tweet {
        id,
        user: TwitterUser::new(user.id, user.screen_name),
        text,
        media_urls,
        quote_tweet: None,
        in_reply_to_status_id: in_reply_to_status_id.filter(|id| *id != 0),
        // A fresh @mention has no status id but still names the addressee
        in_reply_to_user_id: in_reply_to_user_id.filter(|id| *id != 0),
        in_reply_to_screen_name: in_reply_to_screen_name.filter(|name| !name.is_empty()),
    };

    if quoted_status_id.is_some_and(|id| id != 0) {
        tweet.quote_tweet = quoted_status.map(|q| Box::new(to_tweet(*q)));
    }

    tweet
}
