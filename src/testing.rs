//! In-memory collaborators for dispatcher tests.

use crate::classifier::{ClassificationResult, ImageClassifier};
use crate::error::{ClassifierError, DownloadError, MediaError, TwitterError, TwitterResult};
use crate::media::MediaDownloader;
use crate::twitter::{PostedTweet, TwitterGateway};
use crate::twitter_message::{BotAccount, ReplyMode, Tweet, TwitterUser};
use async_trait::async_trait;
use std::sync::Mutex;

pub const BOT_ID: u64 = 1000;

pub fn bot() -> BotAccount {
    BotAccount {
        user: TwitterUser::new(BOT_ID, "sutaba_bot"),
        target_keyword: "#sutaba".into(),
        is_error_reporter: true,
        reply_mode: ReplyMode::ReplyWithQuote,
    }
}

pub fn tweet(id: u64, author: TwitterUser, text: &str, media: &[&str]) -> Tweet {
    Tweet {
        id,
        user: author,
        text: text.into(),
        media_urls: media.iter().map(|m| m.to_string()).collect(),
        quote_tweet: None,
        in_reply_to_status_id: None,
        in_reply_to_user_id: None,
        in_reply_to_screen_name: None,
    }
}

/// A tweet replying to `bot`.
pub fn mention(id: u64, author: TwitterUser, text: &str, media: &[&str]) -> Tweet {
    Tweet {
        in_reply_to_status_id: Some(id - 1),
        in_reply_to_user_id: Some(BOT_ID),
        in_reply_to_screen_name: Some("sutaba_bot".into()),
        ..tweet(id, author, text, media)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Post {
        from: u64,
        text: String,
    },
    Reply {
        from: u64,
        to: String,
        to_tweet_id: String,
        text: String,
    },
    ReplyWithQuote {
        from: u64,
        to: String,
        to_tweet_id: String,
        quoted_tweet_id: String,
        quoted_screen_name: String,
        text: String,
    },
}

/// Records every call; fails the calls whose index is listed in `fail_on`.
#[derive(Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<GatewayCall>>,
    fail_on: Vec<usize>,
}

impl RecordingGateway {
    pub fn failing_on(fail_on: Vec<usize>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_on,
        }
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: GatewayCall) -> TwitterResult<PostedTweet> {
        let mut calls = self.calls.lock().unwrap();
        let index = calls.len();
        calls.push(call);
        if self.fail_on.contains(&index) {
            return Err(TwitterError::Api {
                status: 503,
                message: "Service Unavailable".into(),
            });
        }
        Ok(PostedTweet {
            id: format!("posted-{index}"),
            text: String::new(),
        })
    }
}

#[async_trait]
impl TwitterGateway for RecordingGateway {
    async fn post(&self, from: &TwitterUser, text: &str) -> TwitterResult<PostedTweet> {
        self.record(GatewayCall::Post {
            from: from.id,
            text: text.into(),
        })
    }

    async fn reply(
        &self,
        from: &TwitterUser,
        to: &TwitterUser,
        to_tweet_id: &str,
        text: &str,
    ) -> TwitterResult<PostedTweet> {
        self.record(GatewayCall::Reply {
            from: from.id,
            to: to.screen_name.clone(),
            to_tweet_id: to_tweet_id.into(),
            text: text.into(),
        })
    }

    async fn reply_with_quote(
        &self,
        from: &TwitterUser,
        to: &TwitterUser,
        to_tweet_id: &str,
        quoted_tweet_id: &str,
        quoted_screen_name: &str,
        text: &str,
    ) -> TwitterResult<PostedTweet> {
        self.record(GatewayCall::ReplyWithQuote {
            from: from.id,
            to: to.screen_name.clone(),
            to_tweet_id: to_tweet_id.into(),
            quoted_tweet_id: quoted_tweet_id.into(),
            quoted_screen_name: quoted_screen_name.into(),
            text: text.into(),
        })
    }
}

/// Returns the first media URL as the "image" bytes, or fails every download.
pub struct StubDownloader {
    pub fail: bool,
    pub requested: Mutex<Vec<u64>>,
}

impl StubDownloader {
    pub fn ok() -> Self {
        Self {
            fail: false,
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok()
        }
    }

    pub fn requested(&self) -> Vec<u64> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaDownloader for StubDownloader {
    async fn download(&self, tweet: &Tweet) -> Result<Vec<u8>, DownloadError> {
        self.requested.lock().unwrap().push(tweet.id);
        let url = tweet.first_media_url().unwrap_or_default().to_string();
        if self.fail {
            return Err(DownloadError {
                url,
                attempts: 4,
                last: MediaError::NoMedia,
            });
        }
        Ok(url.into_bytes())
    }
}

pub enum StubClassifier {
    Label(&'static str, &'static str),
    Malformed,
}

#[async_trait]
impl ImageClassifier for StubClassifier {
    async fn predict(&self, _image: Vec<u8>) -> Result<ClassificationResult, ClassifierError> {
        match self {
            Self::Label(pred, confidence) => Ok(ClassificationResult::new(*pred, *confidence)),
            Self::Malformed => {
                let err = serde_json::from_str::<ClassificationResult>("<html>").unwrap_err();
                Err(ClassifierError::InvalidResponse(err))
            }
        }
    }
}
