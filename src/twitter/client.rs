use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::oauth::OAuthSigner;
use super::{PostedTweet, TwitterGateway};
use crate::error::{TwitterError, TwitterResult};
use crate::twitter_message::{quote_permalink, TwitterUser};

const CREATE_TWEET_ENDPOINT: &str = "/2/tweets";

#[derive(Debug, Default, Serialize)]
struct CreateTweetRequest {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<TweetReply>,
}

#[derive(Debug, Serialize)]
struct TweetReply {
    in_reply_to_tweet_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateTweetResponse {
    data: PostedTweet,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

/// Twitter API v2 client posting as any of the configured bot accounts.
///
/// Posts are not retried: a request that timed out may still have created
/// the tweet.
#[derive(Debug)]
pub struct TwitterApiClient {
    client: Client,
    base_url: String,
    signers: HashMap<u64, OAuthSigner>,
}

impl TwitterApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> TwitterResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sutaba/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            signers: HashMap::new(),
        })
    }

    /// Register the credentials used when posting as `account_id`.
    pub fn with_account(mut self, account_id: u64, signer: OAuthSigner) -> Self {
        self.signers.insert(account_id, signer);
        self
    }

    #[instrument(skip_all, fields(account = %from.screen_name))]
    async fn create_tweet(
        &self,
        from: &TwitterUser,
        request: &CreateTweetRequest,
    ) -> TwitterResult<PostedTweet> {
        let signer = self
            .signers
            .get(&from.id)
            .ok_or(TwitterError::MissingCredentials(from.id))?;

        let url = format!("{}{}", self.base_url, CREATE_TWEET_ENDPOINT);
        let auth_header = signer.sign("POST", &url, &[])?;

        debug!(reply = request.reply.is_some(), "Creating tweet");
        let response = self
            .client
            .post(&url)
            .header("Authorization", auth_header)
            .json(request)
            .send()
            .await?;

        let posted: CreateTweetResponse = handle_response(response).await?;
        info!(account = %from.screen_name, tweet_id = %posted.data.id, "Tweet posted");
        Ok(posted.data)
    }
}

async fn handle_response<T: serde::de::DeserializeOwned>(response: Response) -> TwitterResult<T> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if status.is_success() {
        return serde_json::from_slice(&bytes).map_err(TwitterError::from);
    }

    let error: ApiErrorResponse = serde_json::from_slice(&bytes).unwrap_or_default();
    let message = error
        .detail
        .or(error.title)
        .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());

    Err(TwitterError::Api {
        status: status.as_u16(),
        message,
    })
}

fn mention(screen_name: &str, text: &str) -> String {
    format!("@{} {}", screen_name, text)
}

#[async_trait]
impl TwitterGateway for TwitterApiClient {
    async fn post(&self, from: &TwitterUser, text: &str) -> TwitterResult<PostedTweet> {
        let request = CreateTweetRequest {
            text: text.to_string(),
            ..Default::default()
        };
        self.create_tweet(from, &request).await
    }

    async fn reply(
        &self,
        from: &TwitterUser,
        to: &TwitterUser,
        to_tweet_id: &str,
        text: &str,
    ) -> TwitterResult<PostedTweet> {
        let request = CreateTweetRequest {
            text: mention(&to.screen_name, text),
            reply: Some(TweetReply {
                in_reply_to_tweet_id: to_tweet_id.to_string(),
            }),
        };
        self.create_tweet(from, &request).await
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
        // A trailing status URL renders as a quote
        let body = format!(
            "{} {}",
            text,
            quote_permalink(quoted_screen_name, quoted_tweet_id)
        );
        let request = CreateTweetRequest {
            text: mention(&to.screen_name, &body),
            reply: Some(TweetReply {
                in_reply_to_tweet_id: to_tweet_id.to_string(),
            }),
        };
        self.create_tweet(from, &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{body_json, header_regex, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn bot() -> TwitterUser {
        TwitterUser::new(1000, "sutaba_bot")
    }

    fn test_client(server: &MockServer) -> TwitterApiClient {
        TwitterApiClient::new(&server.uri(), Duration::from_secs(5))
            .unwrap()
            .with_account(
                1000,
                OAuthSigner::new("consumer_key", "consumer_secret", "token", "token_secret"),
            )
    }

    fn created(id: &str, text: &str) -> ResponseTemplate {
        ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "data": { "id": id, "text": text }
        }))
    }

    #[tokio::test]
    async fn test_post_signs_request() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .and(header_regex("authorization", r#"^OAuth oauth_consumer_key="consumer_key""#))
            .and(body_json(serde_json::json!({ "text": "hello" })))
            .respond_with(created("1", "hello"))
            .expect(1)
            .mount(&server)
            .await;

        let posted = test_client(&server).post(&bot(), "hello").await.unwrap();
        assert_eq!(posted, PostedTweet { id: "1".into(), text: "hello".into() });
    }

    #[tokio::test]
    async fn test_reply_mentions_author() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .and(body_json(serde_json::json!({
                "text": "@alice スタバ (93.0%)",
                "reply": { "in_reply_to_tweet_id": "2001" }
            })))
            .respond_with(created("2", "@alice スタバ (93.0%)"))
            .expect(1)
            .mount(&server)
            .await;

        test_client(&server)
            .reply(&bot(), &TwitterUser::new(3001, "alice"), "2001", "スタバ (93.0%)")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reply_with_quote_links_quoted_tweet() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .and(body_json(serde_json::json!({
                "text": "@alice スタバ (93.0%) https://twitter.com/bob/status/1500",
                "reply": { "in_reply_to_tweet_id": "2001" }
            })))
            .respond_with(created("3", "ok"))
            .expect(1)
            .mount(&server)
            .await;

        test_client(&server)
            .reply_with_quote(
                &bot(),
                &TwitterUser::new(3001, "alice"),
                "2001",
                "1500",
                "bob",
                "スタバ (93.0%)",
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_api_error_uses_detail() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "title": "Forbidden",
                "detail": "You are not allowed to create a Tweet with duplicate content.",
                "type": "about:blank",
                "status": 403
            })))
            .mount(&server)
            .await;

        let err = test_client(&server).post(&bot(), "again").await.unwrap_err();
        match err {
            TwitterError::Api { status, message } => {
                assert_eq!(status, 403);
                assert!(message.contains("duplicate content"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_account_is_rejected_locally() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(created("1", "never"))
            .expect(0)
            .mount(&server)
            .await;

        let err = test_client(&server)
            .post(&TwitterUser::new(42, "stranger"), "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, TwitterError::MissingCredentials(42)));
    }
}
