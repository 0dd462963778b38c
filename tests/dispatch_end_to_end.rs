//! Full dispatch against mock Twitter, CDN and classifier servers.

use sutaba::config::Config;
use sutaba::twitter_parser::parse_tweet_create_events;
use sutaba::{DispatchError, ReplyDispatcher, ReplyOutcome};
use wiremock::{
    matchers::{body_json, header_regex, method, path},
    Mock, MockServer, ResponseTemplate,
};

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

fn config(server: &MockServer) -> Config {
    let toml = format!(
        r##"
[twitter]
consumer_key = "ck"
consumer_secret = "cs"
api_url = "{uri}"

[[bots]]
id = 1000
screen_name = "sutaba_bot"
target_keyword = "#sutaba"
is_error_reporter = true
access_token = "at"
access_token_secret = "ats"

[classifier]
endpoint = "{uri}/predict"

[media]
retry_interval_secs = 0

[messages]
error = "error occurred"
sorry = "sorry"

[messages.labels.sutaba]
text = "スタバ ({{confidence}})"
"##,
        uri = server.uri()
    );
    let config = Config::from_toml_str(&toml).unwrap();
    config.validate().unwrap();
    config
}

fn payload(server: &MockServer) -> String {
    serde_json::json!({
        "for_user_id": "1000",
        "tweet_create_events": [{
            "id": 2001,
            "text": "@sutaba_bot #sutaba",
            "user": { "id": 3001, "screen_name": "alice" },
            "in_reply_to_status_id": 1999,
            "in_reply_to_user_id": 1000,
            "in_reply_to_screen_name": "sutaba_bot",
            "entities": {
                "media": [{ "media_url_https": format!("{}/media/a.png", server.uri()) }]
            }
        }]
    })
    .to_string()
}

async fn mount_media(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/media/a.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(PNG_MAGIC))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_mention_is_classified_and_replied() {
    let server = MockServer::start().await;
    mount_media(&server).await;

    Mock::given(method("POST"))
        .and(path("/predict"))
        .and(header_regex("content-type", "^multipart/form-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "pred": "sutaba",
            "confidence": "0.93"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .and(header_regex("authorization", r#"oauth_token="at""#))
        .and(body_json(serde_json::json!({
            "text": "@alice スタバ (93.0%) https://twitter.com/alice/status/2001",
            "reply": { "in_reply_to_tweet_id": "2001" }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "data": { "id": "9001", "text": "ok" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server);
    let dispatcher = ReplyDispatcher::from_config(&config).unwrap();
    let events = parse_tweet_create_events(&payload(&server)).unwrap();

    let reports = dispatcher
        .handle_events(&events, &config.bot_accounts())
        .await;

    assert_eq!(reports.len(), 1);
    match &reports[0].result {
        Ok(ReplyOutcome::Posted(posted)) => assert_eq!(posted.id, "9001"),
        other => panic!("unexpected result: {other:?}"),
    }

    // the PNG bytes are not UTF-8, so inspect the part header lossily
    let requests = server.received_requests().await.unwrap();
    let upload = requests
        .iter()
        .find(|r| r.url.path() == "/predict")
        .unwrap();
    let body = String::from_utf8_lossy(&upload.body);
    assert!(body.contains(r#"name="file"; filename="image""#), "{body}");
    assert!(body.contains("Content-Type: image/png"), "{body}");
}

#[tokio::test]
async fn test_malformed_prediction_posts_error_then_sorry() {
    let server = MockServer::start().await;
    mount_media(&server).await;

    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "data": { "id": "1", "text": "notice" }
        })))
        .expect(2)
        .mount(&server)
        .await;

    let config = config(&server);
    let dispatcher = ReplyDispatcher::from_config(&config).unwrap();
    let events = parse_tweet_create_events(&payload(&server)).unwrap();

    let reports = dispatcher
        .handle_events(&events, &config.bot_accounts())
        .await;

    assert_eq!(reports.len(), 1);
    assert!(matches!(
        reports[0].result,
        Err(DispatchError::ClassificationFailed(_))
    ));

    let posted: Vec<serde_json::Value> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/2/tweets")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    assert_eq!(posted.len(), 2);
    assert!(posted[0]["text"]
        .as_str()
        .unwrap()
        .starts_with("error occurred "));
    assert_eq!(posted[1]["text"], "sorry");
    assert!(posted[1].get("reply").is_none());
}
