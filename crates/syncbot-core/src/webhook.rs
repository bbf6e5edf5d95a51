//! GroupMe webhook server.
//!
//! GroupMe posts every message in the bot's group to a callback URL. The
//! router here accepts those callbacks on the configured path and hands them to
//! the [`SyncBot`].

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::relay::{DispatchOutcome, SyncBot, WebhookPayload};

#[derive(Serialize)]
struct Health {
    status: String,
    paused: bool,
}

#[derive(Serialize, Debug)]
struct CallbackResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

async fn health(State(bot): State<Arc<SyncBot>>) -> Json<Health> {
    Json(Health {
        status: "syncbot is working!".to_string(),
        paused: bot.is_paused().await,
    })
}

async fn handle_callback(
    State(bot): State<Arc<SyncBot>>,
    body: String,
) -> (StatusCode, Json<CallbackResponse>) {
    let payload: WebhookPayload = match serde_json::from_str(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Rejecting malformed GroupMe callback: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(CallbackResponse {
                    success: false,
                    message: Some(format!("invalid payload: {}", e)),
                }),
            );
        }
    };

    let outcome = bot.on_webhook_payload(&payload).await;
    debug!("GroupMe callback from '{}': {:?}", payload.name, outcome);

    let message = match outcome {
        DispatchOutcome::Ignored => Some("ignored".to_string()),
        _ => None,
    };
    (
        StatusCode::OK,
        Json(CallbackResponse {
            success: true,
            message,
        }),
    )
}

/// Build the webhook router, with callbacks accepted on `callback_path`.
pub fn router(bot: Arc<SyncBot>, callback_path: &str) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(callback_path, post(handle_callback))
        .with_state(bot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::OutboundMessage;
    use crate::relay::controller::testkit::{MockConnector, MockPlatforms, test_config};
    use crate::session::LiveSession;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use http_body_util::BodyExt;
    use std::path::PathBuf;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    fn app() -> (Router, MockPlatforms) {
        let config = test_config(PathBuf::new());
        let platforms = MockPlatforms::new();
        let live = LiveSession::new(config.clone(), platforms.router(&config));
        let bot = Arc::new(SyncBot::new(
            live,
            Arc::new(MockConnector::failing()),
            CancellationToken::new(),
        ));
        (router(bot, &config.server.webhook_path), platforms)
    }

    fn callback(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/GroupMeEvents")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_user_callback_is_relayed() {
        let (app, platforms) = app();

        let response = app
            .oneshot(callback(
                r#"{"text": "hi all", "name": "Gina", "sender_type": "user", "group_id": "1"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            platforms.discord.get_sent_messages().await,
            vec![OutboundMessage::new("sync", "[Gina]: hi all")]
        );
    }

    #[tokio::test]
    async fn test_bot_callback_is_ignored() {
        let (app, platforms) = app();

        let response = app
            .oneshot(callback(
                r#"{"text": "[bob]: hi", "name": "relay", "sender_type": "bot"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["message"], "ignored");
        assert!(platforms.discord.sent_texts().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_callback_is_rejected() {
        let (app, platforms) = app();

        let response = app.oneshot(callback("{not json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert!(platforms.discord.sent_texts().await.is_empty());
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "syncbot is working!");
        assert_eq!(json["paused"], false);
    }
}
