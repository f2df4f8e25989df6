//! The route handler for the inbound chat webhook.
//!
//! The webhook always answers the caller directly: a successful dispatch
//! replies 200 with the text to show the user, client mistakes reply 400
//! with a plain-text reason, and anything unexpected replies 500 without
//! detail.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tokio::{task, time::timeout};

use crate::{AppState, Error};

use super::dispatch::{Dispatch, dispatch_message};

/// The state needed to dispatch a webhook update.
#[derive(Clone)]
pub struct WebhookState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// How long a dispatch may run before the caller gets a retry reply.
    pub reply_deadline: std::time::Duration,
}

impl FromRef<AppState> for WebhookState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            reply_deadline: state.reply_deadline,
        }
    }
}

/// An inbound update. Only text messages are meaningful; everything else
/// (edits, stickers, joins) arrives without `message.text` and is rejected.
#[derive(Debug, Deserialize)]
pub struct InboundUpdate {
    /// The message payload, if the update carries one.
    pub message: Option<InboundMessage>,
}

/// The message part of an inbound update.
#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    /// The chat the message came from.
    pub chat: InboundChat,
    /// The message text, absent for non-text messages.
    pub text: Option<String>,
}

/// The chat a message came from.
#[derive(Debug, Deserialize)]
pub struct InboundChat {
    /// The numeric chat identifier.
    pub id: i64,
}

/// The reply returned to the chat gateway, which forwards `text` verbatim
/// to the user.
#[derive(Debug, Serialize)]
pub struct ReplyBody {
    /// The text to show the user.
    pub text: String,
}

const TIMEOUT_REPLY: &str = "That took too long to process. Please try again.";

/// Handler for inbound chat messages.
///
/// Dispatch runs on a blocking worker under a deadline, so a slow database
/// turns into a retry reply for the user instead of a hung webhook call.
pub async fn post_webhook(
    State(state): State<WebhookState>,
    Json(update): Json<InboundUpdate>,
) -> Response {
    let Some(message) = update.message else {
        return (StatusCode::BAD_REQUEST, "No message text").into_response();
    };
    let Some(text) = message.text else {
        return (StatusCode::BAD_REQUEST, "No message text").into_response();
    };

    let chat_id = message.chat.id.to_string();
    let db_connection = state.db_connection.clone();

    let dispatch = timeout(
        state.reply_deadline,
        task::spawn_blocking(move || {
            let connection = db_connection.lock().map_err(|_| Error::DatabaseLock)?;

            dispatch_message(&chat_id, &text, &connection)
        }),
    )
    .await;

    match dispatch {
        Ok(Ok(Ok(Dispatch::Reply(text)))) => Json(ReplyBody { text }).into_response(),
        Ok(Ok(Ok(Dispatch::NotConfigured))) => {
            (StatusCode::BAD_REQUEST, "Chat not configured").into_response()
        }
        Ok(Ok(Err(error))) => {
            tracing::error!("webhook dispatch failed: {error}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
        }
        Ok(Err(join_error)) => {
            tracing::error!("webhook dispatch task panicked: {join_error}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
        }
        Err(_elapsed) => Json(ReplyBody {
            text: TIMEOUT_REPLY.to_owned(),
        })
        .into_response(),
    }
}

#[cfg(test)]
mod webhook_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, routing::post};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{
        AppState, Error, account::create_account, auth::IdentityVerifier, binding::bind_chat,
        category::{CategoryKind, create_category}, database_id::OwnerId, endpoints,
        transaction::count_transactions,
    };

    struct RejectAllVerifier;

    impl IdentityVerifier for RejectAllVerifier {
        fn verify(&self, _token: &str) -> Result<OwnerId, Error> {
            Err(Error::InvalidToken)
        }
    }

    fn new_test_server() -> (TestServer, Arc<Mutex<Connection>>) {
        let state = AppState::new(
            Connection::open_in_memory().unwrap(),
            Arc::new(RejectAllVerifier),
        )
        .unwrap();
        let db_connection = state.db_connection.clone();

        let router = Router::new()
            .route(endpoints::WEBHOOK, post(super::post_webhook))
            .with_state(state);

        (TestServer::new(router).unwrap(), db_connection)
    }

    fn update(chat_id: i64, text: &str) -> Value {
        json!({"message": {"chat": {"id": chat_id}, "text": text}})
    }

    #[tokio::test]
    async fn a_bound_chat_gets_a_confirmation_reply() {
        let (server, db_connection) = new_test_server();
        {
            let connection = db_connection.lock().unwrap();
            bind_chat("123", 1, true, &connection).unwrap();
            create_account(1, "Carteira", "wallet", 100.0, &connection).unwrap();
            create_category(1, "Alimentação", CategoryKind::Expense, &connection).unwrap();
        }

        let response = server
            .post(endpoints::WEBHOOK)
            .json(&update(123, "Gastei 30 reais no supermercado"))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        let text = body["text"].as_str().unwrap();
        assert!(text.contains("R$ 30.00"), "got reply {text:?}");

        let connection = db_connection.lock().unwrap();
        assert_eq!(count_transactions(&connection).unwrap(), 1);
    }

    #[tokio::test]
    async fn an_unbound_chat_is_a_bad_request() {
        let (server, _db_connection) = new_test_server();

        let response = server
            .post(endpoints::WEBHOOK)
            .json(&update(99999, "/balance"))
            .await;

        response.assert_status_bad_request();
        assert_eq!(response.text(), "Chat not configured");
    }

    #[tokio::test]
    async fn an_update_without_text_is_a_bad_request() {
        let (server, _db_connection) = new_test_server();

        for body in [
            json!({}),
            json!({"message": {"chat": {"id": 123}}}),
        ] {
            let response = server.post(endpoints::WEBHOOK).json(&body).await;

            response.assert_status_bad_request();
            assert_eq!(response.text(), "No message text");
        }
    }

    #[tokio::test]
    async fn commands_round_trip_through_the_endpoint() {
        let (server, db_connection) = new_test_server();
        {
            let connection = db_connection.lock().unwrap();
            bind_chat("123", 1, true, &connection).unwrap();
            create_account(1, "Carteira", "wallet", 250.0, &connection).unwrap();
        }

        let response = server.post(endpoints::WEBHOOK).json(&update(123, "/balance")).await;

        response.assert_status_ok();
        let body: Value = response.json();
        let text = body["text"].as_str().unwrap();
        assert!(text.contains("Carteira: R$ 250.00"), "got reply {text:?}");
    }
}
