//! Application router configuration.

use axum::{Router, routing::post};
use tower_http::cors::CorsLayer;

use crate::{
    AppState, endpoints, transfer::post_transfer, webhook::post_webhook,
};

/// Return a router with all the app's routes.
///
/// The webhook is called by a chat gateway and the transfer route by the
/// web app, so both sit behind a permissive CORS layer and authenticate by
/// other means: the webhook through the chat binding, the transfer route
/// through a bearer token.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::WEBHOOK, post(post_webhook))
        .route(endpoints::TRANSFER, post(post_transfer))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod routing_tests {
    use std::sync::Arc;

    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{AppState, Error, auth::IdentityVerifier, database_id::OwnerId, endpoints};

    use super::build_router;

    struct RejectAllVerifier;

    impl IdentityVerifier for RejectAllVerifier {
        fn verify(&self, _token: &str) -> Result<OwnerId, Error> {
            Err(Error::InvalidToken)
        }
    }

    fn new_test_server() -> TestServer {
        let state = AppState::new(
            Connection::open_in_memory().unwrap(),
            Arc::new(RejectAllVerifier),
        )
        .unwrap();

        TestServer::new(build_router(state)).unwrap()
    }

    #[tokio::test]
    async fn router_serves_the_webhook() {
        let server = new_test_server();

        let response = server.post(endpoints::WEBHOOK).json(&json!({})).await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn router_serves_the_transfer_route() {
        let server = new_test_server();

        let response = server
            .post(endpoints::TRANSFER)
            .json(&json!({"from_account": 1, "to_account": 2, "amount": 1.0}))
            .await;

        response.assert_status_unauthorized();
    }
}
