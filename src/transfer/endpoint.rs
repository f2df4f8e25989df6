//! The route handler for creating transfers.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{AppState, Error, account::AccountId, auth::IdentityVerifier};

use super::core::{TransferRequest, execute_transfer};

/// The state needed to authenticate and execute a transfer.
#[derive(Clone)]
pub struct TransferState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Verifies the caller's bearer token.
    pub verifier: Arc<dyn IdentityVerifier>,
}

impl FromRef<AppState> for TransferState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            verifier: state.verifier.clone(),
        }
    }
}

/// The body of a transfer request. The owner comes from the bearer token,
/// never from the body.
#[derive(Debug, Deserialize)]
pub struct TransferForm {
    /// The account the money leaves.
    pub from_account: AccountId,
    /// The account the money enters.
    pub to_account: AccountId,
    /// The amount to move.
    pub amount: f64,
    /// An optional note for both legs.
    pub description: Option<String>,
}

/// Handler for moving money between two of the caller's accounts.
///
/// # Errors
/// Replies with:
/// - 401 UNAUTHORIZED when the bearer token is missing or invalid,
/// - 403 FORBIDDEN when an account does not belong to the caller,
/// - 400 BAD REQUEST for a bad amount, identical accounts, or
///   insufficient funds,
/// - 500 INTERNAL SERVER ERROR on database failure.
pub async fn post_transfer(
    State(state): State<TransferState>,
    auth_header: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    Json(form): Json<TransferForm>,
) -> Response {
    let Ok(TypedHeader(bearer)) = auth_header else {
        return Error::InvalidToken.into_response();
    };

    let owner_id = match state.verifier.verify(bearer.token()) {
        Ok(owner_id) => owner_id,
        Err(error) => return error.into_response(),
    };

    let request = TransferRequest {
        owner_id,
        from_account: form.from_account,
        to_account: form.to_account,
        amount: form.amount,
        description: form.description,
    };

    let transfer_result = {
        let Ok(connection) = state.db_connection.lock() else {
            return Error::DatabaseLock.into_response();
        };

        execute_transfer(&request, &connection)
    };

    match transfer_result {
        Ok(transfer) => Json(serde_json::json!({
            "success": true,
            "transfer_id": transfer.id,
        }))
        .into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod transfer_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, routing::post};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{
        AppState, Error, account::create_account, auth::IdentityVerifier, database_id::OwnerId,
        endpoints,
    };

    struct StubVerifier {
        owner_id: OwnerId,
    }

    impl IdentityVerifier for StubVerifier {
        fn verify(&self, token: &str) -> Result<OwnerId, Error> {
            if token == "valid-token" {
                Ok(self.owner_id)
            } else {
                Err(Error::InvalidToken)
            }
        }
    }

    fn new_test_server(owner_id: OwnerId) -> (TestServer, Arc<Mutex<Connection>>) {
        let state = AppState::new(
            Connection::open_in_memory().unwrap(),
            Arc::new(StubVerifier { owner_id }),
        )
        .unwrap();
        let db_connection = state.db_connection.clone();

        let router = Router::new()
            .route(endpoints::TRANSFER, post(super::post_transfer))
            .with_state(state);

        (TestServer::new(router).unwrap(), db_connection)
    }

    fn seed_accounts(db_connection: &Mutex<Connection>, owner_id: OwnerId) -> (i64, i64) {
        let connection = db_connection.lock().unwrap();
        let from = create_account(owner_id, "Checking", "checking", 500.0, &connection).unwrap();
        let to = create_account(owner_id, "Savings", "savings", 0.0, &connection).unwrap();

        (from.id, to.id)
    }

    #[tokio::test]
    async fn transfer_succeeds_with_a_valid_token() {
        let (server, db_connection) = new_test_server(1);
        let (from, to) = seed_accounts(&db_connection, 1);

        let response = server
            .post(endpoints::TRANSFER)
            .authorization_bearer("valid-token")
            .json(&json!({"from_account": from, "to_account": to, "amount": 150.0}))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["success"], json!(true));
        assert!(body["transfer_id"].is_i64());
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let (server, db_connection) = new_test_server(1);
        let (from, to) = seed_accounts(&db_connection, 1);

        let response = server
            .post(endpoints::TRANSFER)
            .json(&json!({"from_account": from, "to_account": to, "amount": 10.0}))
            .await;

        response.assert_status_unauthorized();
    }

    #[tokio::test]
    async fn bad_token_is_unauthorized() {
        let (server, db_connection) = new_test_server(1);
        let (from, to) = seed_accounts(&db_connection, 1);

        let response = server
            .post(endpoints::TRANSFER)
            .authorization_bearer("tampered-token")
            .json(&json!({"from_account": from, "to_account": to, "amount": 10.0}))
            .await;

        response.assert_status_unauthorized();
    }

    #[tokio::test]
    async fn someone_elses_account_is_forbidden() {
        let (server, db_connection) = new_test_server(1);
        let (from, _) = seed_accounts(&db_connection, 1);
        let (theirs, _) = seed_accounts(&db_connection, 2);

        let response = server
            .post(endpoints::TRANSFER)
            .authorization_bearer("valid-token")
            .json(&json!({"from_account": from, "to_account": theirs, "amount": 10.0}))
            .await;

        response.assert_status_forbidden();
    }

    #[tokio::test]
    async fn insufficient_funds_are_a_bad_request() {
        let (server, db_connection) = new_test_server(1);
        let (from, to) = seed_accounts(&db_connection, 1);

        let response = server
            .post(endpoints::TRANSFER)
            .authorization_bearer("valid-token")
            .json(&json!({"from_account": from, "to_account": to, "amount": 9999.0}))
            .await;

        response.assert_status_bad_request();
    }
}
