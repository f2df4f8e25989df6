//! Ledgerbot is the message-driven transaction engine behind a personal
//! finance tracker.
//!
//! It receives free-form or command-formatted chat messages over a webhook,
//! resolves them into structured financial operations and commits them
//! against a SQLite ledger. A separate endpoint performs atomic transfers
//! between two accounts belonging to the same owner.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod account;
mod app_state;
mod auth;
mod binding;
mod category;
mod database_id;
mod db;
mod endpoints;
mod interpreter;
mod logging;
mod materializer;
mod parser;
mod routing;
mod transaction;
mod transfer;
mod webhook;

pub use account::{Account, AccountId, create_account, get_account, get_context_accounts};
pub use app_state::AppState;
pub use auth::{IdentityVerifier, JwtVerifier};
pub use binding::{ChannelBinding, bind_chat, resolve_owner};
pub use category::{Category, CategoryId, CategoryKind, create_category, get_categories};
pub use database_id::{DatabaseId, OwnerId, TransactionId, TransferId};
pub use db::initialize as initialize_db;
pub use interpreter::{CategoryMatcher, KeywordMatcher, interpret};
pub use logging::logging_middleware;
pub use materializer::{
    ExpenseDraft, InstallmentPlan, create_installment_plan, record_expense,
};
pub use parser::{Intent, parse};
pub use routing::build_router;
pub use transaction::{
    MonthlyTotals, Transaction, TransactionKind, TransactionStatus, monthly_totals,
};
pub use transfer::{Transfer, TransferRequest, execute_transfer, get_transfer};
pub use webhook::{Dispatch, dispatch_message};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The owner has no account to post a chat-originated transaction
    /// against. The user should create an account in the app first.
    #[error("no account found for the owner")]
    NoAccount,

    /// A transfer named the same account as both source and destination.
    #[error("source and destination accounts must be different")]
    SameAccount,

    /// A transfer named at least one account that does not belong to the
    /// calling owner.
    ///
    /// No distinction is made between "does not exist" and "belongs to
    /// someone else" so that the response leaks nothing about other owners'
    /// accounts.
    #[error("accounts not found or not owned by the caller")]
    Unauthorized,

    /// The source account's balance does not cover the transfer amount.
    #[error("insufficient funds in the source account")]
    InsufficientFunds,

    /// An amount that is zero, negative, or not a finite number, or an
    /// installment count of zero.
    #[error("invalid amount")]
    InvalidAmount,

    /// The bearer token on the transfer endpoint was missing or could not be
    /// verified.
    #[error("missing or invalid bearer token")]
    InvalidToken,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An installment batch could not be written in full.
    ///
    /// The batch is rolled back as a whole and is never retried
    /// automatically, since a retry risks duplicate postings.
    #[error("could not write the installment batch")]
    InstallmentWriteFailed,

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLock,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status_code, message) = match &self {
            Error::NoAccount
            | Error::SameAccount
            | Error::InsufficientFunds
            | Error::InvalidAmount => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::InvalidToken => (StatusCode::UNAUTHORIZED, self.to_string()),
            Error::Unauthorized => (StatusCode::FORBIDDEN, self.to_string()),
            Error::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            // Any errors that are not handled above are not intended to be
            // shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };

        (status_code, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
