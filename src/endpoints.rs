//! Endpoints (routes) for the REST server.

/// The inbound chat webhook.
pub const WEBHOOK: &str = "/api/webhook";

/// Create a transfer between two of the caller's accounts.
pub const TRANSFER: &str = "/api/transfer";
