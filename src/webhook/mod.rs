//! The inbound chat webhook: request parsing, dispatch and replies.

mod dispatch;
mod endpoint;

pub use dispatch::{CONTEXT_ACCOUNT_LIMIT, Dispatch, dispatch_message};
pub use endpoint::post_webhook;
