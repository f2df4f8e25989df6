//! Routes an inbound chat message to the right operation and renders the
//! reply text.

use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    Error,
    account::{Account, get_context_accounts},
    binding::resolve_owner,
    category::{find_expense_category, get_categories},
    database_id::OwnerId,
    interpreter::{KeywordMatcher, interpret},
    materializer::{ExpenseDraft, record_expense},
    parser::{Intent, parse},
    transaction::monthly_totals,
};

/// How many accounts are loaded as posting context for a message. The
/// newest account receives chat-originated expenses.
pub const CONTEXT_ACCOUNT_LIMIT: u32 = 5;

/// The reply to `/help`, `/start`, and malformed free text.
const HELP_TEXT: &str = "I track your spending. You can:\n\
    /add [amount] [description] [category] - record an expense\n\
    /balance - see your account balances\n\
    /report - see this month's totals\n\
    /help - show this message\n\
    Or just tell me, e.g. \"Gastei 30 reais no supermercado\".";

const UNRECOGNIZED_REPLY: &str =
    "Sorry, I couldn't find an amount in that. Try something like \
     \"Gastei 30 reais no supermercado\", or send /help.";

const NO_ACCOUNT_REPLY: &str =
    "You don't have any accounts yet. Create one in the app, then try again.";

const WRITE_FAILED_REPLY: &str = "Something went wrong saving that. Please try again.";

/// The outcome of handling one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Reply to the chat with this text.
    Reply(String),
    /// The chat is not bound to any owner; the caller answers with a
    /// client error instead of a reply.
    NotConfigured,
}

/// Handle one inbound chat message and produce the reply.
///
/// The chat binding is checked before anything else touches the store, so
/// an unconfigured chat costs one lookup and leaks nothing.
///
/// # Errors
/// Returns an [Error::SqlError] only for failures outside expense
/// recording; a failed expense write is reported to the user as a retry
/// reply instead.
pub fn dispatch_message(
    chat_id: &str,
    text: &str,
    connection: &Connection,
) -> Result<Dispatch, Error> {
    let Some(owner_id) = resolve_owner(chat_id, connection)? else {
        return Ok(Dispatch::NotConfigured);
    };

    let reply = match parse(text) {
        Intent::AddExpense {
            amount,
            description,
            category_hint,
        } => {
            let categories = get_categories(owner_id, connection)?;
            let category = find_expense_category(&categories, &category_hint);

            let draft = ExpenseDraft {
                amount,
                description,
                category_id: category.map(|category| category.id),
                category_name: category.map(|category| category.name.clone()),
            };

            record_or_apologize(&draft, owner_id, connection)?
        }
        Intent::Balance => {
            let accounts = get_context_accounts(owner_id, CONTEXT_ACCOUNT_LIMIT, connection)?;
            render_balance(&accounts)
        }
        Intent::Report => {
            let today = OffsetDateTime::now_utc().date();
            let month_start = today
                .replace_day(1)
                .expect("day 1 is valid in every month");
            let totals = monthly_totals(owner_id, month_start, connection)?;

            format!(
                "This month:\nIncome: R$ {:.2}\nExpenses: R$ {:.2}\nNet: R$ {:.2}",
                totals.income,
                totals.expenses,
                totals.income - totals.expenses
            )
        }
        Intent::Help => HELP_TEXT.to_owned(),
        Intent::Malformed { usage } => usage,
        Intent::Unrecognized => {
            let categories = get_categories(owner_id, connection)?;

            match interpret(text, &categories, &KeywordMatcher) {
                Some(draft) => record_or_apologize(&draft, owner_id, connection)?,
                None => UNRECOGNIZED_REPLY.to_owned(),
            }
        }
    };

    Ok(Dispatch::Reply(reply))
}

/// Record `draft` and turn recording failures into user-facing replies.
///
/// Missing accounts get an actionable message; anything else is logged and
/// answered with a generic retry, since the user cannot act on a database
/// error.
fn record_or_apologize(
    draft: &ExpenseDraft,
    owner_id: OwnerId,
    connection: &Connection,
) -> Result<String, Error> {
    let accounts = get_context_accounts(owner_id, CONTEXT_ACCOUNT_LIMIT, connection)?;

    match record_expense(draft, owner_id, &accounts, connection) {
        Ok(confirmation) => Ok(confirmation),
        Err(Error::NoAccount) => Ok(NO_ACCOUNT_REPLY.to_owned()),
        Err(error) => {
            tracing::error!("could not record an expense for owner {owner_id}: {error}");
            Ok(WRITE_FAILED_REPLY.to_owned())
        }
    }
}

fn render_balance(accounts: &[Account]) -> String {
    if accounts.is_empty() {
        return NO_ACCOUNT_REPLY.to_owned();
    }

    let mut reply = String::from("Your balances:");
    let mut total = 0.0;

    for account in accounts {
        reply.push_str(&format!("\n{}: R$ {:.2}", account.name, account.balance));
        total += account.balance;
    }

    reply.push_str(&format!("\nTotal: R$ {total:.2}"));

    reply
}
