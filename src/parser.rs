//! Maps raw inbound message text to a typed intent.
//!
//! Formal commands start with the `/` marker. Anything that does not match
//! the closed command set is tagged [Intent::Unrecognized] and deferred to
//! the natural-language interpreter.

/// The usage hint replied when `/add` is called with too few arguments.
pub const ADD_USAGE: &str =
    "Usage: /add [amount] [description] [category]\nExample: /add 50.00 almoço alimentação";

/// The usage hint replied when the `/add` amount does not parse.
pub const AMOUNT_USAGE: &str = "Invalid amount. Use the format: 50.00";

/// A parsed inbound message.
///
/// Every branch the dispatcher takes is driven by this closed set, so a new
/// command cannot be added without the compiler pointing at every match that
/// needs updating.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// `/add [amount] [description...] [category]`.
    AddExpense {
        /// The non-negative amount extracted from the first argument.
        amount: f64,
        /// Everything between the amount and the category keyword. When the
        /// command carries exactly two arguments, the trailing token doubles
        /// as both description and category hint.
        description: String,
        /// The trailing token, matched best-effort against the owner's
        /// expense categories.
        category_hint: String,
    },
    /// `/balance` with no parameters.
    Balance,
    /// `/report` with no parameters.
    Report,
    /// `/help` or `/start`, with no parameters.
    Help,
    /// Text that matches no formal command; handed to the fallback
    /// interpreter.
    Unrecognized,
    /// A formal command with arguments that could not be parsed. Carries the
    /// usage hint to reply with; this is never surfaced as an error.
    Malformed {
        /// The usage hint for the user.
        usage: String,
    },
}

/// Parse raw message `text` into an [Intent].
///
/// Commands are matched by prefix on the trimmed text, so trailing
/// decoration after the keyword does not prevent a match.
pub fn parse(text: &str) -> Intent {
    let text = text.trim();

    if text.starts_with("/add") {
        parse_add(text)
    } else if text.starts_with("/balance") {
        Intent::Balance
    } else if text.starts_with("/report") {
        Intent::Report
    } else if text.starts_with("/help") || text.starts_with("/start") {
        Intent::Help
    } else {
        Intent::Unrecognized
    }
}

fn parse_add(text: &str) -> Intent {
    let parts: Vec<&str> = text.split_whitespace().skip(1).collect();

    if parts.len() < 2 {
        return Intent::Malformed {
            usage: ADD_USAGE.to_owned(),
        };
    }

    let amount = match parts[0].parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount >= 0.0 => amount,
        _ => {
            return Intent::Malformed {
                usage: AMOUNT_USAGE.to_owned(),
            };
        }
    };

    // With exactly two arguments the single trailing token serves as both the
    // description and the category hint.
    let description = if parts.len() == 2 {
        parts[1].to_owned()
    } else {
        parts[1..parts.len() - 1].join(" ")
    };
    let category_hint = parts[parts.len() - 1].to_owned();

    Intent::AddExpense {
        amount,
        description,
        category_hint,
    }
}
