//! Best-effort extraction of an expense from free-form chat text.
//!
//! Messages that match no formal command land here. The interpreter looks
//! for a money mention ("30 reais", "R$ 25,50", a bare number), derives a
//! description from the leftover words, and classifies the text against a
//! small keyword vocabulary. It never errors: text it cannot read simply
//! yields `None` and the dispatcher replies with usage help.

use std::sync::LazyLock;

use regex::Regex;

use crate::{
    category::{Category, find_expense_category},
    materializer::ExpenseDraft,
};

/// Matches the first money mention: digits, an optional two-digit decimal
/// part with either separator, and an optional currency word.
static MONEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d{2})?)\s*(?:reais?|r\$|brl)?")
        .expect("money pattern is a valid regex")
});

/// Strips a leading spending verb such as "gastei" or "paguei".
static FILLER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:gastei|comprei|paguei|despesa)\s*")
        .expect("filler pattern is a valid regex")
});

/// Strips the first connecting preposition between the amount and the
/// description. Word boundaries keep it from eating letters inside words
/// like "comida" or "banana".
static PREPOSITION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*\b(?:no|na|em|por|com)\b\s*")
        .expect("preposition pattern is a valid regex")
});

/// The description used when the leftover text is empty, e.g. for a bare
/// "50 reais".
pub const PLACEHOLDER_DESCRIPTION: &str = "Expense via chat";

/// Classifies free text into a category search hint.
///
/// The interpreter only needs a hint, not a category ID: the hint is
/// matched against the owner's own categories afterwards, so a classifier
/// can be swapped out without touching storage.
pub trait CategoryMatcher: Send + Sync {
    /// Return a search hint for `text`, or `None` when nothing matches.
    fn classify(&self, text: &str) -> Option<&str>;
}

/// Classifies text by scanning for a fixed keyword vocabulary.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordMatcher;

const FOOD_KEYWORDS: [&str; 8] = [
    "supermercado",
    "mercado",
    "comida",
    "almoço",
    "jantar",
    "café",
    "lanche",
    "restaurante",
];

const TRANSPORT_KEYWORDS: [&str; 6] = [
    "uber",
    "taxi",
    "ônibus",
    "gasolina",
    "combustível",
    "estacionamento",
];

impl CategoryMatcher for KeywordMatcher {
    fn classify(&self, text: &str) -> Option<&str> {
        let text = text.to_lowercase();

        if FOOD_KEYWORDS.iter().any(|keyword| text.contains(keyword)) {
            Some("alimentação")
        } else if TRANSPORT_KEYWORDS.iter().any(|keyword| text.contains(keyword)) {
            Some("transporte")
        } else {
            None
        }
    }
}

/// Interpret free-form `text` as an expense.
///
/// Returns `None` when no money mention is found. The category hint from
/// `matcher` is resolved against `categories`; when neither the hint nor a
/// matching category exists the draft is simply uncategorized.
pub fn interpret(
    text: &str,
    categories: &[Category],
    matcher: &dyn CategoryMatcher,
) -> Option<ExpenseDraft> {
    let money = MONEY_PATTERN.captures(text)?;
    let amount: f64 = money
        .get(1)
        .expect("money pattern group 1 always participates in a match")
        .as_str()
        .replace(',', ".")
        .parse()
        .ok()?;

    // Remove the full money mention, then the filler verb and the first
    // connecting preposition, and whatever remains is the description.
    let full_match = money.get(0).expect("group 0 is the whole match");
    let mut remainder = String::with_capacity(text.len());
    remainder.push_str(&text[..full_match.start()]);
    remainder.push_str(&text[full_match.end()..]);

    let remainder = FILLER_PATTERN.replace(remainder.trim(), "");
    let remainder = PREPOSITION_PATTERN.replace(&remainder, " ");
    let description = remainder.trim();

    let description = if description.is_empty() {
        PLACEHOLDER_DESCRIPTION.to_owned()
    } else {
        description.to_owned()
    };

    let category = matcher
        .classify(text)
        .and_then(|hint| find_expense_category(categories, hint));

    Some(ExpenseDraft {
        amount,
        description,
        category_id: category.map(|category| category.id),
        category_name: category.map(|category| category.name.clone()),
    })
}
