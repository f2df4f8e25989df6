//! Categories classify transactions as a kind of expense or income.
//!
//! This crate never mutates categories; it only reads them to resolve the
//! category hints carried by inbound chat messages.

mod core;

pub use core::{
    Category, CategoryId, CategoryKind, create_category, create_category_table,
    find_expense_category, get_categories, map_row_to_category,
};
