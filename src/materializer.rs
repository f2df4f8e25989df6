//! Turns parsed or interpreted expenses into ledger rows.
//!
//! Single expenses become one confirmed transaction against the context
//! account. Installment purchases expand into one row per month, written
//! atomically so a partial plan can never land.

use rusqlite::{Connection, TransactionBehavior};
use time::{Date, Month, OffsetDateTime, util::days_in_year_month};
use uuid::Uuid;

use crate::{
    Error,
    account::{Account, AccountId},
    category::CategoryId,
    database_id::OwnerId,
    transaction::{Transaction, TransactionKind, TransactionStatus, create_transaction},
};

/// An expense ready to be written, produced by the command parser or the
/// free-text interpreter.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseDraft {
    /// The expense amount.
    pub amount: f64,
    /// The expense description.
    pub description: String,
    /// The matched category, if any.
    pub category_id: Option<CategoryId>,
    /// The matched category's display name, used in the confirmation reply.
    pub category_name: Option<String>,
}

/// A purchase split into equal monthly installments.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallmentPlan {
    /// The amount of each individual installment.
    pub installment_amount: f64,
    /// The shared description; each row gets an ` (i/total)` suffix.
    pub description: String,
    /// The number of monthly installments, at least 1.
    pub total: u32,
    /// The date of the first installment.
    pub first_date: Date,
    /// The account the installments post against.
    pub account_id: AccountId,
    /// The matched category, if any.
    pub category_id: Option<CategoryId>,
}

/// Record `draft` as a confirmed expense against the owner's context
/// account and build the confirmation reply.
///
/// # Errors
/// Returns [Error::NoAccount] when `accounts` is empty, or an
/// [Error::SqlError] if the write fails.
pub fn record_expense(
    draft: &ExpenseDraft,
    owner_id: OwnerId,
    accounts: &[Account],
    connection: &Connection,
) -> Result<String, Error> {
    let account = accounts.first().ok_or(Error::NoAccount)?;
    let today = OffsetDateTime::now_utc().date();

    let builder = Transaction::build(
        owner_id,
        TransactionKind::Expense,
        draft.amount,
        today,
        &draft.description,
    )
    .account_id(Some(account.id))
    .category_id(draft.category_id)
    .status(TransactionStatus::Confirmed);

    create_transaction(builder, connection)?;

    let category_line = draft
        .category_name
        .as_deref()
        .unwrap_or("uncategorized");

    Ok(format!(
        "Expense added: R$ {:.2}\nDescription: {}\nCategory: {}\nAccount: {}",
        draft.amount, draft.description, category_line, account.name
    ))
}

/// Advance `date` by `months` calendar months, clamping the day to the
/// target month's length (Jan 31 + 1 month = Feb 28, or Feb 29 in a leap
/// year).
pub fn add_months(date: Date, months: i32) -> Date {
    // Zero-based month arithmetic so negative offsets and year carries fall
    // out of div_euclid/rem_euclid.
    let zero_based = date.year() * 12 + date.month() as i32 - 1 + months;
    let year = zero_based.div_euclid(12);
    let month = Month::January.nth_next(zero_based.rem_euclid(12) as u8);

    let day = date.day().min(days_in_year_month(year, month));

    Date::from_calendar_date(year, month, day)
        .expect("clamped day is always valid for the target month")
}

/// Expand `plan` into one confirmed transaction per installment, all
/// sharing a fresh group ID, written in a single database transaction.
///
/// Installment `i` is dated `first_date` plus `i - 1` months and described
/// as `"{description} (i/total)"`. A plan of one is not a split purchase:
/// it posts a single plain transaction with no suffix and no installment
/// linkage.
///
/// # Errors
/// Returns [Error::InvalidAmount] when the plan total is zero,
/// [Error::InstallmentWriteFailed] when any row fails to write (in which
/// case nothing is persisted), or an [Error::SqlError] if the transaction
/// itself cannot start or commit.
pub fn create_installment_plan(
    plan: &InstallmentPlan,
    owner_id: OwnerId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    if plan.total == 0 {
        return Err(Error::InvalidAmount);
    }

    if plan.total == 1 {
        let transaction = create_transaction(
            Transaction::build(
                owner_id,
                TransactionKind::Expense,
                plan.installment_amount,
                plan.first_date,
                &plan.description,
            )
            .account_id(Some(plan.account_id))
            .category_id(plan.category_id)
            .status(TransactionStatus::Confirmed),
            connection,
        )?;

        return Ok(vec![transaction]);
    }

    let group_id = Uuid::new_v4().to_string();
    let sql_transaction =
        rusqlite::Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let mut transactions = Vec::with_capacity(plan.total as usize);

    for index in 1..=plan.total {
        let date = add_months(plan.first_date, index as i32 - 1);
        let description = format!("{} ({}/{})", plan.description, index, plan.total);

        let builder = Transaction::build(
            owner_id,
            TransactionKind::Expense,
            plan.installment_amount,
            date,
            &description,
        )
        .account_id(Some(plan.account_id))
        .category_id(plan.category_id)
        .status(TransactionStatus::Confirmed)
        .installment(index, plan.total, &group_id);

        match create_transaction(builder, &sql_transaction) {
            Ok(transaction) => transactions.push(transaction),
            Err(error) => {
                tracing::error!(
                    "installment {index}/{} of group {group_id} failed to write: {error}",
                    plan.total
                );
                // Dropping the transaction without commit rolls everything
                // back.
                return Err(Error::InstallmentWriteFailed);
            }
        }
    }

    sql_transaction.commit()?;

    Ok(transactions)
}

#[cfg(test)]
mod materializer_tests {
    use rusqlite::Connection;
    use time::{Date, Month, macros::date};

    use crate::{
        Error,
        account::create_account,
        category::{CategoryKind, create_category},
        db::initialize,
        transaction::count_transactions,
    };

    use super::{
        ExpenseDraft, InstallmentPlan, add_months, create_installment_plan, record_expense,
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn record_expense_writes_a_row_and_confirms() {
        let conn = get_test_connection();
        let account = create_account(1, "Carteira", "checking", 100.0, &conn).unwrap();
        let category = create_category(1, "Alimentação", CategoryKind::Expense, &conn).unwrap();

        let draft = ExpenseDraft {
            amount: 30.0,
            description: "supermercado".to_owned(),
            category_id: Some(category.id),
            category_name: Some(category.name.clone()),
        };

        let reply = record_expense(&draft, 1, &[account], &conn).unwrap();

        assert!(reply.contains("R$ 30.00"), "got reply {reply:?}");
        assert!(reply.contains("supermercado"));
        assert!(reply.contains("Alimentação"));
        assert!(reply.contains("Carteira"));
        assert_eq!(count_transactions(&conn).unwrap(), 1);
    }

    #[test]
    fn record_expense_without_accounts_fails() {
        let conn = get_test_connection();

        let draft = ExpenseDraft {
            amount: 30.0,
            description: "supermercado".to_owned(),
            category_id: None,
            category_name: None,
        };

        let result = record_expense(&draft, 1, &[], &conn);

        assert!(matches!(result, Err(Error::NoAccount)));
        assert_eq!(count_transactions(&conn).unwrap(), 0);
    }

    #[test]
    fn record_expense_without_category_says_uncategorized() {
        let conn = get_test_connection();
        let account = create_account(1, "Carteira", "checking", 100.0, &conn).unwrap();

        let draft = ExpenseDraft {
            amount: 12.5,
            description: "pipoca".to_owned(),
            category_id: None,
            category_name: None,
        };

        let reply = record_expense(&draft, 1, &[account], &conn).unwrap();

        assert!(reply.contains("uncategorized"), "got reply {reply:?}");
    }

    #[test]
    fn add_months_steps_through_years() {
        assert_eq!(add_months(date!(2024 - 11 - 15), 3), date!(2025 - 02 - 15));
        assert_eq!(add_months(date!(2024 - 01 - 10), 0), date!(2024 - 01 - 10));
    }

    #[test]
    fn add_months_clamps_to_month_end() {
        assert_eq!(add_months(date!(2025 - 01 - 31), 1), date!(2025 - 02 - 28));
        assert_eq!(add_months(date!(2024 - 01 - 31), 1), date!(2024 - 02 - 29));
        assert_eq!(add_months(date!(2025 - 03 - 31), 1), date!(2025 - 04 - 30));
    }

    fn test_plan(first_date: Date, total: u32, account_id: i64) -> InstallmentPlan {
        InstallmentPlan {
            installment_amount: 100.0,
            description: "notebook".to_owned(),
            total,
            first_date,
            account_id,
            category_id: None,
        }
    }

    #[test]
    fn installments_share_a_group_and_step_monthly() {
        let conn = get_test_connection();
        let account = create_account(1, "Cartão", "credit", 0.0, &conn).unwrap();

        let transactions =
            create_installment_plan(&test_plan(date!(2025 - 01 - 15), 3, account.id), 1, &conn)
                .unwrap();

        assert_eq!(transactions.len(), 3);

        let group_id = transactions[0].installment_group_id.clone().unwrap();
        assert!(!group_id.is_empty());

        for (i, transaction) in transactions.iter().enumerate() {
            let index = i as u32 + 1;
            assert_eq!(transaction.installment_index, Some(index));
            assert_eq!(transaction.installment_total, Some(3));
            assert_eq!(transaction.installment_group_id.as_deref(), Some(group_id.as_str()));
            assert_eq!(transaction.description, format!("notebook ({index}/3)"));
            assert_eq!(
                transaction.date,
                Date::from_calendar_date(2025, Month::January.nth_next(i as u8), 15).unwrap()
            );
        }

        assert_eq!(count_transactions(&conn).unwrap(), 3);
    }

    #[test]
    fn installments_roll_over_the_year_and_clamp_month_ends() {
        let conn = get_test_connection();
        let account = create_account(1, "Cartão", "credit", 0.0, &conn).unwrap();

        let transactions =
            create_installment_plan(&test_plan(date!(2024 - 11 - 30), 4, account.id), 1, &conn)
                .unwrap();

        let stored_dates: Vec<Date> = transactions
            .iter()
            .map(|transaction| transaction.date)
            .collect();

        // December keeps the 30th, February 2025 clamps to the 28th.
        assert_eq!(
            stored_dates,
            vec![
                date!(2024 - 11 - 30),
                date!(2024 - 12 - 30),
                date!(2025 - 01 - 30),
                date!(2025 - 02 - 28),
            ]
        );

        let group_id = transactions[0].installment_group_id.as_deref();
        assert!(
            transactions
                .iter()
                .all(|transaction| transaction.installment_group_id.as_deref() == group_id)
        );
    }

    #[test]
    fn a_plan_of_one_posts_a_plain_transaction() {
        let conn = get_test_connection();
        let account = create_account(1, "Cartão", "credit", 0.0, &conn).unwrap();

        let transactions =
            create_installment_plan(&test_plan(date!(2025 - 06 - 01), 1, account.id), 1, &conn)
                .unwrap();

        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].description, "notebook");
        assert_eq!(transactions[0].installment_index, None);
        assert_eq!(transactions[0].installment_total, None);
        assert_eq!(transactions[0].installment_group_id, None);
        assert_eq!(transactions[0].date, date!(2025 - 06 - 01));
    }

    #[test]
    fn a_plan_of_zero_is_rejected() {
        let conn = get_test_connection();
        let account = create_account(1, "Cartão", "credit", 0.0, &conn).unwrap();

        let result = create_installment_plan(&test_plan(date!(2025 - 06 - 01), 0, account.id), 1, &conn);

        assert!(matches!(result, Err(Error::InvalidAmount)));
        assert_eq!(count_transactions(&conn).unwrap(), 0);
    }

    #[test]
    fn a_mid_plan_failure_persists_nothing() {
        let conn = get_test_connection();
        let account = create_account(1, "Cartão", "credit", 0.0, &conn).unwrap();

        // Abort the batch on the third row to simulate a mid-plan write
        // failure.
        conn.execute(
            "CREATE TRIGGER abort_third_installment
             BEFORE INSERT ON \"transaction\"
             WHEN NEW.installment_index = 3
             BEGIN SELECT RAISE(ABORT, 'injected failure'); END",
            (),
        )
        .unwrap();

        let result =
            create_installment_plan(&test_plan(date!(2025 - 01 - 15), 5, account.id), 1, &conn);

        assert!(matches!(result, Err(Error::InstallmentWriteFailed)));
        assert_eq!(count_transactions(&conn).unwrap(), 0);
    }
}
