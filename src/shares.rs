use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::money::split_exact;
use crate::schemas::{Expense, ExpenseShare, ShareStatus, UserId};

/// Builds one share per attendee for a freshly created expense.
///
/// An empty attendee list yields no shares: the expense stands unsplit until
/// attendance is known. The payer's own share is born settled so it never
/// shows up as a debt. Attendee order decides who absorbs the rounding
/// remainder, so callers pass a deterministic ordering.
pub fn generate_shares(
    expense: &Expense,
    attendee_ids: &[UserId],
    now: DateTime<Utc>,
) -> Vec<ExpenseShare> {
    if attendee_ids.is_empty() {
        return Vec::new();
    }
    let amounts = split_exact(expense.amount, attendee_ids.len());
    attendee_ids
        .iter()
        .zip(amounts)
        .map(|(user_id, amount)| {
            let is_payer = *user_id == expense.paid_by;
            ExpenseShare {
                id: Uuid::new_v4().to_string(),
                expense_id: expense.id.clone(),
                user_id: user_id.clone(),
                amount,
                status: if is_payer {
                    ShareStatus::Settled
                } else {
                    ShareStatus::Pending
                },
                payment_method: None,
                settled_at: is_payer.then_some(now),
                settled_by: is_payer.then(|| expense.paid_by.clone()),
                created_at: now,
                updated_at: now,
            }
        })
        .collect()
}

/// Recomputes share amounts after an expense's total changed.
///
/// Works over the existing debtor set in its given order (not current
/// attendance) and leaves every status untouched. Returns `(share_id, new
/// amount)` pairs; an expense without shares recalculates to nothing.
pub fn recalculate_amounts(shares: &[ExpenseShare], new_total: Decimal) -> Vec<(String, Decimal)> {
    if shares.is_empty() {
        return Vec::new();
    }
    let amounts = split_exact(new_total, shares.len());
    shares
        .iter()
        .zip(amounts)
        .map(|(share, amount)| (share.id.clone(), amount))
        .collect()
}
