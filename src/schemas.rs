use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type UserId = String;

/// Lifecycle of a single expense share. Forward-only:
/// pending -> verifying -> settled (mark-received may jump pending -> settled).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareStatus {
    Pending,
    Verifying,
    Settled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Venmo,
    Zelle,
    Cash,
    Other,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Other
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Court,
    Equipment,
    Supplies,
    Food,
    Refreshments,
    Transportation,
    Accommodation,
    BookingFee,
    Software,
    Decorations,
    Gifts,
    Donation,
    EntryFee,
    Other,
}

impl Default for ExpenseCategory {
    fn default() -> Self {
        ExpenseCategory::Other
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub member_ids: Vec<UserId>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Event {
    pub id: String,
    pub group_id: String,
    pub title: String,
    pub date: Option<DateTime<Utc>>,
}

/// Attendance record owned by the RSVP subsystem; this gateway only reads it.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Attendance {
    pub event_id: String,
    pub user_id: UserId,
    pub attended: bool,
}

/// Display snippet owned by the profile subsystem; this gateway only reads it.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    pub id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Expense {
    pub id: String,
    pub event_id: String,
    pub description: String,
    pub amount: Decimal,
    pub category: ExpenseCategory,
    pub paid_by: UserId,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One user's portion of an expense. Amounts across an expense's shares sum
/// to the expense amount to the cent.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ExpenseShare {
    pub id: String,
    pub expense_id: String,
    pub user_id: UserId,
    pub amount: Decimal,
    pub status: ShareStatus,
    pub payment_method: Option<PaymentMethod>,
    pub settled_at: Option<DateTime<Utc>>,
    pub settled_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
