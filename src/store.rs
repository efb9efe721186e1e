use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::FindOptions;
use mongodb::{Client, Collection, Database};
use rust_decimal::Decimal;
use tracing::{error, warn};

use crate::error::ApiError;
use crate::ledger::DebtRecord;
use crate::schemas::{
    Attendance, Event, Expense, ExpenseShare, Group, PaymentMethod, Profile, UserId,
};

/// All database access behind one injected handle. Handlers never touch
/// collections directly, and the core never touches the database at all.
#[derive(Clone)]
pub struct Store {
    db: Database,
}

impl Store {
    pub fn new(client: &Client, db_name: &str) -> Self {
        Store {
            db: client.database(db_name),
        }
    }

    fn groups(&self) -> Collection<Group> {
        self.db.collection("groups")
    }

    fn events(&self) -> Collection<Event> {
        self.db.collection("events")
    }

    fn attendance(&self) -> Collection<Attendance> {
        self.db.collection("attendance")
    }

    fn profiles(&self) -> Collection<Profile> {
        self.db.collection("profiles")
    }

    fn expenses(&self) -> Collection<Expense> {
        self.db.collection("expenses")
    }

    fn shares(&self) -> Collection<ExpenseShare> {
        self.db.collection("expense_shares")
    }

    pub async fn ping(&self) -> Result<(), ApiError> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    pub async fn event(&self, event_id: &str) -> Result<Option<Event>, ApiError> {
        Ok(self.events().find_one(doc! { "id": event_id }, None).await?)
    }

    pub async fn expense(&self, expense_id: &str) -> Result<Option<Expense>, ApiError> {
        Ok(self
            .expenses()
            .find_one(doc! { "id": expense_id }, None)
            .await?)
    }

    pub async fn is_group_member(&self, group_id: &str, user_id: &str) -> Result<bool, ApiError> {
        let member = self
            .groups()
            .find_one(doc! { "id": group_id, "member_ids": user_id }, None)
            .await?;
        Ok(member.is_some())
    }

    pub async fn group_ids_for_member(&self, user_id: &str) -> Result<Vec<String>, ApiError> {
        let groups: Vec<Group> = self
            .groups()
            .find(doc! { "member_ids": user_id }, None)
            .await?
            .try_collect()
            .await?;
        Ok(groups.into_iter().map(|g| g.id).collect())
    }

    pub async fn event_ids_in_groups(&self, group_ids: &[String]) -> Result<Vec<String>, ApiError> {
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }
        let events: Vec<Event> = self
            .events()
            .find(doc! { "group_id": { "$in": group_ids.to_vec() } }, None)
            .await?
            .try_collect()
            .await?;
        Ok(events.into_iter().map(|e| e.id).collect())
    }

    /// Confirmed attendee ids for an event, sorted ascending so the rounding
    /// remainder always lands on the same attendee.
    pub async fn attendee_ids(&self, event_id: &str) -> Result<Vec<UserId>, ApiError> {
        let options = FindOptions::builder().sort(doc! { "user_id": 1 }).build();
        let records: Vec<Attendance> = self
            .attendance()
            .find(doc! { "event_id": event_id, "attended": true }, options)
            .await?
            .try_collect()
            .await?;
        let mut ids: Vec<UserId> = records.into_iter().map(|a| a.user_id).collect();
        ids.dedup();
        Ok(ids)
    }

    pub async fn profiles_by_ids(
        &self,
        user_ids: &[UserId],
    ) -> Result<HashMap<UserId, Profile>, ApiError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let profiles: Vec<Profile> = self
            .profiles()
            .find(doc! { "id": { "$in": user_ids.to_vec() } }, None)
            .await?
            .try_collect()
            .await?;
        Ok(profiles.into_iter().map(|p| (p.id.clone(), p)).collect())
    }

    /// Persists an expense and its share batch all-or-nothing. If the batch
    /// insert fails, both the shares and the parent expense are rolled back
    /// with compensating deletes before the error is surfaced.
    pub async fn insert_expense_with_shares(
        &self,
        expense: &Expense,
        shares: &[ExpenseShare],
    ) -> Result<(), ApiError> {
        self.expenses().insert_one(expense, None).await?;
        if shares.is_empty() {
            return Ok(());
        }
        if let Err(err) = self.shares().insert_many(shares, None).await {
            warn!(expense_id = %expense.id, %err, "share batch insert failed, rolling back");
            if let Err(cleanup) = self
                .shares()
                .delete_many(doc! { "expense_id": &expense.id }, None)
                .await
            {
                error!(expense_id = %expense.id, %cleanup, "failed to roll back shares");
            }
            if let Err(cleanup) = self
                .expenses()
                .delete_one(doc! { "id": &expense.id }, None)
                .await
            {
                error!(expense_id = %expense.id, %cleanup, "failed to roll back expense");
            }
            return Err(ApiError::Consistency(err.to_string()));
        }
        Ok(())
    }

    /// Shares of one expense in creation order (user id as tiebreak), the
    /// same order amount recomputation distributes the remainder in.
    pub async fn shares_for_expense(
        &self,
        expense_id: &str,
    ) -> Result<Vec<ExpenseShare>, ApiError> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": 1, "user_id": 1 })
            .build();
        Ok(self
            .shares()
            .find(doc! { "expense_id": expense_id }, options)
            .await?
            .try_collect()
            .await?)
    }

    pub async fn shares_by_ids(&self, share_ids: &[String]) -> Result<Vec<ExpenseShare>, ApiError> {
        if share_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .shares()
            .find(doc! { "id": { "$in": share_ids.to_vec() } }, None)
            .await?
            .try_collect()
            .await?)
    }

    pub async fn payers_for_expenses(
        &self,
        expense_ids: &[String],
    ) -> Result<HashMap<String, UserId>, ApiError> {
        if expense_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let expenses: Vec<Expense> = self
            .expenses()
            .find(doc! { "id": { "$in": expense_ids.to_vec() } }, None)
            .await?
            .try_collect()
            .await?;
        Ok(expenses.into_iter().map(|e| (e.id, e.paid_by)).collect())
    }

    /// Loads every non-settled share in the given events that involves
    /// `user_id` as debtor or creditor, joined with its expense's payer into
    /// fully-populated debt records for the aggregator.
    pub async fn debt_records_for_user(
        &self,
        user_id: &str,
        event_ids: &[String],
    ) -> Result<Vec<DebtRecord>, ApiError> {
        if event_ids.is_empty() {
            return Ok(Vec::new());
        }
        let expenses: Vec<Expense> = self
            .expenses()
            .find(doc! { "event_id": { "$in": event_ids.to_vec() } }, None)
            .await?
            .try_collect()
            .await?;
        if expenses.is_empty() {
            return Ok(Vec::new());
        }
        let expense_ids: Vec<String> = expenses.iter().map(|e| e.id.clone()).collect();
        let payer_by_expense: HashMap<String, UserId> =
            expenses.into_iter().map(|e| (e.id, e.paid_by)).collect();

        let options = FindOptions::builder()
            .sort(doc! { "created_at": 1, "id": 1 })
            .build();
        let shares: Vec<ExpenseShare> = self
            .shares()
            .find(
                doc! {
                    "expense_id": { "$in": expense_ids },
                    "status": { "$ne": "settled" },
                },
                options,
            )
            .await?
            .try_collect()
            .await?;

        Ok(shares
            .into_iter()
            .filter_map(|share| {
                let payer = payer_by_expense.get(&share.expense_id)?;
                if share.user_id != user_id && payer != user_id {
                    return None;
                }
                Some(DebtRecord {
                    share_id: share.id,
                    debtor: share.user_id,
                    creditor: payer.clone(),
                    amount: share.amount,
                    status: share.status,
                })
            })
            .collect())
    }

    pub async fn replace_expense(&self, expense: &Expense) -> Result<(), ApiError> {
        self.expenses()
            .replace_one(doc! { "id": &expense.id }, expense, None)
            .await?;
        Ok(())
    }

    pub async fn update_share_amounts(
        &self,
        updates: &[(String, Decimal)],
        now: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        for (share_id, amount) in updates {
            self.shares()
                .update_one(
                    doc! { "id": share_id },
                    doc! { "$set": {
                        "amount": bson::to_bson(amount)?,
                        "updated_at": bson::to_bson(&now)?,
                    }},
                    None,
                )
                .await?;
        }
        Ok(())
    }

    pub async fn delete_expense_cascade(&self, expense_id: &str) -> Result<(), ApiError> {
        self.shares()
            .delete_many(doc! { "expense_id": expense_id }, None)
            .await?;
        self.expenses()
            .delete_one(doc! { "id": expense_id }, None)
            .await?;
        Ok(())
    }

    /// pending/verifying -> verifying for the debtor's own shares. The actor
    /// and status conditions are re-applied in the filter, so a concurrent
    /// settle cannot be dragged backwards; matching rows win, the rest are
    /// simply not touched.
    pub async fn mark_shares_sent(
        &self,
        share_ids: &[String],
        actor: &str,
        method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Result<u64, ApiError> {
        if share_ids.is_empty() {
            return Ok(0);
        }
        let result = self
            .shares()
            .update_many(
                doc! {
                    "id": { "$in": share_ids.to_vec() },
                    "user_id": actor,
                    "status": { "$ne": "settled" },
                },
                doc! { "$set": {
                    "status": "verifying",
                    "payment_method": bson::to_bson(&method)?,
                    "updated_at": bson::to_bson(&now)?,
                }},
                None,
            )
            .await?;
        Ok(result.modified_count)
    }

    /// pending/verifying -> settled, stamped with the confirming creditor.
    /// Creditor ownership was vetted against the expense join at plan time;
    /// the filter still refuses to touch anything already settled.
    pub async fn mark_shares_received(
        &self,
        share_ids: &[String],
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, ApiError> {
        if share_ids.is_empty() {
            return Ok(0);
        }
        let result = self
            .shares()
            .update_many(
                doc! {
                    "id": { "$in": share_ids.to_vec() },
                    "status": { "$ne": "settled" },
                },
                doc! { "$set": {
                    "status": "settled",
                    "settled_at": bson::to_bson(&now)?,
                    "settled_by": actor,
                    "updated_at": bson::to_bson(&now)?,
                }},
                None,
            )
            .await?;
        Ok(result.modified_count)
    }
}
