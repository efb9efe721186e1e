use std::collections::HashMap;

use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AuthedUser;
use crate::error::ApiError;
use crate::ledger::compute_net_settlements;
use crate::money::round_cents;
use crate::presenter::assemble_settle_up;
use crate::schemas::{Expense, ExpenseCategory, ExpenseShare, PaymentMethod, Profile, UserId};
use crate::settlement::{plan_mark_received, plan_mark_sent};
use crate::shares::{generate_shares, recalculate_amounts};
use crate::store::Store;

#[derive(Deserialize)]
pub struct CreateExpenseRequest {
    pub event_id: String,
    pub description: Option<String>,
    pub amount: Decimal,
    #[serde(default)]
    pub category: ExpenseCategory,
    pub paid_by: UserId,
}

#[derive(Deserialize)]
pub struct UpdateExpenseRequest {
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub category: Option<ExpenseCategory>,
}

#[derive(Deserialize)]
pub struct SettleUpQuery {
    pub group_id: Option<String>,
}

#[derive(Deserialize)]
pub struct MarkSentRequest {
    pub expense_share_ids: Vec<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

#[derive(Deserialize)]
pub struct MarkReceivedRequest {
    pub expense_share_ids: Vec<String>,
}

#[derive(Serialize)]
struct ShareWithUser<'a> {
    #[serde(flatten)]
    share: &'a ExpenseShare,
    user: Option<&'a Profile>,
}

async fn require_member(store: &Store, group_id: &str, user_id: &str) -> Result<(), ApiError> {
    if store.is_group_member(group_id, user_id).await? {
        Ok(())
    } else {
        Err(ApiError::forbidden("you are not a member of this group"))
    }
}

/// Resolves an expense and checks the caller belongs to the owning group.
async fn load_member_expense(
    store: &Store,
    expense_id: &str,
    user_id: &str,
) -> Result<Expense, ApiError> {
    let expense = store
        .expense(expense_id)
        .await?
        .ok_or(ApiError::NotFound("expense"))?;
    let event = store
        .event(&expense.event_id)
        .await?
        .ok_or(ApiError::NotFound("event"))?;
    require_member(store, &event.group_id, user_id).await?;
    Ok(expense)
}

#[post("/api/expenses")]
pub async fn create_expense(
    user: AuthedUser,
    store: web::Data<Store>,
    body: web::Json<CreateExpenseRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    if body.amount <= Decimal::ZERO {
        return Err(ApiError::validation("amount must be a positive number"));
    }
    let event = store
        .event(&body.event_id)
        .await?
        .ok_or(ApiError::NotFound("event"))?;
    require_member(&store, &event.group_id, &user.id).await?;

    let now = Utc::now();
    let expense = Expense {
        id: Uuid::new_v4().to_string(),
        event_id: event.id.clone(),
        description: body.description.unwrap_or_else(|| "Expense".to_string()),
        amount: round_cents(body.amount),
        category: body.category,
        paid_by: body.paid_by,
        created_by: user.id.clone(),
        created_at: now,
        updated_at: now,
    };
    let attendees = store.attendee_ids(&event.id).await?;
    let shares = generate_shares(&expense, &attendees, now);
    store.insert_expense_with_shares(&expense, &shares).await?;
    info!(expense_id = %expense.id, shares = shares.len(), "expense created");

    Ok(HttpResponse::Created().json(json!({ "expense": expense, "shares": shares })))
}

#[get("/api/expenses/{id}")]
pub async fn get_expense(
    user: AuthedUser,
    store: web::Data<Store>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let expense = load_member_expense(&store, &path, &user.id).await?;
    let shares = store.shares_for_expense(&expense.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "expense": expense, "shares": shares })))
}

#[put("/api/expenses/{id}")]
pub async fn update_expense(
    user: AuthedUser,
    store: web::Data<Store>,
    path: web::Path<String>,
    body: web::Json<UpdateExpenseRequest>,
) -> Result<HttpResponse, ApiError> {
    let mut expense = store
        .expense(&path)
        .await?
        .ok_or(ApiError::NotFound("expense"))?;
    if expense.created_by != user.id && expense.paid_by != user.id {
        return Err(ApiError::forbidden(
            "only the creator or payer may update an expense",
        ));
    }

    let body = body.into_inner();
    let now = Utc::now();
    if let Some(description) = body.description {
        expense.description = description;
    }
    if let Some(category) = body.category {
        expense.category = category;
    }
    if let Some(amount) = body.amount {
        if amount <= Decimal::ZERO {
            return Err(ApiError::validation("amount must be a positive number"));
        }
        let amount = round_cents(amount);
        if amount != expense.amount {
            expense.amount = amount;
            // recompute over the existing debtor set, statuses untouched
            let shares = store.shares_for_expense(&expense.id).await?;
            let updates = recalculate_amounts(&shares, amount);
            store.update_share_amounts(&updates, now).await?;
            info!(expense_id = %expense.id, shares = updates.len(), "shares recalculated");
        }
    }
    expense.updated_at = now;
    store.replace_expense(&expense).await?;

    let shares = store.shares_for_expense(&expense.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "expense": expense, "shares": shares })))
}

#[delete("/api/expenses/{id}")]
pub async fn delete_expense(
    user: AuthedUser,
    store: web::Data<Store>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let expense = store
        .expense(&path)
        .await?
        .ok_or(ApiError::NotFound("expense"))?;
    if expense.created_by != user.id && expense.paid_by != user.id {
        return Err(ApiError::forbidden(
            "only the creator or payer may delete an expense",
        ));
    }
    store.delete_expense_cascade(&expense.id).await?;
    info!(expense_id = %expense.id, "expense deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "expense deleted" })))
}

#[get("/api/expenses/{id}/shares")]
pub async fn get_expense_shares(
    user: AuthedUser,
    store: web::Data<Store>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let expense = load_member_expense(&store, &path, &user.id).await?;
    let shares = store.shares_for_expense(&expense.id).await?;

    let mut user_ids: Vec<UserId> = shares.iter().map(|s| s.user_id.clone()).collect();
    user_ids.sort();
    user_ids.dedup();
    let profiles = store.profiles_by_ids(&user_ids).await?;

    let payload: Vec<ShareWithUser> = shares
        .iter()
        .map(|share| ShareWithUser {
            share,
            user: profiles.get(&share.user_id),
        })
        .collect();
    Ok(HttpResponse::Ok().json(json!({ "shares": payload })))
}

#[get("/api/expenses/settle-up/calculate")]
pub async fn settle_up(
    user: AuthedUser,
    store: web::Data<Store>,
    query: web::Query<SettleUpQuery>,
) -> Result<HttpResponse, ApiError> {
    let mut group_ids = store.group_ids_for_member(&user.id).await?;
    if let Some(filter) = &query.group_id {
        group_ids.retain(|id| id == filter);
    }
    let event_ids = store.event_ids_in_groups(&group_ids).await?;
    let records = store.debt_records_for_user(&user.id, &event_ids).await?;

    // the ledger is pure over the snapshot; the view only shows pairs the
    // caller is part of
    let settlements: Vec<_> = compute_net_settlements(&records)
        .into_iter()
        .filter(|s| s.debtor == user.id || s.creditor == user.id)
        .collect();

    let mut user_ids: Vec<UserId> = Vec::new();
    for settlement in &settlements {
        user_ids.push(settlement.debtor.clone());
        user_ids.push(settlement.creditor.clone());
    }
    user_ids.sort();
    user_ids.dedup();
    let profiles = store.profiles_by_ids(&user_ids).await?;

    let items = assemble_settle_up(settlements, &profiles);
    info!(user_id = %user.id, items = items.len(), "settle-up computed");
    Ok(HttpResponse::Ok().json(json!({ "settle_up_items": items })))
}

#[post("/api/expenses/settle-up/mark-sent")]
pub async fn mark_sent(
    user: AuthedUser,
    store: web::Data<Store>,
    body: web::Json<MarkSentRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    if body.expense_share_ids.is_empty() {
        return Err(ApiError::validation("expense_share_ids must not be empty"));
    }

    let shares = store.shares_by_ids(&body.expense_share_ids).await?;
    let by_id: HashMap<String, ExpenseShare> =
        shares.into_iter().map(|s| (s.id.clone(), s)).collect();
    let plan = plan_mark_sent(&body.expense_share_ids, &by_id, &user.id);
    if !plan.rejected.is_empty() {
        warn!(user_id = %user.id, rejected = plan.rejected.len(), "mark-sent rejected some shares");
    }

    let updated = store
        .mark_shares_sent(&plan.eligible, &user.id, body.payment_method, Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "payment marked as sent",
        "updated_share_ids": plan.eligible,
        "updated_count": updated,
        "rejected": plan.rejected,
    })))
}

#[post("/api/expenses/settle-up/mark-received")]
pub async fn mark_received(
    user: AuthedUser,
    store: web::Data<Store>,
    body: web::Json<MarkReceivedRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    if body.expense_share_ids.is_empty() {
        return Err(ApiError::validation("expense_share_ids must not be empty"));
    }

    let shares = store.shares_by_ids(&body.expense_share_ids).await?;
    let mut expense_ids: Vec<String> = shares.iter().map(|s| s.expense_id.clone()).collect();
    expense_ids.sort();
    expense_ids.dedup();
    let payers = store.payers_for_expenses(&expense_ids).await?;

    let by_id: HashMap<String, ExpenseShare> =
        shares.into_iter().map(|s| (s.id.clone(), s)).collect();
    let plan = plan_mark_received(&body.expense_share_ids, &by_id, &payers, &user.id);
    if !plan.rejected.is_empty() {
        warn!(user_id = %user.id, rejected = plan.rejected.len(), "mark-received rejected some shares");
    }

    let updated = store
        .mark_shares_received(&plan.eligible, &user.id, Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "payment marked as received",
        "updated_share_ids": plan.eligible,
        "updated_count": updated,
        "rejected": plan.rejected,
    })))
}
