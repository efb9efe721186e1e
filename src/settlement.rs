use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::schemas::{ExpenseShare, ShareStatus, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    NotFound,
    NotDebtor,
    NotCreditor,
    AlreadySettled,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RejectedShare {
    pub share_id: String,
    pub reason: RejectReason,
}

/// Outcome of vetting a batch transition request: the ids that may move and
/// the ids that may not, with why. A batch partially succeeds rather than
/// failing atomically.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransitionPlan {
    pub eligible: Vec<String>,
    pub rejected: Vec<RejectedShare>,
}

/// Vets a debtor's "payment sent" request (pending -> verifying).
///
/// Only the debtor on a share may announce payment, and a settled share can
/// never move backwards. A share already verifying stays eligible so the
/// debtor can re-announce with a different payment method.
pub fn plan_mark_sent(
    requested: &[String],
    shares: &HashMap<String, ExpenseShare>,
    actor: &str,
) -> TransitionPlan {
    vet(requested, |id| {
        let share = match shares.get(id) {
            Some(share) => share,
            None => return Err(RejectReason::NotFound),
        };
        if share.user_id != actor {
            return Err(RejectReason::NotDebtor);
        }
        if share.status == ShareStatus::Settled {
            return Err(RejectReason::AlreadySettled);
        }
        Ok(())
    })
}

/// Vets a creditor's "payment received" request (-> settled).
///
/// Only the payer of the parent expense may confirm receipt, from either
/// pending or verifying; a debtor who never announced is still settled.
/// `payers` maps expense id to that expense's payer.
pub fn plan_mark_received(
    requested: &[String],
    shares: &HashMap<String, ExpenseShare>,
    payers: &HashMap<String, UserId>,
    actor: &str,
) -> TransitionPlan {
    vet(requested, |id| {
        let share = match shares.get(id) {
            Some(share) => share,
            None => return Err(RejectReason::NotFound),
        };
        match payers.get(&share.expense_id) {
            Some(payer) if payer == actor => {}
            Some(_) => return Err(RejectReason::NotCreditor),
            None => return Err(RejectReason::NotFound),
        }
        if share.status == ShareStatus::Settled {
            return Err(RejectReason::AlreadySettled);
        }
        Ok(())
    })
}

fn vet(
    requested: &[String],
    check: impl Fn(&str) -> Result<(), RejectReason>,
) -> TransitionPlan {
    let mut plan = TransitionPlan::default();
    let mut seen = HashSet::new();
    for id in requested {
        if !seen.insert(id.as_str()) {
            continue;
        }
        match check(id) {
            Ok(()) => plan.eligible.push(id.clone()),
            Err(reason) => plan.rejected.push(RejectedShare {
                share_id: id.clone(),
                reason,
            }),
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{compute_net_settlements, DebtRecord};
    use crate::schemas::{Expense, ExpenseCategory, PaymentMethod};
    use crate::shares::generate_shares;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn share(id: &str, expense_id: &str, user: &str, status: ShareStatus) -> ExpenseShare {
        let now = Utc::now();
        ExpenseShare {
            id: id.into(),
            expense_id: expense_id.into(),
            user_id: user.into(),
            amount: dec!(5.00),
            status,
            payment_method: None,
            settled_at: None,
            settled_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn by_id(shares: &[ExpenseShare]) -> HashMap<String, ExpenseShare> {
        shares.iter().map(|s| (s.id.clone(), s.clone())).collect()
    }

    #[test]
    fn foreign_shares_are_rejected_not_dropped() {
        let shares = by_id(&[
            share("s1", "e1", "alice", ShareStatus::Pending),
            share("s2", "e1", "bob", ShareStatus::Pending),
        ]);
        let plan = plan_mark_sent(
            &["s1".to_string(), "s2".to_string(), "ghost".to_string()],
            &shares,
            "alice",
        );
        assert_eq!(plan.eligible, vec!["s1".to_string()]);
        assert_eq!(
            plan.rejected,
            vec![
                RejectedShare { share_id: "s2".into(), reason: RejectReason::NotDebtor },
                RejectedShare { share_id: "ghost".into(), reason: RejectReason::NotFound },
            ]
        );
    }

    #[test]
    fn settled_shares_never_move_backwards() {
        let shares = by_id(&[share("s1", "e1", "alice", ShareStatus::Settled)]);
        let plan = plan_mark_sent(&["s1".to_string()], &shares, "alice");
        assert!(plan.eligible.is_empty());
        assert_eq!(plan.rejected[0].reason, RejectReason::AlreadySettled);
    }

    #[test]
    fn verifying_share_can_be_reannounced() {
        let shares = by_id(&[share("s1", "e1", "alice", ShareStatus::Verifying)]);
        let plan = plan_mark_sent(&["s1".to_string()], &shares, "alice");
        assert_eq!(plan.eligible, vec!["s1".to_string()]);
    }

    #[test]
    fn duplicate_ids_are_vetted_once() {
        let shares = by_id(&[share("s1", "e1", "alice", ShareStatus::Pending)]);
        let plan = plan_mark_sent(&["s1".to_string(), "s1".to_string()], &shares, "alice");
        assert_eq!(plan.eligible, vec!["s1".to_string()]);
        assert!(plan.rejected.is_empty());
    }

    #[test]
    fn only_the_expense_payer_confirms_receipt() {
        let shares = by_id(&[
            share("s1", "e1", "alice", ShareStatus::Verifying),
            share("s2", "e2", "alice", ShareStatus::Pending),
        ]);
        let payers: HashMap<String, UserId> = [
            ("e1".to_string(), "bob".to_string()),
            ("e2".to_string(), "carol".to_string()),
        ]
        .into();
        let plan = plan_mark_received(&["s1".to_string(), "s2".to_string()], &shares, &payers, "bob");
        assert_eq!(plan.eligible, vec!["s1".to_string()]);
        assert_eq!(plan.rejected[0].reason, RejectReason::NotCreditor);
    }

    #[test]
    fn receipt_is_accepted_straight_from_pending() {
        let shares = by_id(&[share("s1", "e1", "alice", ShareStatus::Pending)]);
        let payers: HashMap<String, UserId> = [("e1".to_string(), "bob".to_string())].into();
        let plan = plan_mark_received(&["s1".to_string()], &shares, &payers, "bob");
        assert_eq!(plan.eligible, vec!["s1".to_string()]);
    }

    // Full path: split a $100 expense three ways, debtor announces payment,
    // payer confirms, and the settle-up view drains to nothing.
    #[test]
    fn hundred_dollar_expense_settles_end_to_end() {
        let now = Utc::now();
        let expense = Expense {
            id: "e1".into(),
            event_id: "ev1".into(),
            description: "court".into(),
            amount: dec!(100.00),
            category: ExpenseCategory::Court,
            paid_by: "carol".into(),
            created_by: "carol".into(),
            created_at: now,
            updated_at: now,
        };
        let attendees = vec!["alice".to_string(), "bob".to_string(), "carol".to_string()];
        let mut shares = generate_shares(&expense, &attendees, now);
        assert_eq!(shares[0].amount, dec!(33.34)); // alice
        assert_eq!(shares[1].amount, dec!(33.33)); // bob
        assert_eq!(shares[2].status, ShareStatus::Settled); // carol paid

        let records = |shares: &[ExpenseShare]| -> Vec<DebtRecord> {
            shares
                .iter()
                .map(|s| DebtRecord {
                    share_id: s.id.clone(),
                    debtor: s.user_id.clone(),
                    creditor: expense.paid_by.clone(),
                    amount: s.amount,
                    status: s.status,
                })
                .collect()
        };

        let settlements = compute_net_settlements(&records(&shares));
        assert_eq!(settlements.len(), 2);
        assert!(settlements.iter().all(|s| s.creditor == "carol"));

        // alice marks her share as sent via venmo
        let alice_share_id = shares[0].id.clone();
        let plan = plan_mark_sent(&[alice_share_id.clone()], &by_id(&shares), "alice");
        assert_eq!(plan.eligible, vec![alice_share_id.clone()]);
        shares[0].status = ShareStatus::Verifying;
        shares[0].payment_method = Some(PaymentMethod::Venmo);

        let settlements = compute_net_settlements(&records(&shares));
        let alice_net = settlements.iter().find(|s| s.debtor == "alice").unwrap();
        assert_eq!(alice_net.status, ShareStatus::Verifying);

        // carol confirms receipt
        let payers: HashMap<String, UserId> = [("e1".to_string(), "carol".to_string())].into();
        let plan = plan_mark_received(&[alice_share_id.clone()], &by_id(&shares), &payers, "carol");
        assert_eq!(plan.eligible, vec![alice_share_id]);
        shares[0].status = ShareStatus::Settled;
        shares[0].settled_by = Some("carol".into());

        let settlements = compute_net_settlements(&records(&shares));
        assert_eq!(settlements.len(), 1);
        assert_eq!(settlements[0].debtor, "bob");
    }
}
