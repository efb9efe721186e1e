use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::ledger::NetSettlement;
use crate::schemas::{Profile, ShareStatus, UserId};

/// One row of the settle-up view, ready for the client.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SettleUpItem {
    pub from: Profile,
    pub to: Profile,
    pub amount: Decimal,
    pub status: ShareStatus,
    pub expense_share_ids: Vec<String>,
}

/// Attaches profile snippets to net settlements. A settlement whose debtor
/// or creditor profile cannot be resolved is dropped rather than failing the
/// whole view; a dangling user reference must not break the list.
pub fn assemble_settle_up(
    settlements: Vec<NetSettlement>,
    profiles: &HashMap<UserId, Profile>,
) -> Vec<SettleUpItem> {
    settlements
        .into_iter()
        .filter_map(|settlement| {
            let from = profiles.get(&settlement.debtor)?.clone();
            let to = profiles.get(&settlement.creditor)?.clone();
            Some(SettleUpItem {
                from,
                to,
                amount: settlement.amount,
                status: settlement.status,
                expense_share_ids: settlement.expense_share_ids,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn profile(id: &str) -> Profile {
        Profile {
            id: id.into(),
            email: format!("{id}@example.com"),
            full_name: Some(id.to_uppercase()),
            avatar_url: None,
        }
    }

    fn settlement(debtor: &str, creditor: &str) -> NetSettlement {
        NetSettlement {
            debtor: debtor.into(),
            creditor: creditor.into(),
            amount: dec!(6.00),
            status: ShareStatus::Pending,
            expense_share_ids: vec!["s1".into()],
        }
    }

    #[test]
    fn attaches_profiles_on_both_sides() {
        let profiles: HashMap<UserId, Profile> = [
            ("alice".to_string(), profile("alice")),
            ("bob".to_string(), profile("bob")),
        ]
        .into();
        let items = assemble_settle_up(vec![settlement("alice", "bob")], &profiles);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].from.id, "alice");
        assert_eq!(items[0].to.id, "bob");
        assert_eq!(items[0].amount, dec!(6.00));
    }

    #[test]
    fn dangling_profile_drops_the_entry_not_the_list() {
        let profiles: HashMap<UserId, Profile> = [
            ("alice".to_string(), profile("alice")),
            ("bob".to_string(), profile("bob")),
        ]
        .into();
        let items = assemble_settle_up(
            vec![settlement("alice", "deleted-user"), settlement("alice", "bob")],
            &profiles,
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].to.id, "bob");
    }
}
