use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::money::round_cents;
use crate::schemas::{ShareStatus, UserId};

/// A share joined with its expense's payer. The join happens in the store
/// before aggregation, so only fully-populated records flow through here.
#[derive(Clone, Debug, PartialEq)]
pub struct DebtRecord {
    pub share_id: String,
    pub debtor: UserId,
    pub creditor: UserId,
    pub amount: Decimal,
    pub status: ShareStatus,
}

/// Directional (debtor, creditor) key. A value type rather than a joined
/// string, so mirrored pairs can never collide.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct DebtPair {
    debtor: UserId,
    creditor: UserId,
}

/// The minimal remaining debt between two users, recomputed on demand and
/// never persisted.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NetSettlement {
    pub debtor: UserId,
    pub creditor: UserId,
    pub amount: Decimal,
    pub status: ShareStatus,
    pub expense_share_ids: Vec<String>,
}

#[derive(Default)]
struct Accumulated {
    amount: Decimal,
    share_ids: Vec<String>,
    verifying: bool,
}

/// Collapses raw debt records into net pairwise settlements.
///
/// Settled records never contribute. Mutual debts offset each other and a
/// single settlement is emitted in the positive-net direction; exact-zero
/// nets vanish. The emitted status comes from the surviving direction
/// (verifying if any of its shares is verifying), and the emitted share ids
/// are the union of both directions, since paying the net discharges the
/// offsetting shares as well.
pub fn compute_net_settlements(records: &[DebtRecord]) -> Vec<NetSettlement> {
    let mut gross: HashMap<DebtPair, Accumulated> = HashMap::new();

    for record in records {
        if record.status == ShareStatus::Settled || record.debtor == record.creditor {
            continue;
        }
        let pair = DebtPair {
            debtor: record.debtor.clone(),
            creditor: record.creditor.clone(),
        };
        let entry = gross.entry(pair).or_default();
        entry.amount += round_cents(record.amount);
        entry.share_ids.push(record.share_id.clone());
        if record.status == ShareStatus::Verifying {
            entry.verifying = true;
        }
    }

    let mut settlements = Vec::new();
    for (pair, forward) in &gross {
        let mirror = gross.get(&DebtPair {
            debtor: pair.creditor.clone(),
            creditor: pair.debtor.clone(),
        });
        // Visit each mutual pair once, from its lexicographically smaller side
        if mirror.is_some() && pair.debtor > pair.creditor {
            continue;
        }

        let net = round_cents(forward.amount - mirror.map_or(Decimal::ZERO, |m| m.amount));
        if net == Decimal::ZERO {
            continue;
        }

        let forward_wins = net > Decimal::ZERO;
        let (debtor, creditor) = if forward_wins {
            (pair.debtor.clone(), pair.creditor.clone())
        } else {
            (pair.creditor.clone(), pair.debtor.clone())
        };
        let surviving_verifying = if forward_wins {
            forward.verifying
        } else {
            mirror.is_some_and(|m| m.verifying)
        };

        let mut expense_share_ids = forward.share_ids.clone();
        if let Some(m) = mirror {
            expense_share_ids.extend(m.share_ids.iter().cloned());
        }

        settlements.push(NetSettlement {
            debtor,
            creditor,
            amount: net.abs(),
            status: if surviving_verifying {
                ShareStatus::Verifying
            } else {
                ShareStatus::Pending
            },
            expense_share_ids,
        });
    }

    // HashMap iteration order is arbitrary; sort so identical snapshots
    // produce identical responses.
    settlements.sort_by(|a, b| (&a.debtor, &a.creditor).cmp(&(&b.debtor, &b.creditor)));
    settlements
}
