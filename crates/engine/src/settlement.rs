//! Who owes whom.
//!
//! A [`SettlementReport`] is derived from a [`Ledger`] and the group roster
//! every time it is needed; nothing here is stored. Only paid transactions
//! count.
//!
//! Two views are produced:
//!
//! - the *net* view: `paid by member - paid by every other member`;
//! - the *share* view: what each member paid minus their share of the
//!   transactions (equal split over the roster, or the custom amounts).
//!
//! Net balances only cancel out between two people, so the net view yields
//! transfers for two-member groups alone. Larger groups are settled by the
//! share view.

use std::{cmp::Ordering, collections::BTreeMap, fmt};

use serde::Serialize;
use uuid::Uuid;

use crate::{
    EngineError, Group, Ledger, Money, Payer, ResultEngine, Split, Transaction,
    split::equal_allocation,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceStatus {
    /// Others owe this member.
    Owed,
    /// This member owes others.
    Owes,
    Settled,
}

impl BalanceStatus {
    fn of(amount: Money) -> Self {
        match amount.cents().cmp(&0) {
            Ordering::Greater => Self::Owed,
            Ordering::Less => Self::Owes,
            Ordering::Equal => Self::Settled,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MemberBalance {
    pub user_id: String,
    pub display_name: String,
    /// Sum of the paid transactions this member settled.
    pub paid: Money,
    pub net: Money,
    pub status: BalanceStatus,
    /// This member's part of every paid transaction.
    pub owed_share: Money,
    /// `paid - owed_share`.
    pub share_balance: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Transfer {
    pub from_user_id: String,
    pub from_name: String,
    pub to_user_id: String,
    pub to_name: String,
    pub amount: Money,
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} owes {} {}", self.from_name, self.to_name, self.amount)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SettlementReport {
    pub group_id: Uuid,
    /// Total settled by current members.
    pub total_paid: Money,
    /// One entry per roster member, in roster order.
    pub balances: Vec<MemberBalance>,
    /// Settles the net view for two members, the share view otherwise.
    pub transfers: Vec<Transfer>,
    /// Settles the share view.
    pub split_transfers: Vec<Transfer>,
    /// Paid by someone outside the roster, keyed by the name shown.
    pub external_paid: BTreeMap<String, Money>,
}

impl SettlementReport {
    pub fn compute(ledger: &Ledger, group: &Group) -> ResultEngine<Self> {
        if ledger.group_id() != group.id {
            return Err(EngineError::InvalidInput(format!(
                "ledger of group {} cannot settle group {}",
                ledger.group_id(),
                group.id
            )));
        }

        let mut paid: BTreeMap<&str, Money> = BTreeMap::new();
        let mut owed: BTreeMap<String, Money> = BTreeMap::new();
        let mut external_paid = BTreeMap::new();

        for tx in ledger.newest_first() {
            let Some(payer) = &tx.paid_by else {
                continue;
            };
            match payer {
                Payer::Member(user_id) if group.is_member(user_id) => {
                    *paid.entry(user_id.as_str()).or_insert(Money::ZERO) += tx.amount;
                    for (user_id, share) in shares(tx, user_id, group)? {
                        *owed.entry(user_id).or_insert(Money::ZERO) += share;
                    }
                }
                _ => {
                    *external_paid
                        .entry(group.payer_name(payer))
                        .or_insert(Money::ZERO) += tx.amount;
                }
            }
        }

        let total_paid: Money = paid.values().sum();
        let balances: Vec<MemberBalance> = group
            .members
            .iter()
            .map(|member| {
                let mine = paid.get(member.user_id.as_str()).copied().unwrap_or_default();
                let net = mine - (total_paid - mine);
                let owed_share = owed.get(&member.user_id).copied().unwrap_or_default();
                MemberBalance {
                    user_id: member.user_id.clone(),
                    display_name: member.display_name.clone(),
                    paid: mine,
                    net,
                    status: BalanceStatus::of(net),
                    owed_share,
                    share_balance: mine - owed_share,
                }
            })
            .collect();

        let split_transfers = settle(&balances, |b| b.share_balance);
        let transfers = if group.member_count() == 2 {
            settle(&balances, |b| b.net)
        } else {
            split_transfers.clone()
        };

        Ok(Self {
            group_id: group.id,
            total_paid,
            balances,
            transfers,
            split_transfers,
            external_paid,
        })
    }

    pub fn balance(&self, user_id: &str) -> Option<&MemberBalance> {
        self.balances.iter().find(|b| b.user_id == user_id)
    }

    pub fn net_balance(&self, user_id: &str) -> Option<Money> {
        self.balance(user_id).map(|b| b.net)
    }

    pub fn is_settled(&self) -> bool {
        self.balances
            .iter()
            .all(|b| b.status == BalanceStatus::Settled)
    }

    /// Human readable transfer lines, e.g. `B owes A 100.00`.
    pub fn lines(&self) -> Vec<String> {
        self.transfers.iter().map(ToString::to_string).collect()
    }
}

/// Each member's part of a paid transaction. The parts always add up to
/// `tx.amount`: whatever custom rounding or tolerance leaves over is charged
/// to the payer.
fn shares(tx: &Transaction, payer: &str, group: &Group) -> ResultEngine<Vec<(String, Money)>> {
    match &tx.split {
        Split::Equal => Ok(equal_allocation(tx.amount, group.member_ids())?
            .into_iter()
            .collect()),
        Split::Custom(_) => {
            let mut parts: Vec<(String, Money)> = tx
                .individual_amounts
                .iter()
                .map(|(user_id, amount)| (user_id.clone(), *amount))
                .collect();
            let residual = tx.amount - parts.iter().map(|(_, amount)| *amount).sum::<Money>();
            if !residual.is_zero() {
                match parts.iter_mut().find(|(user_id, _)| user_id == payer) {
                    Some((_, share)) => *share += residual,
                    None => parts.push((payer.to_string(), residual)),
                }
            }
            Ok(parts)
        }
    }
}

/// Greedy matching: the largest debtor pays the largest creditor until one of
/// them is even, then moves on.
fn settle(
    balances: &[MemberBalance],
    amount_of: impl Fn(&MemberBalance) -> Money,
) -> Vec<Transfer> {
    let mut creditors: Vec<(&MemberBalance, Money)> = balances
        .iter()
        .map(|b| (b, amount_of(b)))
        .filter(|(_, amount)| amount.is_positive())
        .collect();
    let mut debtors: Vec<(&MemberBalance, Money)> = balances
        .iter()
        .map(|b| (b, -amount_of(b)))
        .filter(|(_, amount)| amount.is_positive())
        .collect();
    creditors.sort_by(|a, b| b.1.cmp(&a.1));
    debtors.sort_by(|a, b| b.1.cmp(&a.1));

    let mut transfers = Vec::new();
    let (mut ci, mut di) = (0, 0);
    while ci < creditors.len() && di < debtors.len() {
        let amount = creditors[ci].1.min(debtors[di].1);
        let (creditor, debtor) = (creditors[ci].0, debtors[di].0);
        transfers.push(Transfer {
            from_user_id: debtor.user_id.clone(),
            from_name: debtor.display_name.clone(),
            to_user_id: creditor.user_id.clone(),
            to_name: creditor.display_name.clone(),
            amount,
        });
        creditors[ci].1 -= amount;
        debtors[di].1 -= amount;
        if creditors[ci].1.is_zero() {
            ci += 1;
        }
        if debtors[di].1.is_zero() {
            di += 1;
        }
    }
    transfers
}
