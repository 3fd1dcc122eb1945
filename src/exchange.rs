use crate::balance::compute_balances;
use crate::error::SplitError;
use crate::schemas::{ExpenseEvent, FairSplit, Settlement, SettlementMetrics, UserBalance};
use tracing::debug;

/// Decimal places kept for the efficiency percentage of a report.
pub const EFFICIENCY_DECIMALS: i32 = 2;

#[derive(Clone, Debug)]
struct PersonalBalance<'a> {
    id: &'a str,
    name: &'a str,
    remaining: f64,
}

impl<'a> PersonalBalance<'a> {
    fn magnitude_of(balance: &'a UserBalance) -> Self {
        PersonalBalance {
            id: &balance.user_id,
            name: &balance.name,
            remaining: balance.balance.abs(),
        }
    }
}

/// Reduces balances to point-to-point transfers.
///
/// Creditors and debtors are matched greedily in input order, without sorting
/// by magnitude, so the plan is at most `n - 1` transfers but not necessarily
/// the smallest one. Balances that do not net to zero leave the excess side
/// unmatched.
pub fn get_settlements(balances: &[UserBalance]) -> Vec<Settlement> {
    // Divide people into creditors and debtors
    let mut creditors: Vec<PersonalBalance> = balances
        .iter()
        .filter(|b| b.balance > 0.0)
        .map(PersonalBalance::magnitude_of)
        .collect();
    let mut debtors: Vec<PersonalBalance> = balances
        .iter()
        .filter(|b| b.balance < 0.0)
        .map(PersonalBalance::magnitude_of)
        .collect();

    let mut settlements = Vec::new();
    let mut creditor_index = 0;
    let mut debtor_index = 0;

    while creditor_index < creditors.len() && debtor_index < debtors.len() {
        let creditor = &mut creditors[creditor_index];
        let debtor = &mut debtors[debtor_index];

        let amount = creditor.remaining.min(debtor.remaining);
        settlements.push(Settlement {
            from: debtor.id.to_owned(),
            to: creditor.id.to_owned(),
            amount,
            from_name: debtor.name.to_owned(),
            to_name: creditor.name.to_owned(),
        });

        creditor.remaining -= amount;
        debtor.remaining -= amount;

        // Whichever side was the minimum lands on exactly zero
        if creditor.remaining == 0.0 {
            creditor_index += 1;
        }
        if debtor.remaining == 0.0 {
            debtor_index += 1;
        }
    }

    debug!(
        creditors = creditors.len(),
        debtors = debtors.len(),
        settlements = settlements.len(),
        "settled balances"
    );
    settlements
}

fn round_to_decimals(n: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (n * factor).round() / factor
}

impl SettlementMetrics {
    /// Compares the plan with the `n * (n - 1) / 2` transfers needed when
    /// every pair of members settles directly.
    pub fn from_settlements(settlements: &[Settlement], member_count: usize) -> Self {
        let total_transactions = settlements.len();
        let total_amount = settlements.iter().map(|s| s.amount).sum();
        let members = member_count as u128;
        let max_possible_transactions = members * members.saturating_sub(1) / 2;
        let efficiency = if max_possible_transactions > 0 {
            let max = max_possible_transactions as f64;
            (max - total_transactions as f64) / max * 100.0
        } else {
            100.0
        };

        SettlementMetrics {
            total_transactions,
            total_amount,
            max_possible_transactions,
            efficiency: round_to_decimals(efficiency, EFFICIENCY_DECIMALS),
        }
    }
}

pub fn get_fair_split(events: &[ExpenseEvent], member_count: usize) -> Result<FairSplit, SplitError> {
    let balances = compute_balances(events, member_count)?;
    let settlements = get_settlements(&balances);
    let metrics = SettlementMetrics::from_settlements(&settlements, member_count);

    Ok(FairSplit {
        balances,
        settlements,
        metrics,
    })
}
