use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::SplitError;
use crate::schemas::{ExpenseEvent, UserBalance};

struct UserTotal<'a> {
    name: &'a str,
    spent: f64,
}

/// Folds expense events into one balance per contributor, in first-seen order.
///
/// `member_count` is the size of the whole group, so members that never paid
/// still shrink everyone's fair share. They only show up in the result if the
/// caller feeds a zero-amount event for them.
pub fn compute_balances(
    events: &[ExpenseEvent],
    member_count: usize,
) -> Result<Vec<UserBalance>, SplitError> {
    if member_count == 0 {
        return Err(SplitError::EmptyGroup);
    }

    let mut totals: IndexMap<&str, UserTotal> = IndexMap::new();
    let mut total_expenses = 0.0;
    for event in events {
        let amount = event.amount;
        totals
            .entry(event.user_id.as_str())
            .and_modify(|total| total.spent += amount)
            .or_insert(UserTotal {
                name: &event.user_name,
                spent: amount,
            });
        total_expenses += amount;
    }

    let fair_share = total_expenses / member_count as f64;
    if totals.len() != member_count {
        warn!(
            contributors = totals.len(),
            member_count, "contributors differ from group members, balances will not net to zero"
        );
    }
    debug!(events = events.len(), total_expenses, fair_share, "computed group balances");

    Ok(totals
        .into_iter()
        .map(|(user_id, total)| UserBalance {
            user_id: user_id.to_owned(),
            name: total.name.to_owned(),
            balance: total.spent - fair_share,
        })
        .collect())
}
