use serde::{Deserialize, Serialize};

pub type UserId = String;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseEvent {
    pub user_id: UserId,
    pub user_name: String,
    pub amount: f64,
}

/// Net position of one member: positive when the group owes them money.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBalance {
    pub user_id: UserId,
    pub name: String,
    pub balance: f64,
}

/// A directed transfer, `from` (a debtor) pays `amount` to `to` (a creditor).
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub from: UserId,
    pub to: UserId,
    pub amount: f64,
    pub from_name: String,
    pub to_name: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementMetrics {
    pub total_transactions: usize,
    pub total_amount: f64,
    pub max_possible_transactions: u128,
    pub efficiency: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FairSplit {
    pub balances: Vec<UserBalance>,
    pub settlements: Vec<Settlement>,
    pub metrics: SettlementMetrics,
}
