pub mod balance;
pub mod catalog;
pub mod error;
pub mod exchange;
pub mod merchant;
pub mod schemas;

pub use balance::compute_balances;
pub use error::{DirectoryError, SplitError};
pub use exchange::{get_fair_split, get_settlements};
pub use merchant::{MerchantDirectory, TrieNode};
pub use schemas::{ExpenseEvent, FairSplit, Settlement, SettlementMetrics, UserBalance};
