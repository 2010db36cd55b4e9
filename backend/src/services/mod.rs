pub mod auth;
pub mod breakdown;
pub mod carry_forward;
pub mod deposits;
pub mod expenses;
pub mod export;
pub mod houses;
pub mod ledger;
pub mod meals;
pub mod members;
pub mod reports;
pub mod settlement;
pub mod summaries;
