pub mod accrual;
pub mod activation;
pub mod ledger;
pub mod quota;
pub mod referral;
pub mod storage;
pub mod sweep;
pub mod withdrawal;

#[cfg(test)]
mod tests;
