// Investment record storage provider trait

use async_trait::async_trait;
use sika_common::{
    error::LedgerResult,
    ids::{InvestmentId, UserId},
    investment::{Investment, InvestmentStatus},
};

/// Storage provider for investment records.
///
/// Balance mutations (credits, holds) are not here: they are only
/// reachable through [`RewardProvider::credit_earnings`] and the
/// reservation operations on [`WithdrawalProvider`], which keep the
/// money movement and its paper trail in one atomic write.
///
/// [`RewardProvider::credit_earnings`]: super::RewardProvider::credit_earnings
/// [`WithdrawalProvider`]: super::WithdrawalProvider
#[async_trait]
pub trait InvestmentProvider {
    /// Get an investment by id
    ///
    /// # Errors
    /// * `InvestmentNotFound` - No record with this id
    async fn get_investment(&self, id: &InvestmentId) -> LedgerResult<Investment>;

    /// Check if an investment exists
    async fn has_investment(&self, id: &InvestmentId) -> LedgerResult<bool>;

    /// All investments belonging to a user, oldest activation first
    async fn get_investments_by_user(&self, user: &UserId) -> LedgerResult<Vec<Investment>>;

    /// Insert a new investment record if the id is not already taken.
    ///
    /// Returns `None` when the record was created, or the previously
    /// stored record when the id exists. Activation events are
    /// replayable, so a duplicate id is an outcome here, not an error.
    async fn create_investment(&self, investment: &Investment)
        -> LedgerResult<Option<Investment>>;

    /// Move an investment through its lifecycle
    ///
    /// # Errors
    /// * `InvestmentNotFound` - No record with this id
    /// * `InvalidInvestmentTransition` - The lifecycle does not allow the move
    async fn set_investment_status(
        &self,
        id: &InvestmentId,
        to: InvestmentStatus,
    ) -> LedgerResult<Investment>;
}
