mod providers;

pub mod sled;

pub use self::{providers::*, sled::SledStorage};

use async_trait::async_trait;
use sika_common::error::LedgerResult;

/// Everything the ledger engines need from a storage backend.
///
/// All methods take `&self`: a backend is shared between request
/// handlers and the sweep through an `Arc` and is responsible for its
/// own write serialization, per entity, never globally. Two credits to
/// different investments must be able to land in parallel.
#[async_trait]
pub trait LedgerStorage:
    InvestmentProvider
    + RewardProvider
    + QuotaProvider
    + WithdrawalProvider
    + ReferralProvider
    + Sync
    + Send
    + 'static
{
    /// Push buffered writes to disk, used on shutdown
    async fn flush(&self) -> LedgerResult<()>;
}
