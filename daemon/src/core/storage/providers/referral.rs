// Referral binding storage provider trait

use async_trait::async_trait;
use sika_common::{error::LedgerResult, ids::UserId, referral::ReferralBinding};

/// Storage provider for referrer bindings.
#[async_trait]
pub trait ReferralProvider {
    /// Get the binding for a user, None if the user never bound a
    /// referrer
    async fn get_referral_binding(&self, user: &UserId) -> LedgerResult<Option<ReferralBinding>>;

    /// Bind a referrer to a user, first writer wins.
    ///
    /// Returns `None` when the binding was created, or the existing
    /// binding when the user is already bound. Deciding whether an
    /// existing binding is a replay or a conflict is the engine's job.
    async fn bind_referrer(
        &self,
        binding: &ReferralBinding,
    ) -> LedgerResult<Option<ReferralBinding>>;
}
