use async_trait::async_trait;
use log::{debug, trace};
use sika_common::{
    error::{LedgerError, LedgerResult},
    ids::UserId,
    referral::ReferralBinding,
};

use crate::core::storage::{sled::LockKey, ReferralProvider, SledStorage};

#[async_trait]
impl ReferralProvider for SledStorage {
    async fn get_referral_binding(&self, user: &UserId) -> LedgerResult<Option<ReferralBinding>> {
        trace!("get referral binding for {}", user);
        Self::load_optional(&self.referrals, user.as_str().as_bytes())
    }

    async fn bind_referrer(
        &self,
        binding: &ReferralBinding,
    ) -> LedgerResult<Option<ReferralBinding>> {
        let _guard = self
            .guard(LockKey::Referral(binding.user_id.clone()))
            .await;

        let key = binding.user_id.as_str().as_bytes();
        if let Some(existing) = Self::load_optional::<ReferralBinding>(&self.referrals, key)? {
            return Ok(Some(existing));
        }

        debug!("bind {} to referrer {}", binding.user_id, binding.referrer_id);
        self.referrals
            .insert(key, Self::encode(binding)?)
            .map_err(LedgerError::storage)?;
        Ok(None)
    }
}
