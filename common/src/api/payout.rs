// Payout gateway contract
//
// On approval the ledger emits a PayoutIntent for the gateway; the gateway
// answers later with a signed callback that settles or rejects the
// withdrawal. Callbacks are authenticated with HMAC-SHA256 over
// "{timestamp}.{body}" so a replayed or forged request cannot move money.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{
    config::PAYOUT_CALLBACK_MAX_AGE_SECONDS,
    ids::WithdrawalId,
    money::Amount,
    time::{get_current_time_in_seconds, TimestampMillis, TimestampSeconds},
    withdrawal::AccountDetails,
};

// HMAC-SHA256 type alias
type HmacSha256 = Hmac<Sha256>;

/// Header carrying the callback's Unix timestamp in seconds
pub const PAYOUT_TIMESTAMP_HEADER: &str = "X-Sika-Timestamp";

/// Header carrying the lowercase hex HMAC signature
pub const PAYOUT_SIGNATURE_HEADER: &str = "X-Sika-Signature";

/// Instruction for the payout gateway, produced when a withdrawal is
/// approved. The ledger holds no lock while this is in flight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PayoutIntent {
    pub withdrawal_id: WithdrawalId,
    pub amount: Amount,
    pub account_details: AccountDetails,
    pub created_at: TimestampMillis,
}

/// Terminal result reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    /// Funds delivered; the withdrawal settles.
    Success,
    /// Payout failed; the withdrawal rejects and the hold is released.
    Failure,
}

/// Callback body posted by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutCallback {
    pub withdrawal_id: WithdrawalId,
    pub status: PayoutStatus,
    /// Gateway-side transaction reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Gateway failure detail, recorded as the reject reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Timestamp of the callback (Unix seconds)
    pub timestamp: TimestampSeconds,
}

impl PayoutCallback {
    pub fn success(withdrawal_id: WithdrawalId, reference: String) -> Self {
        Self {
            withdrawal_id,
            status: PayoutStatus::Success,
            reference: Some(reference),
            error: None,
            timestamp: get_current_time_in_seconds(),
        }
    }

    pub fn failure(withdrawal_id: WithdrawalId, error: String) -> Self {
        Self {
            withdrawal_id,
            status: PayoutStatus::Failure,
            reference: None,
            error: Some(error),
            timestamp: get_current_time_in_seconds(),
        }
    }
}

/// Generate HMAC-SHA256 signature for a payout callback
///
/// Signature format:
/// 1. Concatenate: timestamp + "." + request_body
/// 2. Compute HMAC-SHA256 with the shared gateway secret
/// 3. Encode as lowercase hex
pub fn generate_payout_signature(secret: &[u8], timestamp: u64, body: &str) -> String {
    let payload = format!("{}.{}", timestamp, body);

    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    let result = mac.finalize();

    hex::encode(result.into_bytes())
}

/// Verify HMAC-SHA256 signature for a payout callback
///
/// Returns true only if the signature matches and the timestamp is within
/// the replay window in either direction.
pub fn verify_payout_signature(secret: &[u8], timestamp: u64, body: &str, signature: &str) -> bool {
    let now = get_current_time_in_seconds();
    if now > timestamp && now - timestamp > PAYOUT_CALLBACK_MAX_AGE_SECONDS {
        return false;
    }
    if timestamp > now && timestamp - now > PAYOUT_CALLBACK_MAX_AGE_SECONDS {
        return false;
    }

    let expected = generate_payout_signature(secret, timestamp, body);

    // Constant-time comparison
    constant_time_compare(expected.as_bytes(), signature.as_bytes())
}

/// Constant-time comparison to prevent timing attacks
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
