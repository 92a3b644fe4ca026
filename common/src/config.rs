pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 2 decimal numbers (GHS pesewas)
pub const CASH_DECIMALS: u8 = 2;
// 100 minor units to represent 1.00 GHS
pub const CASH_UNIT: u64 = 10u64.pow(CASH_DECIMALS as u32);

// Basis points denominator (10000 = 100%)
pub const BPS_DENOMINATOR: u64 = 10_000;

// One calendar day in milliseconds
pub const MILLIS_PER_DAY: u64 = 86_400_000;

// Default referral bonus: 5% of the referred user's first activated investment
pub const DEFAULT_REFERRAL_BONUS_BPS: u16 = 500;

// Ledger days roll over on UTC midnight unless the deployment configures an offset
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 0;

// Pending withdrawals older than this are swept to Rejected and their hold released
pub const DEFAULT_WITHDRAWAL_EXPIRY_SECS: u64 = 48 * 60 * 60;

// How often the expiry sweep task scans pending withdrawals
pub const WITHDRAWAL_SWEEP_INTERVAL_SECS: u64 = 10 * 60;

// Payout callbacks older than this are refused (replay window)
pub const PAYOUT_CALLBACK_MAX_AGE_SECONDS: u64 = 300;

/// Available CPU parallelism, used as the default worker count.
pub fn detect_available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
