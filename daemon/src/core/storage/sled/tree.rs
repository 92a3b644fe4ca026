use strum::{AsRefStr, Display, EnumIter};

// Composite keys join their parts with a single zero byte. User ids
// never contain NUL, so the join is prefix-free.
pub const KEY_SEPARATOR: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Eq, Ord, Hash, EnumIter, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Tree {
    // All investment records
    // {investment_id} => {Investment}
    Investments,
    // Ownership index
    // {user_id}{investment_id} => {}
    InvestmentsByUser,

    // Reward events, keyed by their idempotency key so the key check
    // and the insert are one operation
    // {idempotency_key_json} => {RewardEvent}
    Rewards,
    // Day index used for daily stats and history
    // {user_id}{day}{reward_id} => {idempotency_key_json}
    RewardsByUserDay,

    // Watch counters, one row per user per day
    // {user_id}{day} => {DailyQuota}
    Quotas,

    // All withdrawal requests
    // {withdrawal_id} => {WithdrawalRequest}
    Withdrawals,
    // Requests per investment
    // {investment_id}{withdrawal_id} => {}
    WithdrawalsByInvestment,
    // Requests awaiting a decision, scanned by the expiry sweep
    // {withdrawal_id} => {}
    PendingWithdrawals,

    // Balance holds
    // {reservation_id} => {Reservation}
    Reservations,

    // Referrer bindings, one per referred user
    // {user_id} => {ReferralBinding}
    Referrals,
}
