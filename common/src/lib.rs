pub mod api;
pub mod config;
pub mod error;
pub mod ids;
pub mod investment;
pub mod logger;
pub mod money;
pub mod plan;
pub mod quota;
pub mod referral;
pub mod reward;
pub mod time;
pub mod tokio;
pub mod withdrawal;
