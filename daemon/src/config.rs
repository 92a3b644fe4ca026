// Daemon configuration
//
// Command line flags, the JSON config file template, and the deployment
// defaults in one place. Every flag can also come from the config file;
// explicit flags win over file values because clap parses them last.

use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};
use sika_common::{
    config::{
        detect_available_parallelism, DEFAULT_REFERRAL_BONUS_BPS, DEFAULT_UTC_OFFSET_MINUTES,
        DEFAULT_WITHDRAWAL_EXPIRY_SECS, VERSION, WITHDRAWAL_SWEEP_INTERVAL_SECS,
    },
    logger::{LogLevel, ModuleConfig},
};

pub const DEFAULT_RPC_BIND_ADDRESS: &str = "127.0.0.1:8080";
pub const DEFAULT_STORAGE_DIRECTORY: &str = "ledger";
pub const DEFAULT_PROMETHEUS_ROUTE: &str = "/metrics";

// Functions Helpers
fn default_rpc_bind_address() -> String {
    DEFAULT_RPC_BIND_ADDRESS.to_owned()
}

fn default_storage_directory() -> String {
    DEFAULT_STORAGE_DIRECTORY.to_owned()
}

fn default_prometheus_route() -> String {
    DEFAULT_PROMETHEUS_ROUTE.to_owned()
}

fn default_log_filename() -> String {
    String::from("sika-daemon.log")
}

fn default_logs_path() -> String {
    String::from("logs/")
}

fn default_utc_offset_minutes() -> i32 {
    DEFAULT_UTC_OFFSET_MINUTES
}

fn default_referral_bonus_bps() -> u16 {
    DEFAULT_REFERRAL_BONUS_BPS
}

fn default_withdrawal_expiry() -> Duration {
    Duration::from_secs(DEFAULT_WITHDRAWAL_EXPIRY_SECS)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(WITHDRAWAL_SWEEP_INTERVAL_SECS)
}

#[derive(Debug, Clone, clap::Args, Serialize, Deserialize)]
pub struct RpcConfig {
    /// API server bind address
    #[clap(long, default_value_t = default_rpc_bind_address())]
    #[serde(default = "default_rpc_bind_address")]
    pub rpc_bind_address: String,
    /// Number of HTTP workers for the API server
    #[clap(long, default_value_t = detect_available_parallelism())]
    #[serde(default = "detect_available_parallelism")]
    pub rpc_threads: usize,
    /// Enable the Prometheus metrics exporter
    #[clap(long)]
    #[serde(default)]
    pub prometheus_enable: bool,
    /// Route serving Prometheus metrics
    #[clap(long, default_value_t = default_prometheus_route())]
    #[serde(default = "default_prometheus_route")]
    pub prometheus_route: String,
    /// Shared secret authenticating payout gateway callbacks
    ///
    /// Without it the daemon runs with an ephemeral random secret and every
    /// gateway callback is rejected.
    #[clap(long)]
    pub payout_gateway_secret: Option<String>,
}

#[derive(Debug, Clone, clap::Args, Serialize, Deserialize)]
pub struct LedgerOptions {
    /// Minutes added to UTC when deriving the ledger day
    ///
    /// Daily quotas and the (user, video, day) reward key roll over at
    /// midnight of this offset.
    #[clap(long, default_value_t = DEFAULT_UTC_OFFSET_MINUTES)]
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    /// Referral bonus in basis points of the referred user's first investment
    #[clap(long, default_value_t = DEFAULT_REFERRAL_BONUS_BPS)]
    #[serde(default = "default_referral_bonus_bps")]
    pub referral_bonus_bps: u16,
    /// JSON file holding the plan schedule
    ///
    /// Without it a built-in five-tier schedule is used.
    #[clap(long)]
    pub plan_schedule_file: Option<String>,
    /// Age after which a pending withdrawal is rejected by the sweep
    #[clap(long, value_parser = humantime::parse_duration, default_value = "48h")]
    #[serde(default = "default_withdrawal_expiry")]
    pub withdrawal_expiry: Duration,
    /// How often the expiry sweep runs
    #[clap(long, value_parser = humantime::parse_duration, default_value = "10m")]
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: Duration,
}

#[derive(Debug, Clone, clap::Args, Serialize, Deserialize)]
pub struct LogConfig {
    /// Set log level
    #[clap(long, value_enum, default_value_t)]
    #[serde(default)]
    pub log_level: LogLevel,
    /// Set file log level
    /// By default, it will be the same as log level
    #[clap(long, value_enum)]
    pub file_log_level: Option<LogLevel>,
    /// Disable the log file
    #[clap(long)]
    #[serde(default)]
    pub disable_file_logging: bool,
    /// Disable the usage of colors in log
    #[clap(long)]
    #[serde(default)]
    pub disable_log_color: bool,
    /// Log filename
    ///
    /// File will be stored in logs directory, this is only the filename,
    /// not the full path. Log file is rotated every day and has the format
    /// YYYY-MM-DD.sika-daemon.log.
    #[clap(long, default_value_t = default_log_filename())]
    #[serde(default = "default_log_filename")]
    pub filename_log: String,
    /// Logs directory
    ///
    /// By default it will be logs/ of the current directory.
    /// It must end with a / to be a valid folder.
    #[clap(long, default_value_t = default_logs_path())]
    #[serde(default = "default_logs_path")]
    pub logs_path: String,
    /// Module configuration for logs
    #[clap(long)]
    #[serde(default)]
    pub logs_modules: Vec<ModuleConfig>,
}

#[derive(Parser, Serialize, Deserialize, Clone)]
#[clap(
    version = VERSION,
    about = "Sika ledger daemon - earnings and withdrawals for the video-watch platform"
)]
pub struct Config {
    /// API server configuration
    #[clap(flatten)]
    pub rpc: RpcConfig,
    /// Ledger behavior configuration
    #[clap(flatten)]
    pub ledger: LedgerOptions,
    /// Log configuration
    #[clap(flatten)]
    pub log: LogConfig,
    /// Directory for the sled database
    #[clap(long, default_value_t = default_storage_directory())]
    #[serde(default = "default_storage_directory")]
    pub storage_directory: String,
    /// JSON File to load the configuration from
    #[clap(long)]
    #[serde(skip)]
    #[serde(default)]
    pub config_file: Option<String>,
    /// Generate the template at the `config_file` path
    #[clap(long)]
    #[serde(skip)]
    #[serde(default)]
    pub generate_config_template: bool,
}
