//! # CLI Interface
//!
//! Command-line structure for `reledger-node`, using `clap` derive. Every
//! network option can also be set from a `RELEDGER_*` environment variable.

use clap::{Args, Parser, Subcommand};
use std::time::Duration;

use reledger_protocol::config;
use reledger_workflows::FlowConfig;

use crate::logging::LogFormat;

/// reLedger attestation node.
///
/// Runs a complete attestation network (ledger authority, attesters,
/// brokers and a notary) in one process and serves it over HTTP.
#[derive(Parser, Debug)]
#[command(
    name = "reledger-node",
    about = "reLedger attestation node",
    version,
    propagate_version = true
)]
pub struct ReledgerNodeCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the network and serve the HTTP API.
    Run(RunArgs),
    /// Issue a single attestation on a fresh network and print it as JSON.
    Issue(IssueArgs),
    /// Print version information and exit.
    Version,
}

/// Options shared by every subcommand that starts a network.
#[derive(Args, Debug, Clone)]
pub struct NetworkArgs {
    /// Comma-separated names of the parties to start.
    #[arg(
        long,
        env = "RELEDGER_PARTIES",
        value_delimiter = ',',
        default_value = "reLedger,SellAttester,BuyAttester,Broker"
    )]
    pub parties: Vec<String>,

    /// Name of the notary.
    #[arg(long, env = "RELEDGER_NOTARY", default_value = "Notary")]
    pub notary: String,

    #[arg(long, env = "RELEDGER_SIGNING_TIMEOUT_MS", default_value_t = millis(config::DEFAULT_SIGNING_TIMEOUT))]
    pub signing_timeout_ms: u64,

    /// How long the broker waits for all counterparties to answer.
    #[arg(long, env = "RELEDGER_COUNTERPARTY_TIMEOUT_MS", default_value_t = millis(config::DEFAULT_COUNTERPARTY_TIMEOUT))]
    pub counterparty_timeout_ms: u64,

    /// How long the broker waits for the notary.
    #[arg(long, env = "RELEDGER_FINALITY_TIMEOUT_MS", default_value_t = millis(config::DEFAULT_FINALITY_TIMEOUT))]
    pub finality_timeout_ms: u64,

    #[arg(long, env = "RELEDGER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl NetworkArgs {
    pub fn flow_config(&self) -> FlowConfig {
        FlowConfig {
            signing_timeout: Duration::from_millis(self.signing_timeout_ms),
            counterparty_timeout: Duration::from_millis(self.counterparty_timeout_ms),
            finality_timeout: Duration::from_millis(self.finality_timeout_ms),
        }
    }
}

fn millis(d: Duration) -> u64 {
    d.as_millis() as u64
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub network: NetworkArgs,

    /// Port for the REST API.
    #[arg(long, env = "RELEDGER_RPC_PORT", default_value_t = config::DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "RELEDGER_METRICS_PORT", default_value_t = config::DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,
}

#[derive(Args, Debug)]
pub struct IssueArgs {
    #[command(flatten)]
    pub network: NetworkArgs,

    /// Party running the flow. Must be one of `--parties`.
    #[arg(long, default_value = "Broker")]
    pub broker: String,

    #[arg(long, default_value = "reLedger")]
    pub ledger_authority: String,

    #[arg(long, default_value = "SellAttester")]
    pub sell_attester: String,

    #[arg(long, default_value = "BuyAttester")]
    pub buy_attester: String,

    #[arg(long, default_value = "")]
    pub apt_number: String,

    #[arg(long, default_value = "")]
    pub address_line1: String,

    #[arg(long, default_value = "")]
    pub address_line2: String,

    #[arg(long, default_value = "")]
    pub city: String,

    #[arg(long, default_value = "")]
    pub state: String,

    #[arg(long, default_value = "")]
    pub zip_code: String,

    #[arg(long, default_value = "")]
    pub parcel_id: String,

    /// Closing price in the smallest currency unit.
    #[arg(long, allow_negative_numbers = true)]
    pub price: i64,

    #[arg(long)]
    pub selling_date: String,
}
