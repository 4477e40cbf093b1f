//! # reLedger Node
//!
//! Entry point for the `reledger-node` binary. Parses CLI arguments,
//! initializes logging and metrics, starts a local attestation network and
//! serves it over HTTP.
//!
//! Subcommands:
//!
//! - `run`     start the network and serve the API
//! - `issue`   issue one attestation and print it as JSON
//! - `version` print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinHandle;

use reledger_workflows::{LocalNetwork, LocalNetworkBuilder};

use cli::{Commands, NetworkArgs, ReledgerNodeCli};
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ReledgerNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Issue(args) => issue_once(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

fn start_network(args: &NetworkArgs) -> Result<LocalNetwork> {
    if args.parties.is_empty() {
        anyhow::bail!("at least one party is required");
    }
    let mut builder = LocalNetworkBuilder::new()
        .config(args.flow_config())
        .notary(args.notary.clone());
    for name in &args.parties {
        if name.is_empty() || *name == args.notary {
            anyhow::bail!("invalid party name {name:?}");
        }
        builder = builder.party(name.clone());
    }
    Ok(builder.start())
}

/// Forward every node's responder outcomes to the metrics registry.
fn watch_responders(network: &LocalNetwork, metrics: &Arc<NodeMetrics>) -> Vec<JoinHandle<()>> {
    network
        .nodes()
        .map(|node| {
            let mut events = node.subscribe();
            let metrics = Arc::clone(metrics);
            tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(event) => metrics.record_responder(&event.outcome),
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(skipped = n, "responder events lagged");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            })
        })
        .collect()
}

async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(logging::DEFAULT_FILTER, args.network.log_format);

    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        parties = ?args.network.parties,
        notary = %args.network.notary,
        "starting reledger-node"
    );

    let network = Arc::new(start_network(&args.network)?);
    let node_metrics = Arc::new(NodeMetrics::new());
    node_metrics
        .network_parties
        .set(network.nodes().count() as i64);
    let watchers = watch_responders(&network, &node_metrics);

    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            reledger_protocol::config::PROTOCOL_VERSION,
        ),
        network: Arc::clone(&network),
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    for watcher in watchers {
        watcher.abort();
    }
    tracing::info!("reledger-node stopped");
    Ok(())
}

/// Start a network, issue one attestation from `--broker`, print it.
async fn issue_once(args: cli::IssueArgs) -> Result<()> {
    logging::init_logging(logging::DEFAULT_FILTER, args.network.log_format);

    let network = start_network(&args.network)?;
    let node_metrics = Arc::new(NodeMetrics::new());
    let broker = network
        .node(&args.broker)
        .with_context(|| format!("broker {} is not one of the local parties", args.broker))?;

    let request = api::resolve_request(
        &network,
        api::IssueRequest {
            broker: args.broker.clone(),
            apt_number: args.apt_number,
            address_line1: args.address_line1,
            address_line2: args.address_line2,
            city: args.city,
            state: args.state,
            zip_code: args.zip_code,
            parcel_id: args.parcel_id,
            price: Some(args.price),
            selling_date: Some(args.selling_date),
            ledger_authority: args.ledger_authority,
            sell_attester: args.sell_attester,
            buy_attester: args.buy_attester,
        },
    )
    .context("invalid attestation request")?;

    let stx = api::run_issuance(&node_metrics, &broker, request)
        .await
        .context("attestation issuance failed")?;
    let summary = api::AttestationSummary::from_signed(&stx)
        .context("finalised transaction has no attestation output")?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn print_version() {
    println!("reledger-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol      {}", reledger_protocol::config::PROTOCOL_VERSION);
    println!("tx version    {}", reledger_protocol::config::TRANSACTION_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
