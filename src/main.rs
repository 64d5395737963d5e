mod comm;
mod config;
mod executor;
mod history;
mod policy;
mod service;

use comm::{Comm, UserRequest, UserResponse};
use config::GateConfig;
use executor::Executor;
use history::HistoryStore;
use service::ShellService;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::fmt;

/// Answer one request on its own task so slow commands do not block others
fn dispatch(service: &Arc<ShellService>, req: UserRequest) {
    let service = Arc::clone(service);
    tokio::spawn(async move {
        let (status, body) = service.handle_json(&req.content).await;
        info!(client = %req.source_addr, status, "request handled");
        if req.reply.send(UserResponse::new(status, body.to_string())).is_err() {
            error!(client = %req.source_addr, "reply channel closed before response");
        }
    });
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_max_level(config::log_level_from_env())
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    info!("Starting shellgate daemon...");
    let config = GateConfig::from_env()?;
    info!(
        port = config.comm.listen_port,
        spawn_mode = %config.executor.spawn_mode,
        default_timeout_ms = config.executor.constraints.default_timeout_ms,
        log_level = %config.log_level,
        "Configuration loaded"
    );

    let policy = Arc::new(policy::load_policy(&config.policy_path)?);
    info!(commands = policy.rules().len(), "Policy initialized");

    let history = Arc::new(HistoryStore::new(config.history_capacity));
    info!(capacity = history.capacity(), "History initialized");
    let executor = Arc::new(Executor::new(config.executor.clone(), policy, history));
    let service = Arc::new(ShellService::new(executor));

    let (comm, mut user_rx) = Comm::new(config.comm.clone()).await?;
    info!(addr = %comm.local_addr()?, "Comm initialized");

    let comm_handle = tokio::spawn(async move {
        if let Err(e) = comm.run().await {
            error!(error = %e, "Comm server error");
        }
    });

    info!("Entering main loop...");

    loop {
        tokio::select! {
            maybe_req = user_rx.recv() => {
                match maybe_req {
                    Some(req) => dispatch(&service, req),
                    None => {
                        error!("Comm channel closed");
                        break;
                    }
                }
            }
            _ = async {
                signal::ctrl_c().await.ok();
            } => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    info!("Shutting down...");
    comm_handle.abort();

    info!("Goodbye!");
    Ok(())
}
