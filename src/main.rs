//! Portal watch daemon entry point.
//!
//! Fetches the machine list once, then keeps it current by polling each
//! machine's status and folding every payload through the reconciler. Status
//! transitions are logged as they land.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use log::{error, info, warn};
use tokio::signal;
use tokio::sync::{mpsc, RwLock};
use url::Url;

use vmportal::config::Config;
use vmportal::poller::{StatusPoller, StatusSource};
use vmportal::reconcile::{reconcile, ListResponse};
use vmportal::session::Session;
use vmportal::types::{Identified, VirtualMachine};
use vmportal::ApiClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    // Load configuration
    let cfg = Config::load()?;
    info!("Starting portal watcher with config: {:?}", cfg);

    // Token from config, else from the persisted session
    let token = match cfg.token.clone() {
        Some(token) => token,
        None => Session::load(&cfg.session_file)?
            .context("no token configured and no session file present")?
            .token,
    };

    let base = Url::parse(&cfg.api_base).context("invalid api_base")?;
    let client = Arc::new(ApiClient::new(
        base,
        token,
        Duration::from_secs(cfg.request_timeout_secs),
    )?);

    // Initial fetch; the local collection starts from this full refresh.
    let initial = if cfg.watch_all {
        client.all_vms().await?
    } else {
        client.my_vms().await?
    };
    let vms = match initial {
        ListResponse::Replace(vms) => vms,
        ListResponse::None => Vec::new(),
        ListResponse::Upsert(vm) => vec![vm],
    };
    info!("Initial fetch found {} machines", vms.len());

    // Shared state
    let state: Arc<RwLock<Vec<VirtualMachine>>> = Arc::new(RwLock::new(vms));

    // Update channel
    let (update_tx, mut update_rx) = mpsc::channel(128);

    // One poller per machine from the initial fetch. Machines created later
    // are only picked up by restarting the watcher with a fresh full fetch.
    let interval = Duration::from_secs(cfg.poll_interval_secs);
    let pollers: Vec<StatusPoller> = {
        let vms = state.read().await;
        vms.iter()
            .map(|vm| {
                StatusPoller::spawn(
                    Arc::clone(&client) as Arc<dyn StatusSource>,
                    vm.server_id.clone(),
                    interval,
                    update_tx.clone(),
                )
            })
            .collect()
    };
    drop(update_tx);

    // Applier task: sole writer of the collection.
    let state_for_apply = Arc::clone(&state);
    let apply_handle = tokio::spawn(async move {
        while let Some(response) = update_rx.recv().await {
            let mut vms = state_for_apply.write().await;
            let next = reconcile(&vms, &response);
            log_transitions(&vms, &next);
            *vms = next;
        }
    });

    // Graceful Shutdown
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl+C, shutting down...");
        }
        Err(err) => {
            error!("Unable to listen for shutdown signal: {}", err);
        }
    }

    // Stop polling, then the applier drains and ends.
    drop(pollers);
    if let Err(err) = apply_handle.await {
        warn!("Applier task ended abnormally: {}", err);
    }

    info!("Shutdown complete.");
    Ok(())
}

fn log_transitions(before: &[VirtualMachine], after: &[VirtualMachine]) {
    for vm in after {
        let old = before.iter().find(|old| old.identity() == vm.identity());
        match old {
            Some(old) if old.server_status != vm.server_status => {
                info!(
                    "{} ({}) status {} -> {}",
                    vm.server_name, vm.server_id, old.server_status, vm.server_status
                );
            }
            Some(_) => {}
            None => {
                info!(
                    "{} ({}) appeared with status {}",
                    vm.server_name, vm.server_id, vm.server_status
                );
            }
        }
    }
}
