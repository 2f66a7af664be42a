mod cli;
mod shutdown;

use std::pin::Pin;
use std::sync::Arc;

use clap::Parser;
use futures_core::Stream;

use cli::Cli;
use shutdown::{spawn_ctrl_c_handler, ShutdownController, ShutdownEvent};
use sim_core::{EngineEvent, Snapshot, SnapshotStream};
use sim_store::{FileRunStore, RunStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let live = cli.live;
    let persist = cli.persist;
    let run_id = cli.run_id.clone();
    let config = cli.into_config();

    let handle = if live {
        sim_core::start_run_live(config)
    } else {
        sim_core::start_run(config)
    }
    .map_err(|e| anyhow::anyhow!("failed to start run: {e}"))?;

    let store = persist.then(|| FileRunStore::new(&run_id));

    let shutdown = Arc::new(ShutdownController::new());
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::unbounded_channel();
    spawn_ctrl_c_handler(shutdown.clone(), shutdown_tx);

    let mut events = handle.events();
    let mut snapshots = handle.subscribe_live();

    loop {
        tokio::select! {
            Some(event) = shutdown_rx.recv() => {
                match event {
                    ShutdownEvent::Graceful => {
                        println!("stopping (press Ctrl-C again to force)...");
                        handle.stop();
                    }
                    ShutdownEvent::Immediate => {
                        println!("forced exit");
                        return Ok(());
                    }
                }
            }
            Some(snapshot) = next_snapshot(&mut snapshots) => {
                if let Some(store) = &store {
                    if let Err(e) = store.save_update(&snapshot).await {
                        tracing::warn!(error = %e, "failed to persist snapshot");
                    }
                }
                print_snapshot(&snapshot);
            }
            Ok(event) = events.recv() => {
                match event {
                    EngineEvent::Warning(msg) => eprintln!("warning: {msg}"),
                    EngineEvent::Stopped => break,
                    _ => {}
                }
            }
            else => break,
        }
    }

    let results = handle.results().await;
    if let Some(store) = &store {
        if let Err(e) = store.save_results(&results).await {
            tracing::warn!(error = %e, "failed to persist results");
        }
    }

    println!("\n== results ==");
    println!("fairness: {:.4}", results.fairness);
    for (tenant, throughput) in &results.throughput {
        let wait = results.avg_wait.get(tenant).copied().unwrap_or(0.0);
        println!("  {tenant}: throughput={throughput} avg_wait={wait:.2}");
    }

    Ok(())
}

fn print_snapshot(snapshot: &Snapshot) {
    println!(
        "t={:>7.2} queue={:<4} running={:<4} completed={:<5} cpu_util={:>5.1}%",
        snapshot.time,
        snapshot.queue_len,
        snapshot.running_jobs.len(),
        snapshot.completed_jobs,
        snapshot.cpu_util,
    );
}

async fn next_snapshot(stream: &mut SnapshotStream) -> Option<Snapshot> {
    std::future::poll_fn(|cx| Pin::new(&mut *stream).poll_next(cx)).await
}
