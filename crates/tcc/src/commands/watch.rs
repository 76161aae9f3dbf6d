//! `tcc watch`: background polling, one block of output per cycle.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use tcc_core::{Controller, PollPhase, PollStatus};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::{status, util};

pub async fn handle(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (controller, _profile) = util::connect_with(global, |account| {
        if let Some(interval) = args.interval {
            account.poller.interval = interval;
        }
    })
    .await?;
    let result = run(&controller, &args, global).await;
    controller.shutdown().await;
    result
}

async fn run(controller: &Controller, args: &WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut status_rx = controller.poll_status()?;
    controller.spawn_polling().await?;

    let stop = CancellationToken::new();
    let on_signal = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let mut seen = status_rx.borrow().cycles;
    let mut printed = 0u32;

    loop {
        tokio::select! {
            biased;
            () = stop.cancelled() => break,
            changed = status_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        let status = status_rx.borrow_and_update().clone();
        if status.cycles == seen {
            continue;
        }
        seen = status.cycles;

        report_cycle(controller, &status, global)?;
        printed = printed.saturating_add(1);
        if args.count.is_some_and(|n| printed >= n) {
            break;
        }
    }

    debug!(cycles = printed, "watch stopped");
    Ok(())
}

fn report_cycle(controller: &Controller, status: &PollStatus, global: &GlobalOpts) -> Result<(), CliError> {
    let now = chrono::Local::now().format("%H:%M:%S");

    match status.last_outcome {
        Some(PollPhase::Success) => {
            if !global.quiet {
                eprintln!("── {now} ──");
            }
        }
        Some(PollPhase::DegradedStale) => {
            let reason = status.last_error.as_deref().unwrap_or("portal unavailable");
            eprintln!(
                "{}",
                output::warning(&format!(
                    "── {now} ── {reason}; showing previous data ({} failed in a row)",
                    status.consecutive_errors
                ))
            );
        }
        _ => {
            let reason = status.last_error.as_deref().unwrap_or("update failed");
            eprintln!("{}", output::warning(&format!("── {now} ── update failed: {reason}")));
            return Ok(());
        }
    }

    let rendered = status::render_snapshot(&controller.snapshot(), global)?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
