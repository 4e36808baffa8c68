//! Command implementations

use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::app::{AppContainer, AppContext};
use crate::cli::args::{LogArgs, ProbeArgs, ProcessArgs};
use crate::cli::render::{ConsoleRenderer, EventRenderer, JsonRenderer};
use crate::domain::model::{JobEvent, TimeSpec};

/// Exit code reported when the job was cancelled (128 + SIGINT)
const EXIT_CANCELLED: u8 = 130;

/// Execute the check command
pub async fn check(ctx: &AppContext) -> Result<ExitCode> {
    let tools = &ctx.config().tools;
    if ctx.check_tool_availability().await {
        println!(
            "ffmpeg ({}) and ffprobe ({}) are available",
            tools.ffmpeg.display(),
            tools.ffprobe.display()
        );
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!(
            "FFmpeg or FFprobe not found. Please install FFmpeg and ensure it's accessible from the command line."
        );
        Ok(ExitCode::FAILURE)
    }
}

/// Execute the probe command
pub async fn probe(ctx: &AppContext, args: ProbeArgs) -> Result<ExitCode> {
    let seconds = ctx
        .probe_duration(&args.input)
        .await
        .with_context(|| format!("Failed to probe {}", args.input.display()))?;

    if args.json {
        let output = serde_json::json!({
            "file": args.input,
            "duration": seconds,
        });
        println!("{}", output);
    } else {
        println!(
            "{}: {} ({:.3}s)",
            args.input.display(),
            TimeSpec::from_seconds(seconds),
            seconds
        );
    }
    Ok(ExitCode::SUCCESS)
}

/// Execute the process command.
///
/// Streams the job's events until its terminal one; Ctrl-C requests
/// cancellation and keeps waiting for the job to wind down.
pub async fn process(ctx: &AppContext, args: ProcessArgs) -> Result<ExitCode> {
    let params = args.to_params().context("Invalid processing arguments")?;
    let renderer: Box<dyn EventRenderer> = if args.json {
        Box::new(JsonRenderer)
    } else {
        Box::new(ConsoleRenderer::new(args.verbose))
    };

    let mut events = ctx.subscribe();
    let job_id = ctx
        .process_interactor()
        .start_with_probe(params.clone())
        .await
        .context("Failed to start processing")?;
    renderer.on_start(job_id, &params);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = events.recv_for(job_id) => {
                let event = event.context("Event stream closed before the job finished")?;
                renderer.on_event(&event);
                match event {
                    JobEvent::Progress(_) => {}
                    JobEvent::Completed { .. } => {
                        info!(job_id = %job_id, "Processing completed");
                        return Ok(ExitCode::SUCCESS);
                    }
                    JobEvent::Failed { .. } => return Ok(ExitCode::FAILURE),
                    JobEvent::Cancelled { .. } => return Ok(ExitCode::from(EXIT_CANCELLED)),
                }
            }
            result = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                if let Err(e) = result {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                    continue;
                }
                let outcome = ctx.cancel_processing(job_id);
                info!(job_id = %job_id, ?outcome, "Interrupted, cancelling job");
            }
        }
    }
}

/// Execute the log-path command
pub fn log_path(ctx: &AppContext) -> ExitCode {
    println!("{}", ctx.log_file_path().display());
    ExitCode::SUCCESS
}

/// Execute the log command
pub fn log(ctx: &AppContext, args: LogArgs) -> Result<ExitCode> {
    let path = ctx
        .write_log(&args.line())
        .context("Failed to write log line")?;
    debug!(path = %path.display(), "Log line written");
    Ok(ExitCode::SUCCESS)
}
