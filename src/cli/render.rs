//! Event rendering for the process command

use std::io::Write;

use crate::domain::model::{JobEvent, JobId, ProcessingParams, TimeSpec};

const BAR_LENGTH: usize = 20;

/// Renders a job's lifecycle for the terminal
pub trait EventRenderer: Send + Sync {
    fn on_start(&self, job_id: JobId, params: &ProcessingParams);

    fn on_event(&self, event: &JobEvent);
}

/// Progress bar on stdout
pub struct ConsoleRenderer {
    verbose: bool,
}

impl ConsoleRenderer {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn bar(percent: f64) -> String {
        let filled = ((percent / 100.0) * BAR_LENGTH as f64).round() as usize;
        let filled = filled.min(BAR_LENGTH);
        "#".repeat(filled) + &"-".repeat(BAR_LENGTH - filled)
    }
}

impl EventRenderer for ConsoleRenderer {
    fn on_start(&self, job_id: JobId, params: &ProcessingParams) {
        println!(
            "Processing {} -> {}",
            params.input_file.display(),
            params.output_file.display()
        );
        if self.verbose {
            println!("   Job: {}", job_id);
            if let Some(window) = params.trim_window() {
                println!(
                    "   Trim: {} - {}",
                    TimeSpec::from_seconds(window.start),
                    TimeSpec::from_seconds(window.end)
                );
            }
        }
    }

    fn on_event(&self, event: &JobEvent) {
        let mut stdout = std::io::stdout().lock();
        let _ = match event {
            JobEvent::Progress(sample) => {
                let line = write!(
                    stdout,
                    "\r[{}] {:>5.1}% {}",
                    Self::bar(sample.percent),
                    sample.percent,
                    TimeSpec::from_seconds(sample.elapsed_seconds)
                );
                line.and_then(|_| stdout.flush())
            }
            JobEvent::Completed { .. } => writeln!(stdout, "\nCompleted"),
            JobEvent::Failed { error, .. } => writeln!(stdout, "\nFailed: {}", error),
            JobEvent::Cancelled { .. } => writeln!(stdout, "\nCancelled"),
        };
    }
}

/// One JSON object per line on stdout
pub struct JsonRenderer;

impl JsonRenderer {
    /// The event's own JSON plus its channel name and a timestamp
    pub fn render(event: &JobEvent) -> serde_json::Value {
        let mut value = serde_json::to_value(event).unwrap_or(serde_json::Value::Null);
        if let Some(object) = value.as_object_mut() {
            object.insert("channel".to_string(), event.channel().into());
            object.insert(
                "timestamp".to_string(),
                chrono::Utc::now().to_rfc3339().into(),
            );
        }
        value
    }
}

impl EventRenderer for JsonRenderer {
    fn on_start(&self, job_id: JobId, params: &ProcessingParams) {
        let event = serde_json::json!({
            "event": "start",
            "jobId": job_id,
            "params": params,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }

    fn on_event(&self, event: &JobEvent) {
        println!("{}", Self::render(event));
    }
}
