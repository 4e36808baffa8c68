//! Progress extraction from ffmpeg's diagnostic stream

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::domain::model::{JobId, ProgressSample};

static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"time=\s*(\d+):(\d{1,2}):(\d{1,2}(?:\.\d+)?)").expect("static regex")
});

/// Elapsed seconds reported by a `time=HH:MM:SS.ss` token anywhere in `line`
pub fn parse_elapsed(line: &str) -> Option<f64> {
    let caps = TIME_RE.captures(line)?;
    let hours: f64 = caps[1].parse().ok()?;
    let minutes: f64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// `min(100, 100 * elapsed / span)`, zero when the span is unknown
pub fn percent_complete(elapsed: f64, span: Option<f64>) -> f64 {
    match span {
        Some(span) if span > 0.0 && elapsed.is_finite() => {
            (100.0 * elapsed / span).clamp(0.0, 100.0)
        }
        _ => 0.0,
    }
}

/// Turns diagnostic lines into samples whose elapsed time never goes backwards
#[derive(Debug)]
pub struct ProgressTracker {
    job_id: JobId,
    span: Option<f64>,
    last_elapsed: Option<f64>,
}

impl ProgressTracker {
    pub fn new(job_id: JobId, span: Option<f64>) -> Self {
        Self {
            job_id,
            span,
            last_elapsed: None,
        }
    }

    /// Sample for `line`, or `None` for non-progress text and regressions
    pub fn observe(&mut self, line: &str) -> Option<ProgressSample> {
        let elapsed = parse_elapsed(line)?;
        if matches!(self.last_elapsed, Some(last) if elapsed < last) {
            return None;
        }
        self.last_elapsed = Some(elapsed);

        Some(ProgressSample {
            job_id: self.job_id,
            elapsed_seconds: elapsed,
            percent: percent_complete(elapsed, self.span),
        })
    }
}

/// Longest line buffered before it is handed out unsplit
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Line reader that splits on both `\n` and `\r`.
///
/// ffmpeg redraws its status line with carriage returns, so a plain
/// newline split would only surface progress at exit. Lines longer than
/// [`MAX_LINE_BYTES`] are cut into pieces of at most that size.
pub struct DiagnosticLines<R> {
    reader: R,
    pending: Vec<u8>,
    chunk: Box<[u8]>,
    eof: bool,
}

impl<R: AsyncRead + Unpin> DiagnosticLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: Vec::new(),
            chunk: vec![0u8; 4096].into_boxed_slice(),
            eof: false,
        }
    }

    /// Next non-empty line, `Ok(None)` once the stream is closed
    pub async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        loop {
            if let Some(pos) = self.pending.iter().position(|b| *b == b'\n' || *b == b'\r') {
                let raw: Vec<u8> = self.pending.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw[..raw.len() - 1]).trim().to_string();
                if line.is_empty() {
                    continue;
                }
                return Ok(Some(line));
            }

            if self.pending.len() >= MAX_LINE_BYTES {
                let raw: Vec<u8> = self.pending.drain(..MAX_LINE_BYTES).collect();
                let line = String::from_utf8_lossy(&raw).trim().to_string();
                if !line.is_empty() {
                    return Ok(Some(line));
                }
                continue;
            }

            if self.eof {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                let raw = std::mem::take(&mut self.pending);
                let line = String::from_utf8_lossy(&raw).trim().to_string();
                return Ok(if line.is_empty() { None } else { Some(line) });
            }

            let n = self.reader.read(&mut self.chunk).await?;
            if n == 0 {
                self.eof = true;
            } else {
                self.pending.extend_from_slice(&self.chunk[..n]);
            }
        }
    }
}
