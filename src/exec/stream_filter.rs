// src/exec/stream_filter.rs

//! Forwarding of a child's stderr with known-benign lines dropped.

use std::sync::Arc;

use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A set of regexes matching stderr lines that are noise, not diagnostics.
#[derive(Debug, Clone, Default)]
pub struct StderrFilter {
    patterns: Vec<Regex>,
}

impl StderrFilter {
    /// Compile the patterns, skipping (and warning about) invalid ones.
    ///
    /// Config validation already rejects invalid patterns; this only matters
    /// for callers that build a filter by hand.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|p| match Regex::new(p.as_ref()) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(
                        pattern = %p.as_ref(),
                        error = %e,
                        "invalid suppress_stderr regex; ignoring"
                    );
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn is_suppressed(&self, line: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(line))
    }
}

/// Read `stream` line by line and hand every line the filter lets through to
/// `sink`.
///
/// Returns when the stream reaches EOF (the child exited or closed stderr).
pub async fn forward_lines<R, F>(stream: R, filter: &StderrFilter, mut sink: F) -> usize
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let reader = BufReader::new(stream);
    let mut lines = reader.lines();
    let mut suppressed = 0usize;

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if filter.is_suppressed(&line) {
                    suppressed += 1;
                    continue;
                }
                sink(&line);
            }
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "stderr stream ended with error");
                break;
            }
        }
    }

    suppressed
}

/// Spawn a background task forwarding `stream` to our own stderr.
pub fn spawn_stderr_forwarder<R>(
    stream: R,
    filter: Arc<StderrFilter>,
    generation: u64,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let suppressed = forward_lines(stream, &filter, |line| eprintln!("{line}")).await;
        debug!(generation, suppressed, "build stderr forwarder finished");
    })
}
