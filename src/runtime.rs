//! Invocation host.
//!
//! Feeds invocation payloads from an async reader to the handler and writes
//! each result to an async writer. Every invocation is handled synchronously
//! with its own tally; the host only moves bytes.

use crate::config::{Config, RuntimeMode};
use crate::counter::Clock;
use crate::handler::{self, FailureEnvelope};
use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// Counters for one host run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostStats {
    /// Invocations attempted.
    pub invocations: usize,
    /// Invocations that produced a failure envelope.
    pub failures: usize,
}

impl HostStats {
    /// Returns true if every invocation succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.failures == 0
    }
}

/// Run the host in the mode selected by `config`.
pub async fn run<R, W, C>(reader: R, writer: &mut W, clock: &C, config: &Config) -> Result<HostStats>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    C: Clock + ?Sized,
{
    match config.runtime.mode {
        RuntimeMode::Single => run_single(reader, writer, clock, config).await,
        RuntimeMode::Stream => run_stream(reader, writer, clock, config).await,
    }
}

/// Treat the whole input as one invocation.
pub async fn run_single<R, W, C>(
    mut reader: R,
    writer: &mut W,
    clock: &C,
    config: &Config,
) -> Result<HostStats>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    C: Clock + ?Sized,
{
    let mut payload = Vec::new();
    reader
        .read_to_end(&mut payload)
        .await
        .context("Failed to read invocation payload")?;

    let ok = invoke(&payload, writer, clock, config).await?;
    writer.flush().await.context("Failed to flush output")?;

    Ok(HostStats {
        invocations: 1,
        failures: usize::from(!ok),
    })
}

/// Treat every non-blank input line as one invocation.
///
/// Each invocation writes exactly one output line. Lines are split on raw
/// bytes, so a line that is not UTF-8 fails as its own invocation. With
/// `continue_on_error` disabled, the stream stops after the first failed
/// invocation has written its envelope.
pub async fn run_stream<R, W, C>(
    reader: R,
    writer: &mut W,
    clock: &C,
    config: &Config,
) -> Result<HostStats>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    C: Clock + ?Sized,
{
    let mut stats = HostStats::default();
    let mut lines = reader.split(b'\n');

    while let Some(payload) = lines
        .next_segment()
        .await
        .context("Failed to read invocation line")?
    {
        if payload.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        stats.invocations += 1;
        debug!("Invocation #{}", stats.invocations);

        let ok = invoke(&payload, writer, clock, config).await?;
        writer.flush().await.context("Failed to flush output")?;

        if !ok {
            stats.failures += 1;
            if !config.runtime.continue_on_error {
                warn!("Invocation #{} failed; stopping stream", stats.invocations);
                break;
            }
        }
    }

    info!(
        "Stream finished: {} invocations, {} failed",
        stats.invocations, stats.failures
    );
    Ok(stats)
}

/// Handle one payload and write its result line. Returns whether it succeeded.
async fn invoke<W, C>(payload: &[u8], writer: &mut W, clock: &C, config: &Config) -> Result<bool>
where
    W: AsyncWrite + Unpin,
    C: Clock + ?Sized,
{
    let (body, ok) = match handler::handle(payload, clock, &config.output) {
        Ok(body) => (body, true),
        Err(e) => {
            warn!("Invocation failed: {}", e);
            (FailureEnvelope::from(&e).to_json(), false)
        }
    };

    writer
        .write_all(body.as_bytes())
        .await
        .context("Failed to write response")?;
    writer
        .write_all(b"\n")
        .await
        .context("Failed to write response")?;

    Ok(ok)
}
