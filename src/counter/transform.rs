//! The tally-and-reply transform.
//!
//! Two passes over the batch: the first tallies every message by remote
//! address, the second walks the batch again in order and drains each
//! address's tally into a reply the first time the address is met. Later
//! messages from a drained address produce nothing, so an invocation emits
//! at most one reply per distinct address, attributed to the tag of that
//! address's first message and carrying its total count.

use super::tally::AddressTally;
use crate::codec::encode_count;
use crate::models::{InboundPackets, OutboundPacket, Response};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

/// Source of reply timestamps.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Format a reply timestamp: RFC3339, whole seconds, `Z` suffix.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Run the transform against the wall clock.
#[allow(dead_code)] // Entry point for embedding hosts; the CLI injects its clock
pub fn process(batch: &InboundPackets) -> Response {
    process_with_clock(batch, &SystemClock)
}

/// Run the transform, stamping each reply with `clock` at construction time.
pub fn process_with_clock<C: Clock + ?Sized>(batch: &InboundPackets, clock: &C) -> Response {
    let mut tally =
        AddressTally::from_addresses(batch.messages.iter().map(|m| m.remote_address()));

    let replies: Vec<OutboundPacket> = batch
        .messages
        .iter()
        .filter_map(|msg| {
            let count = tally.take(msg.remote_address())?;
            Some(OutboundPacket {
                generated_at: format_timestamp(clock.now()),
                tag: msg.tag.clone(),
                data: encode_count(count.get()),
            })
        })
        .collect();

    debug!(
        "Processed {} messages from {} addresses into {} replies",
        batch.messages.len(),
        tally.len(),
        replies.len()
    );

    Response { replies }
}
