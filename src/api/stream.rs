//! Drives a progress event stream to its final `TripPlan`.

use std::fmt::Display;
use std::future::Future;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::{debug, warn};

use super::sse::{ParseResult, SseParser};
use crate::core::models::{StreamProgress, TripPlan};
use crate::errors::PlannerError;

/// Incremental state for one plan stream: UTF-8 carry-over, block framing
/// and the latest plan seen.
#[derive(Debug, Default)]
pub struct PlanStreamState {
    parser: SseParser,
    utf8_buffer: Vec<u8>,
    plan: Option<TripPlan>,
    events_seen: usize,
}

impl PlanStreamState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `bytes`, then handles every block they complete, calling
    /// `on_progress` once per event in stream order.
    ///
    /// # Errors
    ///
    /// Returns `StreamReported` when an event carries `error` (after its
    /// callback), `MalformedEvent` for a well-formed event of the wrong shape
    /// and `Transport` for invalid UTF-8.
    pub fn push_bytes<F>(&mut self, bytes: &[u8], on_progress: &mut F) -> Result<(), PlannerError>
    where
        F: FnMut(&StreamProgress),
    {
        // Hold an incomplete trailing code point until the next chunk arrives.
        self.utf8_buffer.extend_from_slice(bytes);

        let text = match std::str::from_utf8(&self.utf8_buffer) {
            Ok(valid) => {
                let text = valid.to_string();
                self.utf8_buffer.clear();
                text
            }
            Err(e) => {
                if e.error_len().is_some() {
                    return Err(PlannerError::Transport(
                        "Invalid UTF-8 in trip plan stream".to_string(),
                    ));
                }
                let valid_up_to = e.valid_up_to();
                let text = String::from_utf8_lossy(&self.utf8_buffer[..valid_up_to]).into_owned();
                self.utf8_buffer.drain(..valid_up_to);
                text
            }
        };

        for block in self.parser.feed(&text) {
            self.handle_block(&block, on_progress)?;
        }
        Ok(())
    }

    fn handle_block<F>(&mut self, block: &str, on_progress: &mut F) -> Result<(), PlannerError>
    where
        F: FnMut(&StreamProgress),
    {
        match SseParser::parse_block(block) {
            ParseResult::Progress(progress) => {
                self.events_seen += 1;
                debug!(
                    step = progress.step,
                    status = %progress.status,
                    progress = progress.progress,
                    "Trip plan progress"
                );
                on_progress(progress.as_ref());

                let StreamProgress { data, error, .. } = *progress;
                if let Some(plan) = data {
                    self.plan = Some(plan);
                }
                if let Some(message) = error {
                    warn!(error = %message, "Trip planner reported an error mid-stream");
                    return Err(PlannerError::StreamReported(message));
                }
                Ok(())
            }
            ParseResult::Ignored => {
                debug!("Ignoring non-data stream block");
                Ok(())
            }
            ParseResult::Truncated(reason) => {
                debug!(reason = %reason, "Skipping incomplete stream block");
                Ok(())
            }
            ParseResult::Invalid(reason) => Err(PlannerError::MalformedEvent(reason)),
        }
    }

    /// Ends the stream, yielding the last plan received.
    ///
    /// # Errors
    ///
    /// Returns `NoPlanReceived` if no event carried plan data.
    pub fn finish(self) -> Result<TripPlan, PlannerError> {
        let leftover = self.parser.remaining_buffer().trim();
        if !leftover.is_empty() || !self.utf8_buffer.is_empty() {
            warn!(
                leftover_len = leftover.len(),
                leftover_bytes = self.utf8_buffer.len(),
                "Trip plan stream ended with an unterminated block; discarding it"
            );
        }

        self.plan.ok_or_else(|| {
            warn!(
                events_seen = self.events_seen,
                "Trip plan stream ended without plan data"
            );
            PlannerError::NoPlanReceived
        })
    }
}

/// Reads `byte_stream` to completion and resolves with the final plan.
///
/// `cancel` is raced against every chunk read; if it completes first the call
/// fails with `Cancelled` and no further callbacks run.
///
/// # Errors
///
/// Returns `Transport` if a chunk fails to arrive, `StreamReported` if the
/// backend sends an `error` event, `NoPlanReceived` if the stream ends without
/// plan data, and `Cancelled` on cancellation.
pub async fn read_plan_stream<S, E, F, C>(
    byte_stream: S,
    mut on_progress: F,
    cancel: C,
) -> Result<TripPlan, PlannerError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
    F: FnMut(&StreamProgress),
    C: Future<Output = ()>,
{
    let mut byte_stream = std::pin::pin!(byte_stream);
    let mut cancel = std::pin::pin!(cancel);
    let mut state = PlanStreamState::new();

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.as_mut() => {
                warn!("Trip plan stream cancelled by caller");
                return Err(PlannerError::Cancelled);
            }
            next = byte_stream.next() => next,
        };

        match next {
            Some(Ok(bytes)) => state.push_bytes(&bytes, &mut on_progress)?,
            Some(Err(e)) => {
                return Err(PlannerError::Transport(format!(
                    "Error reading streaming response: {e}"
                )));
            }
            None => break,
        }
    }

    state.finish()
}
