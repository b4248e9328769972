//! Draw engine: consumes a substream's counter space and tracks the
//! not-yet-logged accounting delta.

use std::sync::Arc;

use sdg_audit::{EventPayload, RngEvent};
use sdg_core::errors::ErrorInfo;
use sdg_core::{
    philox_block, uniform_from_word, CounterState, RunIdentity, SdgError, SubKey, WORDS_PER_BLOCK,
};

use crate::substream::SubstreamSlot;

/// Pending accounting since a substream's last flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawDelta {
    /// Counter at the last flush.
    pub counter_before: CounterState,
    /// Current counter.
    pub counter_after: CounterState,
    /// Draws requested since the last flush, including rejected attempts.
    pub draws: u64,
    /// Blocks consumed since the last flush.
    pub blocks: u64,
}

#[derive(Debug)]
pub(crate) struct DrawState {
    counter: CounterState,
    flushed_at: CounterState,
    block: [u64; WORDS_PER_BLOCK],
    word: usize,
    pending_draws: u64,
}

impl DrawState {
    pub(crate) fn new() -> Self {
        Self {
            counter: CounterState::ZERO,
            flushed_at: CounterState::ZERO,
            block: [0; WORDS_PER_BLOCK],
            word: WORDS_PER_BLOCK,
            pending_draws: 0,
        }
    }

    #[cfg(test)]
    fn with_counter(counter: CounterState) -> Self {
        Self {
            counter,
            flushed_at: counter,
            block: [0; WORDS_PER_BLOCK],
            word: WORDS_PER_BLOCK,
            pending_draws: 0,
        }
    }

    fn next_word(&mut self, key: &SubKey) -> Result<u64, SdgError> {
        if self.word == WORDS_PER_BLOCK {
            // Advance first: on overflow nothing is consumed and the caller
            // sees the fatal error before any state change.
            let at = self.counter;
            self.counter = self.counter.advance(1)?;
            self.block = philox_block(key, at);
            self.word = 0;
        }
        let word = self.block[self.word];
        self.word += 1;
        self.pending_draws += 1;
        Ok(word)
    }

    fn delta(&self) -> Result<DrawDelta, SdgError> {
        let span = self
            .flushed_at
            .blocks_until(&self.counter)
            .unwrap_or_default();
        let blocks = u64::try_from(span).map_err(|_| {
            SdgError::Counter(
                ErrorInfo::new("episode-blocks", "episode spans more blocks than a u64")
                    .with_context("blocks", span.to_string()),
            )
        })?;
        Ok(DrawDelta {
            counter_before: self.flushed_at,
            counter_after: self.counter,
            draws: self.pending_draws,
            blocks,
        })
    }

    fn seal(&mut self) -> Result<DrawDelta, SdgError> {
        let delta = self.delta()?;
        // Residual words of a partially consumed block are discarded so the
        // flushed counter range replays independently of its neighbours.
        self.word = WORDS_PER_BLOCK;
        self.flushed_at = self.counter;
        self.pending_draws = 0;
        Ok(delta)
    }
}

/// Consumer-facing handle to one live substream.
///
/// Handles are cheap to clone and share the substream's state: a second
/// handle derived for the same key observes the current counter, never a
/// reset one. The hot path (uniform/integer draws) performs no allocation.
#[derive(Debug, Clone)]
pub struct SubstreamHandle {
    identity: Arc<RunIdentity>,
    module: Arc<str>,
    substream_label: Arc<str>,
    slot: Arc<SubstreamSlot>,
}

impl SubstreamHandle {
    pub(crate) fn new(
        identity: Arc<RunIdentity>,
        module: Arc<str>,
        substream_label: Arc<str>,
        slot: Arc<SubstreamSlot>,
    ) -> Self {
        Self {
            identity,
            module,
            substream_label,
            slot,
        }
    }

    /// Module that owns this substream.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Fully rendered substream label as it appears on audit events.
    pub fn substream_label(&self) -> &str {
        &self.substream_label
    }

    /// Derived 128-bit sub-key (diagnostic; draws go through the handle).
    pub fn sub_key(&self) -> SubKey {
        self.slot.sub_key
    }

    /// Draws one uniform strictly inside (0,1).
    ///
    /// Consumes one 64-bit word; a fresh block is generated and the counter
    /// advanced by one exactly when the previous block is exhausted.
    pub fn uniform(&self) -> Result<f64, SdgError> {
        let mut state = self.slot.state.lock();
        state.next_word(&self.slot.sub_key).map(uniform_from_word)
    }

    /// Draws one raw 64-bit integer word.
    pub fn next_u64(&self) -> Result<u64, SdgError> {
        let mut state = self.slot.state.lock();
        state.next_word(&self.slot.sub_key)
    }

    /// Snapshot of the not-yet-flushed accounting delta.
    pub fn pending(&self) -> Result<DrawDelta, SdgError> {
        self.slot.state.lock().delta()
    }

    /// Flushes the pending episode into one immutable audit event.
    ///
    /// The payload is validated against the episode's draw count before any
    /// accounting is consumed; on payload errors the pending delta is left
    /// intact and rolls into the next flush. The engine never writes to the
    /// audit sink itself; the caller appends the returned event.
    pub fn flush_pending_event(&self, payload: EventPayload) -> Result<RngEvent, SdgError> {
        let mut state = self.slot.state.lock();
        payload.validate(state.delta()?.draws)?;
        let delta = state.seal()?;
        Ok(RngEvent::new(
            &self.identity,
            &self.module,
            &self.substream_label,
            delta.counter_before,
            delta.counter_after,
            delta.draws,
            delta.blocks,
            payload,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SubKey {
        SubKey::from_words([0x1111, 0x2222])
    }

    #[test]
    fn words_consume_blocks_lazily() {
        let mut state = DrawState::new();
        let k = key();
        state.next_word(&k).unwrap();
        assert_eq!(state.delta().unwrap().blocks, 1);
        state.next_word(&k).unwrap();
        assert_eq!(state.delta().unwrap().blocks, 1);
        state.next_word(&k).unwrap();
        let delta = state.delta().unwrap();
        assert_eq!(delta.blocks, 2);
        assert_eq!(delta.draws, 3);
    }

    #[test]
    fn seal_discards_residual_words() {
        let mut state = DrawState::new();
        let k = key();
        state.next_word(&k).unwrap();
        let sealed = state.seal().unwrap();
        assert_eq!(sealed.blocks, 1);
        assert_eq!(sealed.draws, 1);
        // The next draw opens a fresh block rather than reusing the sealed one.
        state.next_word(&k).unwrap();
        let delta = state.delta().unwrap();
        assert_eq!(delta.counter_before, CounterState::new(0, 1));
        assert_eq!(delta.blocks, 1);
    }

    #[test]
    fn counter_overflow_fails_fast_without_consuming() {
        let mut state = DrawState::with_counter(CounterState::new(u64::MAX, u64::MAX));
        let err = state.next_word(&key()).unwrap_err();
        assert_eq!(err.info().code, "counter-overflow");
        let delta = state.delta().unwrap();
        assert_eq!(delta.draws, 0);
        assert_eq!(delta.blocks, 0);
    }
}
