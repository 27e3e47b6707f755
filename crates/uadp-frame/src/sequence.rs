//! Sequence-number ordering with 16-bit rollover.

/// Largest forward distance still treated as "newer".
pub const MAX_FORWARD_DELTA: u16 = 0x7FFF;

/// `true` if `candidate` follows `last` by a small positive delta modulo 2^16.
pub fn is_newer(last: u16, candidate: u16) -> bool {
    matches!(candidate.wrapping_sub(last), 1..=MAX_FORWARD_DELTA)
}

/// Tracks the last accepted sequence number of one producer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceTracker {
    last: Option<u16>,
}

impl SequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<u16> {
        self.last
    }

    /// Record `candidate` if it is newer than the last accepted number.
    ///
    /// The first number seen is always accepted. Returns whether it was.
    pub fn accept(&mut self, candidate: u16) -> bool {
        let accepted = self.last.is_none_or(|last| is_newer(last, candidate));
        if accepted {
            self.last = Some(candidate);
        }
        accepted
    }

    /// Forget the last number, e.g. after a producer restart.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
