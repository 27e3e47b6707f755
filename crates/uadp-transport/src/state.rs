//! Association lifecycle.
//!
//! Every network-facing operation checks the [`HandlerState`] of its
//! association before touching a socket. Only `Operational` permits I/O.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of one producer or consumer association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HandlerState {
    /// Created but not configured.
    NoConfiguration = 0,
    /// Configured, not attached to the network.
    Disabled = 1,
    /// Attached; sending and receiving are allowed.
    Operational = 2,
    /// Failed. Stays here until reconfigured.
    Error = 3,
}

impl HandlerState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => HandlerState::NoConfiguration,
            1 => HandlerState::Disabled,
            2 => HandlerState::Operational,
            _ => HandlerState::Error,
        }
    }

    /// Human-readable state name.
    pub fn as_str(self) -> &'static str {
        match self {
            HandlerState::NoConfiguration => "NoConfiguration",
            HandlerState::Disabled => "Disabled",
            HandlerState::Operational => "Operational",
            HandlerState::Error => "Error",
        }
    }
}

impl fmt::Display for HandlerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation rejected because the association is in the wrong state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} not allowed in state {state}")]
pub struct StateError {
    /// The rejected operation.
    pub operation: &'static str,
    /// The state the association was in.
    pub state: HandlerState,
}

/// Shared, single-writer state cell of an association.
///
/// Transitions use compare-exchange so a losing concurrent transition fails
/// with [`StateError`] instead of clobbering the winner.
#[derive(Debug)]
pub struct AssociationState {
    state: AtomicU8,
}

impl AssociationState {
    /// New unconfigured association.
    pub fn new() -> Self {
        Self::with_state(HandlerState::NoConfiguration)
    }

    /// New association that is configured but not attached (`Disabled`).
    pub fn configured() -> Self {
        Self::with_state(HandlerState::Disabled)
    }

    fn with_state(state: HandlerState) -> Self {
        Self {
            state: AtomicU8::new(state as u8),
        }
    }

    /// Current state.
    pub fn state(&self) -> HandlerState {
        HandlerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// True when sending and receiving are allowed.
    pub fn is_operational(&self) -> bool {
        self.state() == HandlerState::Operational
    }

    /// `Disabled` → `Operational`. Any other starting state is rejected,
    /// including an association that is already operational.
    pub fn enable(&self) -> Result<(), StateError> {
        self.transition("enable", HandlerState::Disabled, HandlerState::Operational)
    }

    /// `Operational` → `Disabled`.
    pub fn disable(&self) -> Result<(), StateError> {
        self.transition("disable", HandlerState::Operational, HandlerState::Disabled)
    }

    /// `NoConfiguration` or `Error` → `Disabled`.
    pub fn configure(&self) -> Result<(), StateError> {
        self.transition(
            "configure",
            HandlerState::NoConfiguration,
            HandlerState::Disabled,
        )
        .or_else(|_| self.transition("configure", HandlerState::Error, HandlerState::Disabled))
    }

    /// Move to `Error` from any state.
    pub fn fail(&self) {
        self.state.store(HandlerState::Error as u8, Ordering::Release);
    }

    /// Fail with [`StateError`] unless the association is `Operational`.
    pub fn ensure_operational(&self, operation: &'static str) -> Result<(), StateError> {
        let state = self.state();
        if state == HandlerState::Operational {
            Ok(())
        } else {
            Err(StateError { operation, state })
        }
    }

    fn transition(
        &self,
        operation: &'static str,
        from: HandlerState,
        to: HandlerState,
    ) -> Result<(), StateError> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|actual| StateError {
                operation,
                state: HandlerState::from_u8(actual),
            })
    }
}

impl Default for AssociationState {
    fn default() -> Self {
        Self::new()
    }
}
