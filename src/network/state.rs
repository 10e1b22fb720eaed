//! Network lifecycle state machine.
//!
//! ```text
//! Uninitialized → Provisioning → Ready → TornDown
//!       │               │                   ▲
//!       └───────────────┴───────────────────┘
//! ```
//! `TornDown` is terminal. A failed bring-up goes straight from
//! `Provisioning` to `TornDown`, so callers never see a partial `Ready`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkState {
    Uninitialized,
    Provisioning,
    Ready,
    TornDown,
}

impl NetworkState {
    pub fn can_transition_to(self, next: NetworkState) -> bool {
        use NetworkState::*;
        matches!(
            (self, next),
            (Uninitialized, Provisioning)
                | (Provisioning, Ready)
                | (Provisioning, TornDown)
                | (Ready, TornDown)
                | (Uninitialized, TornDown)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == NetworkState::TornDown
    }
}

impl fmt::Display for NetworkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NetworkState::Uninitialized => "uninitialized",
            NetworkState::Provisioning => "provisioning",
            NetworkState::Ready => "ready",
            NetworkState::TornDown => "torn-down",
        };
        f.write_str(name)
    }
}
