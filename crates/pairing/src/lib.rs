//! Pairing state: who is waiting and who is paired.
//!
//! The registry is the single source of truth for the relay. All mutations
//! go through one mutex so concurrent start/stop/chat traffic can never
//! observe a half-torn-down session.

pub mod registry;

pub use registry::{PendingPeer, SessionRegistry, SessionSide, StartOutcome, StopOutcome};
