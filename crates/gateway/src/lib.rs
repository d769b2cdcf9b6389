//! Event dispatch and relay service.
//!
//! Lifecycle:
//! 1. The platform gateway feeds `MessageEvent`s into an mpsc channel
//! 2. `RelayService::run` spawns one task per event, so intake is never
//!    blocked by handler execution
//! 3. `Dispatcher` classifies each event (command, in-session chat, noise),
//!    drives the pairing registry, and schedules outbound sends
//!
//! All pairing state lives in `veil-pairing`; all network I/O goes through
//! the `veil-channels` outbound trait.

pub mod command;
pub mod dispatch;
pub mod replies;
pub mod service;

pub use {command::Command, dispatch::Dispatcher, service::RelayService};
