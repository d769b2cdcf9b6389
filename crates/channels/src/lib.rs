//! Platform abstraction.
//!
//! The relay core talks to the chat platform through the narrow surface in
//! `outbound`; the concrete client (Discord) implements it in its own crate.

pub mod outbound;

pub use outbound::ChannelOutbound;
