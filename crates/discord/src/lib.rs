//! Discord platform client.
//!
//! Two halves: `rest` performs outbound HTTP calls (open DM channels, send
//! messages, identify the bot), `gateway` holds the WebSocket connection and
//! turns MESSAGE_CREATE dispatches into `MessageEvent`s for the relay.

pub mod gateway;
pub mod rest;

pub use {gateway::DiscordGateway, rest::DiscordRest};
