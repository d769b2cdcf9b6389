//! User-facing reply texts. The exact wording is a compatibility contract
//! and is pinned verbatim by the dispatch tests.

pub const DISCONNECTED: &str = "[=] You have disconnected from chat.";
pub const NO_ONGOING_CHAT: &str = "[=] No ongoing chat.";

pub fn hello_waiting(name: &str) -> String {
    format!("[=] Hello {name}. Hang on while we find a user.")
}

pub fn hello_matched(name: &str, peer_name: &str) -> String {
    format!("[=] Hello {name}. You are connected to {peer_name}.")
}

pub fn peer_connected(name: &str) -> String {
    format!("[=] {name} connected.")
}

pub fn peer_disconnected(name: &str) -> String {
    format!("[=] {name} have disconnected.")
}

pub fn relayed(name: &str, content: &str) -> String {
    format!("{name}: {content}")
}
