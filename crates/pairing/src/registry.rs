use std::{
    collections::{HashMap, VecDeque},
    sync::{Mutex, MutexGuard},
};

use tracing::debug;

use veil_common::ChannelId;

/// A user who asked to start a chat and has not yet been matched.
#[derive(Debug, Clone)]
pub struct PendingPeer {
    pub name: String,
    pub channel: ChannelId,
}

/// One directed half of an active session, keyed by the owning channel.
///
/// Halves exist in mutually inverse pairs: if channel A's side points at B,
/// B's side points back at A. `own_name` is the pseudonym relay messages
/// from this channel are prefixed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSide {
    pub own_name: String,
    pub peer_name: String,
    pub peer_channel: ChannelId,
}

/// Outcome of a start request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// No one was waiting; the requester now holds a place in the queue.
    Waiting { name: String },
    /// Paired with the oldest waiter.
    Matched {
        own_name: String,
        peer_name: String,
        peer_channel: ChannelId,
    },
    /// The channel is already waiting or already in a session. Nothing
    /// changed and no pseudonym was consumed.
    AlreadyActive,
}

/// Outcome of a stop request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// An active session was torn down; the peer should be notified.
    Disconnected {
        own_name: String,
        peer_channel: ChannelId,
    },
    /// The channel was still waiting; its request was withdrawn.
    CancelledPending,
    /// The channel had neither a session nor a pending request.
    NoSession,
}

#[derive(Default)]
struct PairingState {
    /// Unmatched start requests, oldest first. New requesters always pair
    /// against the front.
    waiting: VecDeque<PendingPeer>,
    /// channel → its side of an active session.
    sessions: HashMap<ChannelId, SessionSide>,
}

/// Single source of truth for who is waiting and who is paired.
///
/// Every operation takes the mutex for its whole duration, so
/// `request_start`, `request_stop`, and `route` are linearizable with
/// respect to each other. Mutations are pure in-memory work; the lock is
/// never held across an await point.
pub struct SessionRegistry {
    state: Mutex<PairingState>,
    next_name: Box<dyn Fn() -> String + Send + Sync>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_name_source(Box::new(veil_names::random_name))
    }

    /// Create a registry drawing pseudonyms from a custom source.
    pub fn with_name_source(next_name: Box<dyn Fn() -> String + Send + Sync>) -> Self {
        Self {
            state: Mutex::new(PairingState::default()),
            next_name,
        }
    }

    /// Ask to start a chat from `channel`.
    ///
    /// If the queue holds a waiter (necessarily a different channel — the
    /// requester's own entry is rejected up front), both sides are promoted
    /// into a session atomically. Otherwise the requester joins the queue
    /// under a fresh pseudonym.
    pub fn request_start(&self, channel: &ChannelId) -> StartOutcome {
        let mut state = self.lock();

        if state.sessions.contains_key(channel)
            || state.waiting.iter().any(|p| &p.channel == channel)
        {
            debug!(channel = %channel, "start ignored: channel already active");
            return StartOutcome::AlreadyActive;
        }

        let name = (self.next_name)();
        match state.waiting.pop_front() {
            Some(peer) => {
                state.sessions.insert(peer.channel.clone(), SessionSide {
                    own_name: peer.name.clone(),
                    peer_name: name.clone(),
                    peer_channel: channel.clone(),
                });
                state.sessions.insert(channel.clone(), SessionSide {
                    own_name: name.clone(),
                    peer_name: peer.name.clone(),
                    peer_channel: peer.channel.clone(),
                });
                debug!(channel = %channel, peer = %peer.channel, "matched");
                StartOutcome::Matched {
                    own_name: name,
                    peer_name: peer.name,
                    peer_channel: peer.channel,
                }
            },
            None => {
                state.waiting.push_back(PendingPeer {
                    name: name.clone(),
                    channel: channel.clone(),
                });
                debug!(channel = %channel, "waiting for a peer");
                StartOutcome::Waiting { name }
            },
        }
    }

    /// Ask to stop whatever `channel` is involved in.
    ///
    /// Tearing down a session removes both halves under the same lock, so a
    /// concurrent `route` or second `request_stop` sees either the full
    /// session or none of it.
    pub fn request_stop(&self, channel: &ChannelId) -> StopOutcome {
        let mut state = self.lock();

        if let Some(side) = state.sessions.remove(channel) {
            state.sessions.remove(&side.peer_channel);
            debug!(channel = %channel, peer = %side.peer_channel, "session torn down");
            return StopOutcome::Disconnected {
                own_name: side.own_name,
                peer_channel: side.peer_channel,
            };
        }

        let before = state.waiting.len();
        state.waiting.retain(|p| &p.channel != channel);
        if state.waiting.len() < before {
            debug!(channel = %channel, "pending request withdrawn");
            StopOutcome::CancelledPending
        } else {
            StopOutcome::NoSession
        }
    }

    /// Read-only lookup used to relay an in-session chat message.
    pub fn route(&self, channel: &ChannelId) -> Option<SessionSide> {
        self.lock().sessions.get(channel).cloned()
    }

    /// Number of channels currently waiting for a peer.
    pub fn waiting_count(&self) -> usize {
        self.lock().waiting.len()
    }

    /// Number of channels currently in an active session.
    pub fn active_count(&self) -> usize {
        self.lock().sessions.len()
    }

    fn lock(&self) -> MutexGuard<'_, PairingState> {
        // A poisoned lock means a panic mid-mutation; the state is still
        // structurally valid because every mutation completes before any
        // call that could panic.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn channel(id: &str) -> ChannelId {
        ChannelId::from(id)
    }

    #[test]
    fn first_start_waits() {
        let reg = SessionRegistry::new();
        let a = channel("a");

        match reg.request_start(&a) {
            StartOutcome::Waiting { name } => assert!(!name.is_empty()),
            other => panic!("expected Waiting, got {other:?}"),
        }
        assert_eq!(reg.waiting_count(), 1);
        assert!(reg.route(&a).is_none());
    }

    #[test]
    fn second_start_matches_with_mutual_inverse_sides() {
        let reg = SessionRegistry::new();
        let a = channel("a");
        let b = channel("b");

        let name_a = match reg.request_start(&a) {
            StartOutcome::Waiting { name } => name,
            other => panic!("expected Waiting, got {other:?}"),
        };
        let (name_b, peer_name, peer_channel) = match reg.request_start(&b) {
            StartOutcome::Matched {
                own_name,
                peer_name,
                peer_channel,
            } => (own_name, peer_name, peer_channel),
            other => panic!("expected Matched, got {other:?}"),
        };

        assert_eq!(peer_name, name_a);
        assert_eq!(peer_channel, a);
        assert_eq!(reg.waiting_count(), 0);

        let side_a = reg.route(&a).expect("a has a session");
        let side_b = reg.route(&b).expect("b has a session");
        assert_eq!(side_a.own_name, name_a);
        assert_eq!(side_a.peer_name, name_b);
        assert_eq!(side_a.peer_channel, b);
        assert_eq!(side_b.own_name, name_b);
        assert_eq!(side_b.peer_name, name_a);
        assert_eq!(side_b.peer_channel, a);
    }

    #[test]
    fn start_while_waiting_is_already_active() {
        let reg = SessionRegistry::new();
        let a = channel("a");

        assert!(matches!(
            reg.request_start(&a),
            StartOutcome::Waiting { .. }
        ));
        // A second start from the same channel must not match the channel
        // with itself or consume the waiting slot.
        assert_eq!(reg.request_start(&a), StartOutcome::AlreadyActive);
        assert_eq!(reg.waiting_count(), 1);
        assert_eq!(reg.active_count(), 0);
    }

    #[test]
    fn start_while_in_session_is_already_active() {
        let reg = SessionRegistry::new();
        let a = channel("a");
        let b = channel("b");

        reg.request_start(&a);
        reg.request_start(&b);
        assert_eq!(reg.request_start(&a), StartOutcome::AlreadyActive);
        assert_eq!(reg.active_count(), 2);
        assert_eq!(reg.waiting_count(), 0);
    }

    #[test]
    fn stop_tears_down_both_sides() {
        let reg = SessionRegistry::new();
        let a = channel("a");
        let b = channel("b");

        let name_a = match reg.request_start(&a) {
            StartOutcome::Waiting { name } => name,
            other => panic!("expected Waiting, got {other:?}"),
        };
        reg.request_start(&b);

        match reg.request_stop(&a) {
            StopOutcome::Disconnected {
                own_name,
                peer_channel,
            } => {
                assert_eq!(own_name, name_a);
                assert_eq!(peer_channel, b);
            },
            other => panic!("expected Disconnected, got {other:?}"),
        }
        assert!(reg.route(&a).is_none());
        assert!(reg.route(&b).is_none());
        assert_eq!(reg.waiting_count(), 0);
    }

    #[test]
    fn stop_is_idempotent() {
        let reg = SessionRegistry::new();
        let a = channel("a");
        let b = channel("b");

        reg.request_start(&a);
        reg.request_start(&b);

        assert!(matches!(
            reg.request_stop(&a),
            StopOutcome::Disconnected { .. }
        ));
        assert_eq!(reg.request_stop(&a), StopOutcome::NoSession);
        assert_eq!(reg.request_stop(&b), StopOutcome::NoSession);
    }

    #[test]
    fn stop_while_waiting_cancels_the_pending_request() {
        let reg = SessionRegistry::new();
        let a = channel("a");

        reg.request_start(&a);
        assert_eq!(reg.request_stop(&a), StopOutcome::CancelledPending);
        assert_eq!(reg.waiting_count(), 0);

        // The slot is free again for someone else.
        let b = channel("b");
        assert!(matches!(
            reg.request_start(&b),
            StartOutcome::Waiting { .. }
        ));
    }

    #[test]
    fn stop_with_no_state_is_no_session() {
        let reg = SessionRegistry::new();
        assert_eq!(reg.request_stop(&channel("a")), StopOutcome::NoSession);
    }

    #[test]
    fn concurrent_stops_disconnect_exactly_once() {
        let reg = Arc::new(SessionRegistry::new());
        let a = channel("a");
        let b = channel("b");

        reg.request_start(&a);
        reg.request_start(&b);

        let reg_a = Arc::clone(&reg);
        let reg_b = Arc::clone(&reg);
        let chan_a = a.clone();
        let chan_b = b.clone();
        let stop_a = std::thread::spawn(move || reg_a.request_stop(&chan_a));
        let stop_b = std::thread::spawn(move || reg_b.request_stop(&chan_b));

        let outcomes = [
            stop_a.join().expect("stop thread panicked"),
            stop_b.join().expect("stop thread panicked"),
        ];
        let disconnected = outcomes
            .iter()
            .filter(|o| matches!(o, StopOutcome::Disconnected { .. }))
            .count();
        let no_session = outcomes
            .iter()
            .filter(|o| matches!(o, StopOutcome::NoSession))
            .count();
        assert_eq!(disconnected, 1, "exactly one side observes the teardown");
        assert_eq!(no_session, 1);
        assert_eq!(reg.active_count(), 0);
    }

    #[test]
    fn pseudonyms_come_from_the_injected_source() {
        let counter = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let names = Arc::clone(&counter);
        let reg = SessionRegistry::with_name_source(Box::new(move || {
            let n = names.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            format!("User{n}")
        }));

        assert_eq!(reg.request_start(&channel("a")), StartOutcome::Waiting {
            name: "User0".into()
        });
        assert_eq!(reg.request_start(&channel("b")), StartOutcome::Matched {
            own_name: "User1".into(),
            peer_name: "User0".into(),
            peer_channel: channel("a"),
        });
    }
}
