use std::sync::Arc;

use {
    tokio::sync::mpsc,
    tracing::{info, warn},
};

use veil_common::MessageEvent;

use crate::dispatch::Dispatcher;

/// Runs the intake loop.
///
/// Every event is handed to its own task immediately, so intake keeps up
/// even while earlier handlers are mid-flight performing network sends.
/// Handler failures are logged at the task boundary and never reach the
/// loop itself.
pub struct RelayService {
    dispatcher: Arc<Dispatcher>,
}

impl RelayService {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Consume events until the sender side closes.
    pub async fn run(&self, mut events: mpsc::UnboundedReceiver<MessageEvent>) {
        while let Some(event) = events.recv().await {
            let dispatcher = Arc::clone(&self.dispatcher);
            tokio::spawn(async move {
                if let Err(e) = dispatcher.handle(event).await {
                    warn!(error = %e, "event handler failed");
                }
            });
        }
        info!("event stream closed, relay stopping");
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use {anyhow::Result, async_trait::async_trait};

    use {
        veil_channels::ChannelOutbound,
        veil_common::{ChannelId, UserId},
        veil_pairing::SessionRegistry,
    };

    use super::*;

    /// Counts sends; one variant stalls so a slow handler can be observed
    /// not blocking intake.
    struct CountingOutbound {
        sends: AtomicUsize,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl ChannelOutbound for CountingOutbound {
        async fn open_dm(&self, user: &UserId) -> Result<ChannelId> {
            Ok(ChannelId(format!("dm-{user}")))
        }

        async fn send_text(&self, _channel: &ChannelId, _text: &str) -> Result<()> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.sends.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn service(outbound: Arc<CountingOutbound>) -> RelayService {
        let registry = Arc::new(SessionRegistry::new());
        RelayService::new(Dispatcher::new(
            registry,
            outbound as Arc<dyn ChannelOutbound>,
            UserId::from("bot"),
            "++".into(),
        ))
    }

    fn event(author: &str, content: &str) -> MessageEvent {
        MessageEvent {
            author_id: UserId::from(author),
            channel_id: ChannelId(format!("dm-{author}")),
            content: content.to_string(),
        }
    }

    async fn wait_for_sends(outbound: &CountingOutbound, expected: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while outbound.sends.load(Ordering::SeqCst) < expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("expected sends never arrived");
    }

    #[tokio::test]
    async fn drains_events_and_dispatches_handlers() {
        let outbound = Arc::new(CountingOutbound {
            sends: AtomicUsize::new(0),
            delay: None,
        });
        let service = service(Arc::clone(&outbound));
        let (tx, rx) = mpsc::unbounded_channel();

        tx.send(event("u1", "++start")).unwrap();
        tx.send(event("u2", "++start")).unwrap();
        drop(tx);
        service.run(rx).await;

        // One greeting plus the two match notices.
        wait_for_sends(&outbound, 3).await;
    }

    #[tokio::test]
    async fn slow_handler_does_not_block_intake() {
        let outbound = Arc::new(CountingOutbound {
            sends: AtomicUsize::new(0),
            delay: Some(Duration::from_millis(200)),
        });
        let service = service(Arc::clone(&outbound));
        let (tx, rx) = mpsc::unbounded_channel();

        // The first handler sleeps inside its send; the loop must still
        // drain the rest of the queue and return promptly.
        for n in 0..5 {
            tx.send(event(&format!("u{n}"), "++start")).unwrap();
        }
        drop(tx);
        tokio::time::timeout(Duration::from_millis(100), service.run(rx))
            .await
            .expect("intake loop was blocked by a handler");

        // Each pair costs three sends (greeting + two match notices) and
        // the leftover waiter one more: 2 * 3 + 1.
        wait_for_sends(&outbound, 7).await;
    }
}
