//! Gateway WebSocket intake.
//!
//! Connects, performs the Hello → Identify handshake, keeps the heartbeat,
//! and forwards MESSAGE_CREATE dispatches as `MessageEvent`s over an mpsc
//! channel. This task only decodes and forwards; handler work happens on the
//! relay side so a slow handler can never stall intake.

use std::time::Duration;

use {
    anyhow::{Context, Result, bail},
    futures::{SinkExt, StreamExt},
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tokio::sync::mpsc,
    tokio_tungstenite::{connect_async, tungstenite::Message},
    tracing::{debug, trace, warn},
};

use veil_common::{ChannelId, MessageEvent, UserId};

/// Discord gateway URL (JSON encoding).
const GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

/// Guild messages, direct messages, message content.
const INTENTS: u64 = (1 << 9) | (1 << 12) | (1 << 15);

/// Delay before reconnecting after a dropped connection.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

const OP_DISPATCH: u8 = 0;
const OP_HEARTBEAT: u8 = 1;
const OP_IDENTIFY: u8 = 2;
const OP_HELLO: u8 = 10;
const OP_HEARTBEAT_ACK: u8 = 11;

#[derive(Debug, Deserialize)]
struct GatewayFrame {
    op: u8,
    #[serde(default)]
    d: serde_json::Value,
    #[serde(default)]
    t: Option<String>,
    #[serde(default)]
    s: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct MessageCreate {
    author: MessageAuthor,
    channel_id: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessageAuthor {
    id: String,
}

/// Gateway connection feeding inbound events into an mpsc channel.
pub struct DiscordGateway {
    token: Secret<String>,
    events: mpsc::UnboundedSender<MessageEvent>,
}

impl DiscordGateway {
    /// Create the gateway half and the receiver the relay consumes.
    pub fn new(token: Secret<String>) -> (Self, mpsc::UnboundedReceiver<MessageEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { token, events: tx }, rx)
    }

    /// Run the intake loop, reconnecting after dropped connections.
    /// Returns once the event receiver is gone.
    pub async fn run(self) -> Result<()> {
        loop {
            match self.run_connection().await {
                Ok(()) => return Ok(()),
                Err(e) => warn!(error = %e, "gateway connection lost, reconnecting"),
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    /// Drive one connection until it drops. `Ok` means the receiver side
    /// hung up and the service is shutting down.
    async fn run_connection(&self) -> Result<()> {
        let (ws, _) = connect_async(GATEWAY_URL)
            .await
            .context("connect to gateway")?;
        let (mut write, mut read) = ws.split();

        // Hello carries the heartbeat interval.
        let hello = loop {
            match read.next().await {
                Some(msg) => {
                    if let Some(frame) = decode_frame(&msg?) {
                        break frame;
                    }
                },
                None => bail!("gateway closed before hello"),
            }
        };
        if hello.op != OP_HELLO {
            bail!("expected hello, got op {}", hello.op);
        }
        let interval_ms = hello
            .d
            .get("heartbeat_interval")
            .and_then(|v| v.as_u64())
            .context("hello frame missing heartbeat_interval")?;
        let mut heartbeat = tokio::time::interval(Duration::from_millis(interval_ms));
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // An interval's first tick fires immediately; consume it so the
        // first heartbeat goes out one full interval after hello.
        heartbeat.tick().await;

        write
            .send(Message::text(identify_payload(self.token.expose_secret())))
            .await
            .context("send identify")?;
        debug!("gateway identified");

        let mut last_seq: Option<u64> = None;
        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    write
                        .send(Message::text(heartbeat_payload(last_seq)))
                        .await
                        .context("send heartbeat")?;
                    trace!("heartbeat sent");
                },
                msg = read.next() => {
                    let Some(msg) = msg else { bail!("gateway stream ended") };
                    let Some(frame) = decode_frame(&msg?) else { continue };
                    if let Some(s) = frame.s {
                        last_seq = Some(s);
                    }
                    match frame.op {
                        OP_DISPATCH => {
                            if frame.t.as_deref() == Some("MESSAGE_CREATE")
                                && let Some(event) = decode_message_create(frame.d)
                            {
                                trace!(channel = %event.channel_id, "message event");
                                if self.events.send(event).is_err() {
                                    return Ok(());
                                }
                            }
                        },
                        OP_HEARTBEAT => {
                            // The gateway asked for an immediate heartbeat.
                            write
                                .send(Message::text(heartbeat_payload(last_seq)))
                                .await
                                .context("send heartbeat")?;
                        },
                        OP_HEARTBEAT_ACK => {},
                        other => trace!(op = other, "ignoring gateway op"),
                    }
                },
            }
        }
    }
}

fn identify_payload(token: &str) -> String {
    serde_json::json!({
        "op": OP_IDENTIFY,
        "d": {
            "token": token,
            "intents": INTENTS,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "veil",
                "device": "veil",
            },
        },
    })
    .to_string()
}

fn heartbeat_payload(last_seq: Option<u64>) -> String {
    serde_json::json!({ "op": OP_HEARTBEAT, "d": last_seq }).to_string()
}

fn decode_frame(msg: &Message) -> Option<GatewayFrame> {
    match msg {
        Message::Text(text) => match serde_json::from_str(text.as_str()) {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!(error = %e, "undecodable gateway frame");
                None
            },
        },
        _ => None,
    }
}

fn decode_message_create(d: serde_json::Value) -> Option<MessageEvent> {
    match serde_json::from_value::<MessageCreate>(d) {
        Ok(m) => Some(MessageEvent {
            author_id: UserId(m.author.id),
            channel_id: ChannelId(m.channel_id),
            content: m.content,
        }),
        Err(e) => {
            warn!(error = %e, "undecodable MESSAGE_CREATE payload");
            None
        },
    }
}
