//! Minimal sway/i3 IPC transport: `i3-ipc` magic, little-endian payload
//! length and message type, JSON payload. Only what subscribing to events
//! requires.

use std::env;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::UnixStream,
};

const MAGIC: &[u8; 6] = b"i3-ipc";
const HEADER_LEN: usize = 14;

pub const MSG_SUBSCRIBE: u32 = 2;
/// Events carry the high bit; the low bits are the event id.
pub const EVENT_WORKSPACE: u32 = 0x8000_0000;
pub const EVENT_WINDOW: u32 = 0x8000_0003;

pub struct SwayIpc {
    stream: UnixStream,
}

impl SwayIpc {
    /// Connects to the socket sway advertises through `SWAYSOCK` (falling
    /// back to `I3SOCK` for i3 compatibility).
    pub async fn connect() -> Result<Self> {
        let path = env::var("SWAYSOCK")
            .or_else(|_| env::var("I3SOCK"))
            .context("neither SWAYSOCK nor I3SOCK is set; is sway running?")?;
        let stream = UnixStream::connect(&path)
            .await
            .with_context(|| format!("connecting to sway ipc socket {path}"))?;
        Ok(Self { stream })
    }

    /// Subscribes to the given event names and checks sway's acknowledgement.
    pub async fn subscribe(&mut self, events: &[&str]) -> Result<()> {
        #[derive(Deserialize)]
        struct SubscribeReply {
            success: bool,
        }

        let payload = serde_json::to_vec(events)?;
        self.send(MSG_SUBSCRIBE, &payload).await?;

        let (message_type, payload) = self.receive().await?;
        if message_type != MSG_SUBSCRIBE {
            bail!("expected a subscribe reply, got message type {message_type:#x}");
        }
        let reply: SubscribeReply = serde_json::from_slice(&payload)?;
        if !reply.success {
            bail!("sway rejected the event subscription");
        }
        Ok(())
    }

    async fn send(&mut self, message_type: u32, payload: &[u8]) -> Result<()> {
        let mut header = [0u8; HEADER_LEN];
        header[..6].copy_from_slice(MAGIC);
        header[6..10].copy_from_slice(&(payload.len() as u32).to_le_bytes());
        header[10..].copy_from_slice(&message_type.to_le_bytes());

        self.stream.write_all(&header).await?;
        self.stream.write_all(payload).await?;
        Ok(())
    }

    /// Reads the next message off the socket. After subscribing these are
    /// almost exclusively events.
    pub async fn receive(&mut self) -> Result<(u32, Vec<u8>)> {
        let mut header = [0u8; HEADER_LEN];
        self.stream.read_exact(&mut header).await?;
        if &header[..6] != MAGIC {
            bail!("sway ipc stream is out of sync, bad magic");
        }

        let length = u32::from_le_bytes(header[6..10].try_into()?) as usize;
        let message_type = u32::from_le_bytes(header[10..].try_into()?);

        let mut payload = vec![0u8; length];
        self.stream.read_exact(&mut payload).await?;
        Ok((message_type, payload))
    }
}
