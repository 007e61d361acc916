use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};

use anyhow::Context;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, tcp::OwnedReadHalf, tcp::OwnedWriteHalf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use farmbot_core::world::{AlarmClient, DisplayClient, InputClient, WorldSnapshot};

pub const SCHEMA_VERSION: u64 = 1;

/// One request to the host bridge, tagged by `op`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HostRequest {
    Snapshot,
    Press { key: String },
    Release { key: String },
    SetHeldSlot { slot: u8 },
    RunCommand { command: String },
    Disconnect,
    Overlay { visible: bool },
    RouteEditor { visible: bool },
    Alarm { sound: String, repeats: u32 },
}

impl HostRequest {
    pub fn to_wire_json(&self) -> serde_json::Value {
        let mut v = serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}));
        if let Some(obj) = v.as_object_mut() {
            obj.insert("schema_version".to_string(), SCHEMA_VERSION.into());
        }
        v
    }
}

/// Requests produced during a synchronous tick, flushed to the bridge after it.
pub type Outbox = Arc<StdMutex<VecDeque<HostRequest>>>;

fn push(outbox: &Outbox, req: HostRequest) -> anyhow::Result<()> {
    outbox
        .lock()
        .map_err(|_| anyhow::anyhow!("outbox lock poisoned"))?
        .push_back(req);
    Ok(())
}

struct BridgeConn {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

pub struct HostBridge {
    conn: Mutex<BridgeConn>,
}

impl HostBridge {
    pub async fn connect(addr: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("connect host bridge {addr}"))?;
        let (read, write) = stream.into_split();
        Ok(Self {
            conn: Mutex::new(BridgeConn {
                reader: BufReader::new(read),
                writer: write,
            }),
        })
    }

    async fn request_json(&self, req: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let line = format!("{req}\n");
        let mut conn = self.conn.lock().await;
        conn.writer
            .write_all(line.as_bytes())
            .await
            .context("bridge write")?;
        conn.writer.flush().await.ok();

        let mut resp_line = String::new();
        let n = conn
            .reader
            .read_line(&mut resp_line)
            .await
            .context("bridge read")?;
        if n == 0 {
            anyhow::bail!("bridge connection closed");
        }
        let v: serde_json::Value =
            serde_json::from_str(resp_line.trim()).context("invalid bridge json response")?;
        Ok(v)
    }

    async fn request(&self, req: &HostRequest) -> anyhow::Result<serde_json::Value> {
        let v = self.request_json(req.to_wire_json()).await?;
        if v.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            let error = v.get("error").and_then(|e| e.as_str()).unwrap_or("unknown error");
            anyhow::bail!("host rejected {req:?}: {error}");
        }
        Ok(v)
    }

    pub async fn snapshot(&self) -> anyhow::Result<WorldSnapshot> {
        let v = self.request(&HostRequest::Snapshot).await?;
        decode_snapshot(v)
    }

    /// Sends everything queued in `outbox`, in order. Failures are logged and
    /// do not stop the rest of the batch.
    pub async fn flush(&self, outbox: &Outbox) {
        let batch: Vec<HostRequest> = match outbox.lock() {
            Ok(mut queue) => queue.drain(..).collect(),
            Err(_) => {
                warn!("bridge.outbox_poisoned");
                return;
            }
        };
        for req in batch {
            debug!("bridge.send {req:?}");
            if let Err(err) = self.request(&req).await {
                warn!("bridge.request_failed err={err:#}");
            }
        }
    }
}

pub fn decode_snapshot(v: serde_json::Value) -> anyhow::Result<WorldSnapshot> {
    let snap = v
        .get("snapshot")
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("missing snapshot in response"))?;
    serde_json::from_value(snap).context("decode snapshot")
}

/// `InputClient` that queues requests for the next flush.
pub struct BridgeInput(pub Outbox);

impl InputClient for BridgeInput {
    fn press(&mut self, key: &str) -> anyhow::Result<()> {
        push(&self.0, HostRequest::Press { key: key.to_string() })
    }

    fn release(&mut self, key: &str) -> anyhow::Result<()> {
        push(&self.0, HostRequest::Release { key: key.to_string() })
    }

    fn set_held_slot(&mut self, slot: u8) -> anyhow::Result<()> {
        push(&self.0, HostRequest::SetHeldSlot { slot })
    }

    fn run_command(&mut self, command: &str) -> anyhow::Result<()> {
        push(
            &self.0,
            HostRequest::RunCommand {
                command: command.to_string(),
            },
        )
    }

    fn disconnect(&mut self) -> anyhow::Result<()> {
        push(&self.0, HostRequest::Disconnect)
    }
}

pub struct BridgeDisplay(pub Outbox);

impl DisplayClient for BridgeDisplay {
    fn set_overlay_visible(&mut self, visible: bool) -> anyhow::Result<()> {
        push(&self.0, HostRequest::Overlay { visible })
    }

    fn set_route_editor_visible(&mut self, visible: bool) -> anyhow::Result<()> {
        push(&self.0, HostRequest::RouteEditor { visible })
    }
}

pub struct BridgeAlarm(pub Outbox);

impl AlarmClient for BridgeAlarm {
    fn play_alarm(&mut self, sound: &str, max_repeats: u32) -> anyhow::Result<()> {
        push(
            &self.0,
            HostRequest::Alarm {
                sound: sound.to_string(),
                repeats: max_repeats,
            },
        )
    }
}
