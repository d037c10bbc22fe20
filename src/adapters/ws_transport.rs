//! WebSocket observer transport (ESP-IDF HTTP server).
//!
//! The server's handler runs on the httpd task.  It never touches the
//! application: connects, frames and disconnects are pushed onto the
//! [`channels`](crate::rpc::channels) queues and applied by the control loop.
//!
//! Outbound frames are written by a dedicated writer thread.  The loop
//! only queues them (through [`QueuedTransport`](crate::rpc::transport::QueuedTransport)),
//! so a slow client delays its own frames and nothing else.  The writer
//! owns the per-session detached senders; the handler passes new and
//! closed sessions to it over `SESSION_CHANNEL`.
//!
//! ```text
//!  httpd task ──► ws handler ──► LIFECYCLE / INBOUND ──► control loop
//!                     │
//!                     └──► SESSION_CHANNEL ──┐
//!  control loop ──► OUTBOUND_CHANNEL ──► writer thread ──► detached senders
//! ```

use std::collections::HashMap;
use std::thread::JoinHandle;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use esp_idf_svc::http::server::ws::EspHttpWsDetachedSender;
use esp_idf_svc::http::server::{Configuration, EspHttpServer};
use esp_idf_svc::ws::FrameType;
use esp_idf_sys::EspError;
use log::{debug, info, warn};

use crate::rpc::channels::{self, InboundMsg, OutboundMsg};
use crate::rpc::clients::{ClientId, MAX_CLIENTS};
use crate::rpc::protocol::MAX_FRAME_LEN;

/// Path observers connect to.
pub const WS_PATH: &str = "/ws";

const WRITER_STACK_SIZE: usize = 8 * 1024;

/// Session handover: `Some` on open, `None` on close.
type SessionMsg = (ClientId, Option<EspHttpWsDetachedSender>);

static SESSION_CHANNEL: Channel<CriticalSectionRawMutex, SessionMsg, { 2 * (MAX_CLIENTS + 1) }> =
    Channel::new();

/// The running observer endpoint.  Dropping it stops the server.
pub struct WsTransport {
    _server: EspHttpServer<'static>,
}

impl WsTransport {
    /// Start the HTTP server and register the observer endpoint.
    pub fn start() -> Result<Self, EspError> {
        let mut server = EspHttpServer::new(&Configuration::default())?;

        server.ws_handler(WS_PATH, move |ws| -> Result<(), EspError> {
            let id = ws.session() as ClientId;

            if ws.is_new() {
                let sender = ws.create_detached_sender()?;
                // Hand the sender over before the loop can queue a greeting.
                if SESSION_CHANNEL.try_send((id, Some(sender))).is_err() {
                    warn!("ws: session queue full, {} will not receive frames", id);
                }
                channels::push(InboundMsg::Connected(id));
                return Ok(());
            }

            if ws.is_closed() {
                let _ = SESSION_CHANNEL.try_send((id, None));
                channels::push(InboundMsg::Disconnected(id));
                return Ok(());
            }

            // Peek the frame length first.
            let (frame_type, len) = ws.recv(&mut [])?;
            match frame_type {
                FrameType::Text(false) if len <= MAX_FRAME_LEN + 1 => {
                    let mut buf = [0u8; MAX_FRAME_LEN + 1];
                    ws.recv(&mut buf[..len])?;
                    // The server NUL-terminates text frames.
                    match core::str::from_utf8(&buf[..len]) {
                        Ok(text) => {
                            channels::push_frame(id, text.trim_end_matches('\0'));
                        }
                        Err(_) => {
                            warn!("ws: non-UTF-8 frame from {}", id);
                            channels::push(InboundMsg::Activity(id));
                        }
                    }
                }
                FrameType::Text(_) | FrameType::Binary(_) => {
                    warn!("ws: unsupported or oversized frame ({} bytes) from {}", len, id);
                    // Drain so the socket stays in sync.
                    let mut sink = vec![0u8; len];
                    ws.recv(&mut sink)?;
                    channels::push(InboundMsg::Activity(id));
                }
                _ => {
                    channels::push(InboundMsg::Activity(id));
                }
            }
            Ok(())
        })?;

        info!("ws: observer endpoint listening on {}", WS_PATH);
        Ok(Self { _server: server })
    }

    /// Spawn the writer thread that drains the outbound channel.
    pub fn spawn_writer(&self) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("ws-writer".into())
            .stack_size(WRITER_STACK_SIZE)
            .spawn(|| futures_lite::future::block_on(write_loop()))
    }
}

/// Wakes on every queued frame; sends may block on the httpd task.
async fn write_loop() {
    let mut sessions: HashMap<ClientId, EspHttpWsDetachedSender> = HashMap::new();
    info!("ws: writer started");
    loop {
        let msg = channels::next_outbound().await;

        while let Ok((id, sender)) = SESSION_CHANNEL.try_receive() {
            match sender {
                Some(sender) => {
                    sessions.insert(id, sender);
                }
                None => {
                    sessions.remove(&id);
                }
            }
        }

        match msg {
            OutboundMsg::Broadcast(payload) => {
                // Dead senders are left for the close notice to remove.
                for (id, sender) in &mut sessions {
                    send_to(sender, *id, &payload);
                }
            }
            OutboundMsg::To { client_id, payload } => {
                if let Some(sender) = sessions.get_mut(&client_id) {
                    send_to(sender, client_id, &payload);
                }
            }
            OutboundMsg::Close(id) => {
                if let Some(mut sender) = sessions.remove(&id) {
                    let _ = sender.send(FrameType::Close, &[]);
                    info!("ws: closed {}", id);
                }
            }
        }
    }
}

fn send_to(sender: &mut EspHttpWsDetachedSender, id: ClientId, payload: &str) -> bool {
    match sender.send(FrameType::Text(false), payload.as_bytes()) {
        Ok(()) => true,
        Err(e) => {
            debug!("ws: send to {} failed: {}", id, e);
            false
        }
    }
}
