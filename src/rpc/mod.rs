//! Observer-facing RPC subsystem.
//!
//! JSON text frames over any multi-client transport.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      RPC Stack                             │
//! │                                                            │
//! │  ┌───────────┐   ┌──────────┐   ┌───────────────────────┐  │
//! │  │ Transport │──▶│ Channels │──▶│  Engine (dispatcher)  │  │
//! │  │ (httpd)   │   │ (queue)  │   │  → AppService         │  │
//! │  └───────────┘   └──────────┘   └───────────┬───────────┘  │
//! │                                             ▼              │
//! │  ┌───────────┐   ┌──────────┐   ┌───────────────────────┐  │
//! │  │ Writer    │◀──│ Outbound │◀──│ Broadcaster           │  │
//! │  │ (thread)  │   │ (queue)  │   │ (EventSink)           │  │
//! │  └───────────┘   └──────────┘   └───────────────────────┘  │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod broadcaster;
pub mod channels;
pub mod clients;
pub mod engine;
pub mod protocol;
pub mod transport;
