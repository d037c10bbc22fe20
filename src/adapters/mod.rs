//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to               |
//! |----------------|--------------------|---------------------------|
//! | `log_sink`     | EventSink          | Serial log output         |
//! | `nvs`          | StoragePort        | NVS / in-memory store     |
//! | `time`         | ClockPort          | ESP32 system timer + RTC  |
//! | `ws_transport` | ObserverTransport  | ESP-IDF HTTP/WebSocket    |
//!
//! The relay is a driver ([`crate::drivers::relay`]) that implements
//! `RelayPort` directly.

pub mod log_sink;
pub mod nvs;
pub mod time;
#[cfg(target_os = "espidf")]
pub mod ws_transport;
