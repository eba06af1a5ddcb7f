//! Helmet Link Module
//!
//! Maintains the single serial-style connection to the helmet unit and the
//! bidirectional message traffic over it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      LinkService                         │
//! │   (public API: connect / send / disconnect / events)     │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!         ┌─────────────┼─────────────┐
//!         │             │             │
//!         ▼             ▼             ▼
//! ┌───────────┐  ┌────────────┐  ┌──────────┐
//! │ Transport │  │ Connection │  │  Reader  │
//! │           │  │   Slot     │  │   Loop   │
//! │ - RFCOMM  │  │ - one lock │  │ - frames │
//! │ - TCP     │  │ - install/ │  │ - loss   │
//! │   bridge  │  │   clear    │  │   detect │
//! └───────────┘  └────────────┘  └──────────┘
//! ```
//!
//! ## Modules
//!
//! - [`transport`] - socket-level access to one peer device
//! - [`connection`] - connection state and the inbound reader loop
//! - [`service`] - lifecycle coordination and the message paths

pub mod connection;
pub mod service;
pub mod transport;

// Re-export the service types for convenience
pub use service::{LinkConfig, LinkService};
