//! Chat Relay API Library Crate
//!
//! This library contains the logic for the relay service: configuration,
//! shared state, HTTP handlers, WebSocket session handling and routing. The
//! `relay` binary is a thin wrapper around this library.

pub mod config;
pub mod handlers;
pub mod router;
pub mod state;
pub mod ws;
