//! WebSocket Relay
//!
//! This module relays chat prompts from a WebSocket client to the generation
//! backend and streams the replies back:
//!
//! - `protocol`: The plain-text frames, the `[END]` sentinel and error prefixes.
//! - `session`: Manages the WebSocket connection lifecycle, from upgrade to close.
//! - `turn`: Streams the reply to a single prompt.

pub mod protocol;
pub mod session;
mod turn;

#[cfg(test)]
mod testing;

pub use session::ws_handler;
