//! Message definitions for the Battlezone protocol.
//!
//! Every WebSocket text frame carries one JSON envelope of the form
//! `{"type": "<kind>", "data": { .. }}`. This module contains both
//! client->server and server->client message types.

mod client;
mod server;

pub use client::*;
pub use server::*;
