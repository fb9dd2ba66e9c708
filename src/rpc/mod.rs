//! JSON-RPC integration module for the wallet provider and the chain node
//!
//! This module provides the client and types for talking to an EIP-1193 style wallet endpoint.
//! Plain requests go over HTTP; account and chain notifications arrive over a WebSocket
//! subscription.

/// HTTP and WebSocket JSON-RPC client
mod client;
/// Request, response and event type definitions
mod types;

pub use client::JsonRpcClient;
pub use types::*;
