//! llhls - Low-latency HLS packaging
//!
//! This library crate exposes the publisher and configuration for integration
//! testing. Fragmenting and segment storage live in `llhls-media`.

pub mod config;
pub mod streaming;
