//! # Core Runtime Module
//!
//! Foundational infrastructure shared by the playback engine and the control
//! surface:
//! - Logging and tracing bootstrap
//! - Configuration with fail-fast bridge validation
//! - Event bus for playback, cache, and control events
//!
//! ## Overview
//!
//! Everything here is process-agnostic. The main process and the control
//! surface both build a [`CoreConfig`](config::CoreConfig) against the same
//! shared container identifier and initialise logging through
//! [`init_logging`](logging::init_logging).

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
