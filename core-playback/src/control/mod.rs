//! # Control Bridge (receiving side)
//!
//! Signals from a control surface arrive over an unreliable one-way channel:
//! duplicated, late, or not at all. This module turns that stream into
//! engine actions.
//!
//! - [`ControlListener`] pumps a `SignalReceiver` into the engine mailbox,
//!   dropping signals while the process is suspended or the mailbox is full
//! - [`SignalDebouncer`] runs on the engine actor and collapses bursts of the
//!   same command into one action

pub mod debounce;
pub mod listener;

pub use debounce::{DebounceConfig, SignalDebouncer, SignalVerdict};
pub use listener::{ControlListener, ListenerHandle};
