//! Process-wide YM2151 engine for host runtimes
//!
//! Host bindings usually see a module as a bag of free functions sharing one
//! piece of hidden state. This crate provides exactly that: a single
//! [`SoftOpm`] engine behind a lazily created [`SharedBridge`], and five
//! functions mirroring the bridge operations.
//!
//! Every call blocks the caller: register writes and resets include the
//! 10 ms settle delay. Calls from several threads are serialized.
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> ym2151::Result<()> {
//! ym2151_bridge::init_chip()?;
//! ym2151_bridge::write_register(0x20, 0xC7)?; // both outputs, algorithm 7
//! ym2151_bridge::write_register(0x28, 0x4A)?; // A4
//! ym2151_bridge::write_register(0x08, 0x08)?; // key on M1, channel 0
//! let [left, right] = ym2151_bridge::clock_chip()?;
//! ym2151_bridge::cleanup_chip();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

use std::sync::LazyLock;

use ym2151::{Result, SharedBridge};
use ym2151_softsynth::SoftOpm;

pub mod command;

pub use command::{execute, execute_json, BridgeCommand, BridgeReply};
pub use ym2151::Ym2151Error;

static ENGINE: LazyLock<SharedBridge<SoftOpm>> = LazyLock::new(SharedBridge::new);

/// The process-wide bridge handle
pub fn shared() -> &'static SharedBridge<SoftOpm> {
    &ENGINE
}

/// Create the engine; does nothing when it already exists
pub fn init_chip() -> Result<()> {
    ENGINE.initialize()
}

/// Write `data` to register `address`, then wait out the settle delay
///
/// Fails with [`Ym2151Error::Uninitialized`] before [`init_chip`], and with
/// [`Ym2151Error::InvalidArgument`] when either value is outside 0-255.
pub fn write_register(address: i64, data: i64) -> Result<()> {
    ENGINE.write_register(address, data)
}

/// Clock once and return the raw `[left, right]` engine output
pub fn clock_chip() -> Result<[i32; 2]> {
    ENGINE.clock_chip()
}

/// Reset the engine in place, then wait out the settle delay
pub fn reset_chip() -> Result<()> {
    ENGINE.reset_chip()
}

/// Release the engine; safe to call at any time
pub fn cleanup_chip() {
    ENGINE.cleanup_chip()
}

/// Decode and run one JSON command against the process-wide engine
pub fn handle_json(json: &str) -> Result<String> {
    execute_json(&ENGINE, json)
}
