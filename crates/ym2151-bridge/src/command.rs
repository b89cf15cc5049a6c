//! JSON command surface
//!
//! Hosts that talk in JSON send one object per call:
//!
//! ```text
//! {"op":"initChip"}
//! {"op":"writeRegister","address":64,"data":1}
//! {"op":"clockChip"}          -> [left, right]
//! {"op":"resetChip"}
//! {"op":"cleanupChip"}
//! ```
//!
//! Register arguments must be JSON integers. Anything else (strings, floats,
//! booleans, null) is rejected as an invalid argument before the value
//! reaches the chip.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use ym2151::{OpmBackend, Result, SettleDelay, SharedBridge, Ym2151Error};

/// One bridge call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum BridgeCommand {
    /// Create the engine if absent
    InitChip,
    /// Write `data` to register `address`
    WriteRegister {
        /// Register address, integer in 0-255
        address: Value,
        /// Register value, integer in 0-255
        data: Value,
    },
    /// Clock once, answering with the raw stereo pair
    ClockChip,
    /// Reset the engine in place
    ResetChip,
    /// Release the engine
    CleanupChip,
}

impl BridgeCommand {
    /// Register write with integer arguments
    pub fn write(address: u8, data: u8) -> Self {
        BridgeCommand::WriteRegister {
            address: address.into(),
            data: data.into(),
        }
    }

    /// Decode a JSON command
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Ym2151Error::invalid(format!("unrecognized bridge command: {e}")))
    }
}

/// Result of a bridge call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BridgeReply {
    /// The call completed with nothing to return (JSON `null`)
    Done,
    /// Raw `[left, right]` from a clock
    Frame([i32; 2]),
}

/// Run `command` against `bridge`
///
/// Register writes check for an engine before looking at their arguments and
/// hold the bridge lock across both checks and the write.
pub fn execute<B, D>(bridge: &SharedBridge<B, D>, command: &BridgeCommand) -> Result<BridgeReply>
where
    B: OpmBackend,
    D: SettleDelay,
{
    match command {
        BridgeCommand::InitChip => bridge.initialize().map(|_| BridgeReply::Done),
        BridgeCommand::WriteRegister { address, data } => bridge.with(|b| {
            if !b.is_initialized() {
                return Err(Ym2151Error::Uninitialized);
            }
            let address = integer_arg("address", address)?;
            let data = integer_arg("data", data)?;
            b.write_register(address, data).map(|_| BridgeReply::Done)
        }),
        BridgeCommand::ClockChip => bridge.clock_chip().map(BridgeReply::Frame),
        BridgeCommand::ResetChip => bridge.reset_chip().map(|_| BridgeReply::Done),
        BridgeCommand::CleanupChip => {
            bridge.cleanup_chip();
            Ok(BridgeReply::Done)
        }
    }
}

/// Decode, run and encode one JSON command
pub fn execute_json<B, D>(bridge: &SharedBridge<B, D>, json: &str) -> Result<String>
where
    B: OpmBackend,
    D: SettleDelay,
{
    let command = BridgeCommand::parse(json)?;
    let reply = execute(bridge, &command)?;
    serde_json::to_string(&reply)
        .map_err(|e| Ym2151Error::invalid(format!("unencodable reply: {e}")))
}

fn integer_arg(name: &str, value: &Value) -> Result<i64> {
    value.as_i64().ok_or_else(|| {
        warn!(name, %value, "non-integer register argument");
        Ym2151Error::invalid(format!("{name} must be a number, got {value}"))
    })
}
