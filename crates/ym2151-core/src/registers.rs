//! YM2151 Register Definitions
//!
//! Named register map used by the voice programming code. Per-operator
//! registers take a slot offset (0-31), per-channel registers a channel offset
//! (0-7); global registers sit at a fixed address.

use std::fmt;

use bitflags::bitflags;

use crate::constants::{NUM_CHANNELS, NUM_SLOTS};
use crate::{Result, Ym2151Error};

/// How a register's address is formed from its base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterScope {
    /// Single register at the base address
    Global,
    /// One register per channel: base + channel
    Channel,
    /// One register per operator slot: base + slot
    Slot,
}

/// YM2151 register family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Key on/off: channel in bits 0-2, operator mask in bits 3-6
    KeyOn,
    /// RL output enable (7-6), feedback (5-3), connection/algorithm (2-0)
    RlFbConnect,
    /// Key code: block (6-4), note code (3-0)
    KeyCode,
    /// Key fraction (7-2), 1/64 semitone steps
    KeyFraction,
    /// PMS (6-4), AMS (1-0)
    PmsAms,
    /// DT1 (6-4), MUL (3-0)
    DtMul,
    /// Total level (6-0), 0 = loudest
    TotalLevel,
    /// Key scale (7-6), attack rate (4-0)
    KsAr,
    /// AMS enable (7), first decay rate (4-0)
    AmsD1r,
    /// DT2 (7-6), second decay rate (4-0)
    Dt2D2r,
    /// First decay level (7-4), release rate (3-0)
    D1lRr,
}

impl Register {
    /// Every register family in address order
    pub const ALL: [Register; 11] = [
        Register::KeyOn,
        Register::RlFbConnect,
        Register::KeyCode,
        Register::KeyFraction,
        Register::PmsAms,
        Register::DtMul,
        Register::TotalLevel,
        Register::KsAr,
        Register::AmsD1r,
        Register::Dt2D2r,
        Register::D1lRr,
    ];

    /// First address of the family
    pub const fn base(self) -> u8 {
        match self {
            Register::KeyOn => 0x08,
            Register::RlFbConnect => 0x20,
            Register::KeyCode => 0x28,
            Register::KeyFraction => 0x30,
            Register::PmsAms => 0x38,
            Register::DtMul => 0x40,
            Register::TotalLevel => 0x60,
            Register::KsAr => 0x80,
            Register::AmsD1r => 0xA0,
            Register::Dt2D2r => 0xC0,
            Register::D1lRr => 0xE0,
        }
    }

    /// Addressing scope of the family
    pub const fn scope(self) -> RegisterScope {
        match self {
            Register::KeyOn => RegisterScope::Global,
            Register::RlFbConnect
            | Register::KeyCode
            | Register::KeyFraction
            | Register::PmsAms => RegisterScope::Channel,
            Register::DtMul
            | Register::TotalLevel
            | Register::KsAr
            | Register::AmsD1r
            | Register::Dt2D2r
            | Register::D1lRr => RegisterScope::Slot,
        }
    }

    /// Resolve the concrete address for an offset
    ///
    /// The offset is a channel (0-7) or slot (0-31) depending on
    /// [`Register::scope`]; global registers only accept 0.
    pub fn addr(self, offset: u8) -> Result<u8> {
        let limit = self.span();
        if offset >= limit {
            return Err(Ym2151Error::invalid(format!(
                "offset {offset} out of range for {self} (max {})",
                limit - 1
            )));
        }
        Ok(self.base() + offset)
    }

    /// Register write for this family at `offset`
    pub fn write(self, offset: u8, data: u8) -> Result<RegisterWrite> {
        Ok(RegisterWrite::new(self.addr(offset)?, data))
    }

    /// Find the family a raw address belongs to
    pub fn from_addr(addr: u8) -> Option<Self> {
        Register::ALL
            .into_iter()
            .find(|reg| addr >= reg.base() && addr - reg.base() < reg.span())
    }

    fn span(self) -> u8 {
        match self.scope() {
            RegisterScope::Global => 1,
            RegisterScope::Channel => NUM_CHANNELS,
            RegisterScope::Slot => NUM_SLOTS,
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Register::KeyOn => write!(f, "$08 (Key On)"),
            Register::RlFbConnect => write!(f, "$20-$27 (RL/FB/CONNECT)"),
            Register::KeyCode => write!(f, "$28-$2F (Key Code)"),
            Register::KeyFraction => write!(f, "$30-$37 (Key Fraction)"),
            Register::PmsAms => write!(f, "$38-$3F (PMS/AMS)"),
            Register::DtMul => write!(f, "$40-$5F (DT1/MUL)"),
            Register::TotalLevel => write!(f, "$60-$7F (Total Level)"),
            Register::KsAr => write!(f, "$80-$9F (KS/AR)"),
            Register::AmsD1r => write!(f, "$A0-$BF (AMS-EN/D1R)"),
            Register::Dt2D2r => write!(f, "$C0-$DF (DT2/D2R)"),
            Register::D1lRr => write!(f, "$E0-$FF (D1L/RR)"),
        }
    }
}

bitflags! {
    /// Operator enable bits of the key-on register
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OperatorMask: u8 {
        /// Modulator 1
        const M1 = 0x08;
        /// Carrier 1
        const C1 = 0x10;
        /// Modulator 2
        const M2 = 0x20;
        /// Carrier 2
        const C2 = 0x40;
    }
}

impl OperatorMask {
    /// Key-on register value for `channel` with these operators enabled
    pub fn key_on_value(self, channel: u8) -> u8 {
        self.bits() | (channel & 0x07)
    }
}

/// One (address, data) pair on its way to the chip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterWrite {
    /// Register address
    pub address: u8,
    /// Value stored at the address
    pub data: u8,
}

impl RegisterWrite {
    /// Create a write
    pub const fn new(address: u8, data: u8) -> Self {
        Self { address, data }
    }
}

impl fmt::Display for RegisterWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:02X} <- ${:02X}", self.address, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_addresses() {
        assert_eq!(Register::DtMul.addr(0).unwrap(), 0x40);
        assert_eq!(Register::TotalLevel.addr(0).unwrap(), 0x60);
        assert_eq!(Register::KsAr.addr(0).unwrap(), 0x80);
        assert_eq!(Register::AmsD1r.addr(0).unwrap(), 0xA0);
        assert_eq!(Register::Dt2D2r.addr(0).unwrap(), 0xC0);
        assert_eq!(Register::D1lRr.addr(31).unwrap(), 0xFF);
        assert_eq!(Register::RlFbConnect.addr(7).unwrap(), 0x27);
        assert_eq!(Register::KeyCode.addr(0).unwrap(), 0x28);
        assert_eq!(Register::KeyFraction.addr(0).unwrap(), 0x30);
        assert_eq!(Register::KeyOn.addr(0).unwrap(), 0x08);
    }

    #[test]
    fn test_offset_out_of_range() {
        assert!(matches!(
            Register::KeyCode.addr(8),
            Err(Ym2151Error::InvalidArgument(_))
        ));
        assert!(Register::DtMul.addr(32).is_err());
        assert!(Register::KeyOn.addr(1).is_err());
    }

    #[test]
    fn test_from_addr() {
        assert_eq!(Register::from_addr(0x08), Some(Register::KeyOn));
        assert_eq!(Register::from_addr(0x2A), Some(Register::KeyCode));
        assert_eq!(Register::from_addr(0x5F), Some(Register::DtMul));
        assert_eq!(Register::from_addr(0xFF), Some(Register::D1lRr));
        assert_eq!(Register::from_addr(0x01), None);
        assert_eq!(Register::from_addr(0x18), None);
    }

    #[test]
    fn test_key_on_mask() {
        assert_eq!(OperatorMask::all().bits(), 0x78);
        assert_eq!(OperatorMask::all().key_on_value(0), 0x78);
        assert_eq!(OperatorMask::all().key_on_value(3), 0x7B);
        assert_eq!(OperatorMask::empty().key_on_value(5), 0x05);
    }

    #[test]
    fn test_write_display() {
        assert_eq!(RegisterWrite::new(0x28, 0x4A).to_string(), "$28 <- $4A");
    }
}
