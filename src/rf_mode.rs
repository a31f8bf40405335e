//! UHF radio RF modes.
//!
//! The transceiver selects one of eight GFSK configurations; the MAC layer
//! does not interpret the mode, it only carries the 3-bit value in the MPDU
//! header so both ends agree on the physical configuration.

use serde::{Deserialize, Serialize};

use crate::error::{MacError, MacResult};

/// RF mode number of the UHF transceiver (3-bit wire encoding).
///
/// Opaque to the MAC core; carried verbatim in the MPDU header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RfMode {
    Mode0 = 0,
    Mode1 = 1,
    Mode2 = 2,
    Mode3 = 3,
    Mode4 = 4,
    Mode5 = 5,
    Mode6 = 6,
    Mode7 = 7,
}

impl RfMode {
    /// The 3-bit wire value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for RfMode {
    type Error = MacError;

    fn try_from(value: u8) -> MacResult<Self> {
        match value {
            0 => Ok(RfMode::Mode0),
            1 => Ok(RfMode::Mode1),
            2 => Ok(RfMode::Mode2),
            3 => Ok(RfMode::Mode3),
            4 => Ok(RfMode::Mode4),
            5 => Ok(RfMode::Mode5),
            6 => Ok(RfMode::Mode6),
            7 => Ok(RfMode::Mode7),
            _ => Err(MacError::BadFormat(format!(
                "RF mode {} does not fit 3 bits",
                value
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values_roundtrip() {
        for v in 0u8..8 {
            let mode = RfMode::try_from(v).unwrap();
            assert_eq!(mode.as_u8(), v);
        }
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(RfMode::try_from(8).is_err());
        assert!(RfMode::try_from(255).is_err());
    }
}
