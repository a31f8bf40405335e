//! MPDU MAC header: 72 bits, Golay-protected.
//!
//! The header carries the framing metadata the receiver needs before it can
//! touch the payload, so all 36 information bits are protected by Golay
//! codewords strong enough to survive channel errors that the payload FEC
//! will later correct.
//!
//! ## Wire layout
//!
//! ```text
//! info bits (36):
//! ┌─────────┬───────────┬─────────────┬────────────────┬──────────────┐
//! │ rf_mode │ ec_scheme │ codeword    │ user packet    │ user packet  │
//! │ (3)     │ (6)       │ frag idx (7)│ length (12)    │ frag idx (8) │
//! └─────────┴───────────┴─────────────┴────────────────┴──────────────┘
//! on the wire (72 bits = 9 bytes):
//! ┌──────────────────┬──────────────────┬──────────────────┐
//! │ Golay24(info     │ Golay24(info     │ Golay24(info     │
//! │   bits 0..12)    │   bits 12..24)   │   bits 24..36)   │
//! └──────────────────┴──────────────────┴──────────────────┘
//! ```
//!
//! The 36 information bits are split into three consecutive 12-bit groups,
//! MSB-first; each group becomes one extended Golay(24,12) codeword and the
//! three codewords are concatenated MSB-first. The header is accepted only
//! when all three codewords decode; a single uncorrectable codeword fails
//! [`MpduHeader::decode`] with [`MacError::HeaderCorrupt`] and the framer
//! drops the frame. A successfully decoded header is valid by
//! construction, though four or more aliased flips in one Golay codeword
//! can still go undetected.
//!
//! When the header is transported with the radio's Data Field 1 length
//! prefix, that one extra byte precedes these 9 and carries the UHF packet
//! length; it is not Golay-protected.

use crate::error::{MacError, MacResult};
use crate::error_correction::{ErrorCorrection, ErrorCorrectionScheme};
use crate::golay::{golay_decode, golay_encode};
use crate::rf_mode::RfMode;

/// MAC header length on the wire, in bits.
pub const MPDU_HEADER_BITS: usize = 72;

/// MAC header length on the wire, in bytes.
pub const MPDU_HEADER_BYTES: usize = MPDU_HEADER_BITS / 8;

/// Framing metadata for one MPDU. Immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct MpduHeader {
    uhf_packet_length: u8,
    rf_mode: RfMode,
    error_correction: ErrorCorrection,
    codeword_fragment_index: u8,
    user_packet_length: u16,
    user_packet_fragment_index: u8,
}

impl MpduHeader {
    /// Build a transmit-side header.
    ///
    /// `codeword_fragment_index` must fit 7 bits and `user_packet_length`
    /// 12 bits.
    pub fn new(
        uhf_packet_length: u8,
        rf_mode: RfMode,
        error_correction: &ErrorCorrection,
        codeword_fragment_index: u8,
        user_packet_length: u16,
        user_packet_fragment_index: u8,
    ) -> MacResult<Self> {
        if codeword_fragment_index > 0x7F {
            return Err(MacError::BadFormat(format!(
                "codeword fragment index {} does not fit 7 bits",
                codeword_fragment_index
            )));
        }
        if user_packet_length > 0x0FFF {
            return Err(MacError::BadFormat(format!(
                "user packet length {} does not fit 12 bits",
                user_packet_length
            )));
        }
        Ok(Self {
            uhf_packet_length,
            rf_mode,
            error_correction: error_correction.clone(),
            codeword_fragment_index,
            user_packet_length,
            user_packet_fragment_index,
        })
    }

    /// Reconstitute a header from received bytes.
    ///
    /// With `data_field1_included`, byte 0 is the radio's UHF packet length
    /// and the 72-bit header starts at byte 1. Fails with
    /// [`MacError::HeaderCorrupt`] when any Golay codeword is
    /// uncorrectable; a corrected header can still carry a scheme value the
    /// registry rejects, which fails accordingly.
    pub fn decode(bytes: &[u8], data_field1_included: bool) -> MacResult<Self> {
        let needed = MPDU_HEADER_BYTES + data_field1_included as usize;
        if bytes.len() < needed {
            return Err(MacError::BadFormat(format!(
                "header needs {} bytes, got {}",
                needed,
                bytes.len()
            )));
        }

        let (uhf_packet_length, header) = if data_field1_included {
            (bytes[0], &bytes[1..1 + MPDU_HEADER_BYTES])
        } else {
            (crate::mpdu::MPDU_LENGTH_BYTES as u8, &bytes[..MPDU_HEADER_BYTES])
        };

        let mut info: u64 = 0;
        for group in 0..3 {
            let word = (header[group * 3] as u32) << 16
                | (header[group * 3 + 1] as u32) << 8
                | header[group * 3 + 2] as u32;
            let (data, _errors) = golay_decode(word).ok_or(MacError::HeaderCorrupt)?;
            info = (info << 12) | data as u64;
        }

        let rf_mode = RfMode::try_from(((info >> 33) & 0x7) as u8)?;
        let scheme = ErrorCorrectionScheme::try_from(((info >> 27) & 0x3F) as u8)?;
        let error_correction = ErrorCorrection::new(scheme)?;
        let codeword_fragment_index = ((info >> 20) & 0x7F) as u8;
        let user_packet_length = ((info >> 8) & 0x0FFF) as u16;
        let user_packet_fragment_index = (info & 0xFF) as u8;

        Ok(Self {
            uhf_packet_length,
            rf_mode,
            error_correction,
            codeword_fragment_index,
            user_packet_length,
            user_packet_fragment_index,
        })
    }

    /// Serialise to the 9 Golay-protected wire bytes (Data Field 1 not
    /// included).
    pub fn encode(&self) -> [u8; MPDU_HEADER_BYTES] {
        let info = ((self.rf_mode.as_u8() as u64) << 33)
            | ((self.error_correction.scheme().as_u8() as u64) << 27)
            | ((self.codeword_fragment_index as u64) << 20)
            | ((self.user_packet_length as u64) << 8)
            | self.user_packet_fragment_index as u64;

        let mut out = [0u8; MPDU_HEADER_BYTES];
        for group in 0..3 {
            let data = ((info >> (24 - group * 12)) & 0x0FFF) as u16;
            let word = golay_encode(data);
            out[group * 3] = (word >> 16) as u8;
            out[group * 3 + 1] = (word >> 8) as u8;
            out[group * 3 + 2] = word as u8;
        }
        out
    }

    /// UHF packet length (the Data Field 1 value).
    pub fn uhf_packet_length(&self) -> u8 {
        self.uhf_packet_length
    }

    /// RF mode carried for the radio; opaque to the MAC.
    pub fn rf_mode(&self) -> RfMode {
        self.rf_mode
    }

    /// FEC scheme of the payload.
    pub fn error_correction_scheme(&self) -> ErrorCorrectionScheme {
        self.error_correction.scheme()
    }

    /// Full geometry for the payload scheme.
    pub fn error_correction(&self) -> &ErrorCorrection {
        &self.error_correction
    }

    /// Codeword length of the payload scheme, in bits.
    pub fn codeword_len(&self) -> u32 {
        self.error_correction.codeword_len()
    }

    /// Message length of the payload scheme, in bits.
    pub fn message_len(&self) -> u32 {
        self.error_correction.message_len()
    }

    /// 0-based position of this fragment within its codeword.
    pub fn codeword_fragment_index(&self) -> u8 {
        self.codeword_fragment_index
    }

    /// Length of the original user packet in bytes (12-bit field, saturated
    /// by the transmitter for longer packets).
    pub fn user_packet_length(&self) -> u16 {
        self.user_packet_length
    }

    /// 0-based index of this codeword within the user packet.
    pub fn user_packet_fragment_index(&self) -> u8 {
        self.user_packet_fragment_index
    }
}
