//! MAC protocol data unit: one UHF transparent-mode frame.
//!
//! The radio moves fixed 128-byte blocks (its Data Field 2), optionally
//! preceded by a one-byte length prefix (Data Field 1). The MAC lays a
//! 9-byte Golay-protected header at the front and fills the remaining 119
//! bytes with one codeword fragment:
//!
//! ```text
//! ┌─────────────┬───────────────┬────────────────────────────────┐
//! │ Data Field 1│ MPDU header   │ codeword fragment              │
//! │ (1, opt.)   │ (9)           │ (119, zero-padded on the last) │
//! └─────────────┴───────────────┴────────────────────────────────┘
//! ```
//!
//! This module also owns the frame accounting: how many MPDUs a user
//! packet occupies for a given FEC scheme. The count covers the whole
//! upper-layer buffer image (a fixed transport prefix ahead of the
//! datagram) segmented into FEC messages and fragmented into payloads.

use crate::error::{MacError, MacResult};
use crate::error_correction::ErrorCorrection;
use crate::mpdu_header::{MpduHeader, MPDU_HEADER_BYTES};

/// Radio transparent-mode block length (Data Field 2), in bytes.
pub const MPDU_LENGTH_BYTES: usize = 128;

/// Frame length with the Data Field 1 length prefix in front.
pub const MPDU_WITH_LENGTH_PREFIX_BYTES: usize = MPDU_LENGTH_BYTES + 1;

/// Codeword-fragment capacity of one MPDU, in bytes.
pub const MPDU_PAYLOAD_BYTES: usize = MPDU_LENGTH_BYTES - MPDU_HEADER_BYTES;

/// Largest datagram the upper layer may hand down.
pub const CSP_MTU_BYTES: usize = 4096;

/// Transport bookkeeping bytes ahead of the datagram in the upper layer's
/// buffer image: 8 bytes allocator padding, the 2-byte datagram length and
/// the 4-byte CSP id. The radio carries the whole image, so frame
/// accounting includes it.
pub const CSP_PACKET_PREFIX_BYTES: usize = 14;

/// Offset of the big-endian datagram length inside the transport prefix.
pub const CSP_LENGTH_OFFSET: usize = 8;

/// One 128-byte frame: header plus codeword fragment.
///
/// Owns its bytes exclusively; consumers get borrowed views.
#[derive(Debug, Clone, PartialEq)]
pub struct Mpdu {
    header: MpduHeader,
    codeword: Vec<u8>,
}

impl Mpdu {
    /// Build a frame from a header and up to one payload's worth of
    /// codeword bytes; short fragments are zero-padded to the full 119.
    pub fn new(header: MpduHeader, mut codeword: Vec<u8>) -> MacResult<Self> {
        if codeword.len() > MPDU_PAYLOAD_BYTES {
            return Err(MacError::BadFormat(format!(
                "codeword fragment of {} bytes exceeds the {}-byte payload",
                codeword.len(),
                MPDU_PAYLOAD_BYTES
            )));
        }
        codeword.resize(MPDU_PAYLOAD_BYTES, 0);
        Ok(Self { header, codeword })
    }

    /// Parse a received frame of 128 bytes (or 129 with Data Field 1).
    pub fn from_raw(bytes: &[u8]) -> MacResult<Self> {
        let data_field1_included = match bytes.len() {
            MPDU_LENGTH_BYTES => false,
            MPDU_WITH_LENGTH_PREFIX_BYTES => true,
            other => {
                return Err(MacError::BadFormat(format!(
                    "frame of {} bytes, expected {} or {}",
                    other, MPDU_LENGTH_BYTES, MPDU_WITH_LENGTH_PREFIX_BYTES
                )))
            }
        };

        let header = MpduHeader::decode(bytes, data_field1_included)?;
        let payload_start = MPDU_HEADER_BYTES + data_field1_included as usize;
        Ok(Self {
            header,
            codeword: bytes[payload_start..].to_vec(),
        })
    }

    /// Serialise the frame; with `include_data_field1` the UHF length byte
    /// is prepended (129 bytes total).
    pub fn to_raw(&self, include_data_field1: bool) -> Vec<u8> {
        let mut out = Vec::with_capacity(MPDU_LENGTH_BYTES + include_data_field1 as usize);
        if include_data_field1 {
            out.push(self.header.uhf_packet_length());
        }
        out.extend_from_slice(&self.header.encode());
        out.extend_from_slice(&self.codeword);
        out
    }

    /// The frame header.
    pub fn header(&self) -> &MpduHeader {
        &self.header
    }

    /// The 119-byte codeword fragment.
    pub fn codeword(&self) -> &[u8] {
        &self.codeword
    }
}

/// Number of MPDUs needed to carry a datagram of `user_packet_len` bytes
/// under the given scheme geometry.
///
/// The buffer image (transport prefix plus datagram) is segmented into
/// FEC messages; each message becomes one codeword; each codeword spans a
/// fixed number of payload fragments.
pub fn number_of_mpdus(user_packet_len: usize, error_correction: &ErrorCorrection) -> u32 {
    let image_len = user_packet_len + CSP_PACKET_PREFIX_BYTES;
    let num_codewords = image_len.div_ceil(error_correction.message_bytes()) as u32;
    num_codewords * error_correction.num_codeword_fragments(MPDU_PAYLOAD_BYTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_correction::ErrorCorrectionScheme;
    use crate::rf_mode::RfMode;

    fn frame_under_test() -> Mpdu {
        let ec = ErrorCorrection::new(ErrorCorrectionScheme::Qcldpc648R12).unwrap();
        let header = MpduHeader::new(128, RfMode::Mode3, &ec, 0x55, 1234, 0xAA).unwrap();
        let codeword: Vec<u8> = (0..MPDU_PAYLOAD_BYTES).map(|i| (i * 37) as u8).collect();
        Mpdu::new(header, codeword).unwrap()
    }

    #[test]
    fn test_frame_constants() {
        assert_eq!(MPDU_LENGTH_BYTES, 128);
        assert_eq!(MPDU_WITH_LENGTH_PREFIX_BYTES, 129);
        assert_eq!(MPDU_HEADER_BYTES, 9);
        assert_eq!(MPDU_PAYLOAD_BYTES, 119);
    }

    #[test]
    fn test_raw_roundtrip_without_prefix() {
        let mpdu = frame_under_test();
        let raw = mpdu.to_raw(false);
        assert_eq!(raw.len(), MPDU_LENGTH_BYTES);
        let parsed = Mpdu::from_raw(&raw).unwrap();
        assert_eq!(parsed.codeword(), mpdu.codeword());
        assert_eq!(
            parsed.header().user_packet_length(),
            mpdu.header().user_packet_length()
        );
        assert_eq!(parsed.header().rf_mode(), RfMode::Mode3);
    }

    #[test]
    fn test_raw_roundtrip_with_prefix() {
        let mpdu = frame_under_test();
        let raw = mpdu.to_raw(true);
        assert_eq!(raw.len(), MPDU_WITH_LENGTH_PREFIX_BYTES);
        assert_eq!(raw[0], 128);
        let parsed = Mpdu::from_raw(&raw).unwrap();
        assert_eq!(parsed.codeword(), mpdu.codeword());
        assert_eq!(parsed.header().uhf_packet_length(), 128);
    }

    #[test]
    fn test_short_fragment_zero_padded() {
        let ec = ErrorCorrection::new(ErrorCorrectionScheme::NoFec).unwrap();
        let header = MpduHeader::new(128, RfMode::Mode0, &ec, 0, 5, 0).unwrap();
        let mpdu = Mpdu::new(header, vec![1, 2, 3]).unwrap();
        assert_eq!(mpdu.codeword().len(), MPDU_PAYLOAD_BYTES);
        assert_eq!(&mpdu.codeword()[..3], &[1, 2, 3]);
        assert!(mpdu.codeword()[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_oversized_fragment_rejected() {
        let ec = ErrorCorrection::new(ErrorCorrectionScheme::NoFec).unwrap();
        let header = MpduHeader::new(128, RfMode::Mode0, &ec, 0, 0, 0).unwrap();
        assert!(Mpdu::new(header, vec![0; MPDU_PAYLOAD_BYTES + 1]).is_err());
    }

    #[test]
    fn test_wrong_frame_length_rejected() {
        assert!(matches!(
            Mpdu::from_raw(&[0u8; 127]),
            Err(MacError::BadFormat(_))
        ));
        assert!(matches!(
            Mpdu::from_raw(&[0u8; 130]),
            Err(MacError::BadFormat(_))
        ));
    }

    /// The full frame-count contract, one row per scheme, for datagram
    /// lengths {0, 10, 103, 358, 4096}.
    #[test]
    fn test_number_of_mpdus_table() {
        use ErrorCorrectionScheme::*;
        let lengths = [0usize, 10, 103, 358, 4096];
        let expected: [(ErrorCorrectionScheme, [u32; 5]); 18] = [
            (Qcldpc648R12, [1, 1, 3, 10, 101]),
            (Qcldpc648R23, [1, 1, 3, 7, 77]),
            (Qcldpc648R34, [1, 1, 2, 7, 68]),
            (Qcldpc648R56, [1, 1, 2, 6, 61]),
            (Qcldpc1296R12, [2, 2, 4, 10, 102]),
            (Qcldpc1296R23, [2, 2, 4, 8, 78]),
            (Qcldpc1296R34, [2, 2, 2, 8, 68]),
            (Qcldpc1296R56, [2, 2, 2, 6, 62]),
            (Qcldpc1944R12, [3, 3, 3, 12, 102]),
            (Qcldpc1944R23, [3, 3, 3, 9, 78]),
            (Qcldpc1944R34, [3, 3, 3, 9, 69]),
            (Qcldpc1944R56, [3, 3, 3, 6, 63]),
            (ConvR12, [1, 1, 3, 7, 71]),
            (ConvR23, [1, 1, 2, 5, 53]),
            (ConvR34, [1, 1, 2, 5, 47]),
            (ConvR56, [1, 1, 2, 4, 42]),
            (ConvR78, [1, 1, 2, 4, 40]),
            (NoFec, [1, 1, 1, 4, 35]),
        ];

        for (scheme, counts) in expected {
            let ec = ErrorCorrection::new(scheme).unwrap();
            for (len, expected_count) in lengths.into_iter().zip(counts) {
                assert_eq!(
                    number_of_mpdus(len, &ec),
                    expected_count,
                    "{} at {} bytes",
                    scheme,
                    len
                );
            }
        }
    }
}
