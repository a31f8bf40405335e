//! FEC scheme registry and codeword geometry.
//!
//! Every scheme the link can name is registered in one static table that
//! maps the 6-bit wire tag to its name, coding rate and codeword/message
//! geometry. Fragment arithmetic, MPDU counting and codec construction all
//! read their numbers from here, so the table is the single source of
//! truth. An unknown tag is a hard error, never a default.
//!
//! Block codes have fixed geometry. The continuous (convolutional) schemes
//! and NO_FEC take their codeword length from the caller: the "continuous
//! maximum codeword length" is chosen by the framer as the MPDU payload
//! capacity in bits, and the message length is derived from it.
//!
//! ## Example
//!
//! ```rust
//! use uhf_mac::error_correction::{ErrorCorrection, ErrorCorrectionScheme};
//!
//! let ec = ErrorCorrection::new(ErrorCorrectionScheme::ConvR12).unwrap();
//! assert_eq!(ec.codeword_len(), 952); // bits, one MPDU payload
//! assert_eq!(ec.message_len(), 464);  // bits, whole bytes, tail reserved
//! assert_eq!(ec.num_codeword_fragments(119), 1);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::convolutional::CCSDS_CONSTRAINT_LENGTH;
use crate::error::{MacError, MacResult};
use crate::mpdu::MPDU_PAYLOAD_BYTES;

/// Coding rate of a registered scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodingRate {
    Rate1_6,
    Rate1_5,
    Rate1_4,
    Rate1_3,
    Rate1_2,
    Rate2_3,
    Rate3_4,
    Rate4_5,
    Rate5_6,
    Rate7_8,
    Rate8_9,
    /// Uncoded (rate 1).
    Rate1,
    /// Rate is not meaningful for the scheme (Reed-Solomon rows, whose
    /// geometry is given directly as n and k).
    RateNa,
}

impl CodingRate {
    /// Rate as a (numerator, denominator) pair, or `None` for [`CodingRate::RateNa`].
    pub fn as_fraction(self) -> Option<(u32, u32)> {
        match self {
            CodingRate::Rate1_6 => Some((1, 6)),
            CodingRate::Rate1_5 => Some((1, 5)),
            CodingRate::Rate1_4 => Some((1, 4)),
            CodingRate::Rate1_3 => Some((1, 3)),
            CodingRate::Rate1_2 => Some((1, 2)),
            CodingRate::Rate2_3 => Some((2, 3)),
            CodingRate::Rate3_4 => Some((3, 4)),
            CodingRate::Rate4_5 => Some((4, 5)),
            CodingRate::Rate5_6 => Some((5, 6)),
            CodingRate::Rate7_8 => Some((7, 8)),
            CodingRate::Rate8_9 => Some((8, 9)),
            CodingRate::Rate1 => Some((1, 1)),
            CodingRate::RateNa => None,
        }
    }

    /// Fractional rate; 1.0 where the rate is not meaningful.
    pub fn as_f64(self) -> f64 {
        match self.as_fraction() {
            Some((num, den)) => num as f64 / den as f64,
            None => 1.0,
        }
    }
}

/// Error correction scheme tag (6-bit wire encoding).
///
/// Discriminants are the on-air values. QC-LDPC 648 rate 1/2 is zero, the
/// remaining assignment follows the registry order below; values 49..=63
/// are unmapped and rejected by `TryFrom<u8>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ErrorCorrectionScheme {
    Qcldpc648R12 = 0,
    Qcldpc648R23 = 1,
    Qcldpc648R34 = 2,
    Qcldpc648R56 = 3,
    Qcldpc1296R12 = 4,
    Qcldpc1296R23 = 5,
    Qcldpc1296R34 = 6,
    Qcldpc1296R56 = 7,
    Qcldpc1944R12 = 8,
    Qcldpc1944R23 = 9,
    Qcldpc1944R34 = 10,
    Qcldpc1944R56 = 11,
    ConvR12 = 12,
    ConvR23 = 13,
    ConvR34 = 14,
    ConvR56 = 15,
    ConvR78 = 16,
    Rs255_239I1 = 17,
    Rs255_239I2 = 18,
    Rs255_239I3 = 19,
    Rs255_239I4 = 20,
    Rs255_239I5 = 21,
    Rs255_239I8 = 22,
    Rs255_223I1 = 23,
    Rs255_223I2 = 24,
    Rs255_223I3 = 25,
    Rs255_223I4 = 26,
    Rs255_223I5 = 27,
    Rs255_223I8 = 28,
    Turbo1784R12 = 29,
    Turbo1784R13 = 30,
    Turbo1784R14 = 31,
    Turbo1784R16 = 32,
    Turbo3568R12 = 33,
    Turbo3568R13 = 34,
    Turbo3568R14 = 35,
    Turbo3568R16 = 36,
    Turbo7136R12 = 37,
    Turbo7136R13 = 38,
    Turbo7136R14 = 39,
    Turbo7136R16 = 40,
    Turbo8920R12 = 41,
    Turbo8920R13 = 42,
    Turbo8920R14 = 43,
    Turbo8920R16 = 44,
    LdpcOrangeBook1280 = 45,
    LdpcOrangeBook1536 = 46,
    LdpcOrangeBook2048 = 47,
    NoFec = 48,
}

/// One registry row.
struct SchemeInfo {
    scheme: ErrorCorrectionScheme,
    name: &'static str,
    rate: CodingRate,
    /// Codeword length in bits; `None` for continuous codes (caller supplies).
    codeword_bits: Option<u32>,
    /// Message length in bits; `None` where derived from the codeword length.
    message_bits: Option<u32>,
    /// Whether the scheme may be used on this link.
    valid: bool,
}

use self::CodingRate as R;
use self::ErrorCorrectionScheme as S;

/// The registry, indexed by wire tag.
#[rustfmt::skip]
static SCHEME_TABLE: [SchemeInfo; 49] = [
    SchemeInfo { scheme: S::Qcldpc648R12,  name: "IEEE 802.11n QC-LDPC n=648 rate 1/2",  rate: R::Rate1_2, codeword_bits: Some(648),  message_bits: Some(324),  valid: true },
    SchemeInfo { scheme: S::Qcldpc648R23,  name: "IEEE 802.11n QC-LDPC n=648 rate 2/3",  rate: R::Rate2_3, codeword_bits: Some(648),  message_bits: Some(432),  valid: true },
    SchemeInfo { scheme: S::Qcldpc648R34,  name: "IEEE 802.11n QC-LDPC n=648 rate 3/4",  rate: R::Rate3_4, codeword_bits: Some(648),  message_bits: Some(486),  valid: true },
    SchemeInfo { scheme: S::Qcldpc648R56,  name: "IEEE 802.11n QC-LDPC n=648 rate 5/6",  rate: R::Rate5_6, codeword_bits: Some(648),  message_bits: Some(540),  valid: true },
    SchemeInfo { scheme: S::Qcldpc1296R12, name: "IEEE 802.11n QC-LDPC n=1296 rate 1/2", rate: R::Rate1_2, codeword_bits: Some(1296), message_bits: Some(648),  valid: true },
    SchemeInfo { scheme: S::Qcldpc1296R23, name: "IEEE 802.11n QC-LDPC n=1296 rate 2/3", rate: R::Rate2_3, codeword_bits: Some(1296), message_bits: Some(864),  valid: true },
    SchemeInfo { scheme: S::Qcldpc1296R34, name: "IEEE 802.11n QC-LDPC n=1296 rate 3/4", rate: R::Rate3_4, codeword_bits: Some(1296), message_bits: Some(972),  valid: true },
    SchemeInfo { scheme: S::Qcldpc1296R56, name: "IEEE 802.11n QC-LDPC n=1296 rate 5/6", rate: R::Rate5_6, codeword_bits: Some(1296), message_bits: Some(1080), valid: true },
    SchemeInfo { scheme: S::Qcldpc1944R12, name: "IEEE 802.11n QC-LDPC n=1944 rate 1/2", rate: R::Rate1_2, codeword_bits: Some(1944), message_bits: Some(972),  valid: true },
    SchemeInfo { scheme: S::Qcldpc1944R23, name: "IEEE 802.11n QC-LDPC n=1944 rate 2/3", rate: R::Rate2_3, codeword_bits: Some(1944), message_bits: Some(1296), valid: true },
    SchemeInfo { scheme: S::Qcldpc1944R34, name: "IEEE 802.11n QC-LDPC n=1944 rate 3/4", rate: R::Rate3_4, codeword_bits: Some(1944), message_bits: Some(1458), valid: true },
    SchemeInfo { scheme: S::Qcldpc1944R56, name: "IEEE 802.11n QC-LDPC n=1944 rate 5/6", rate: R::Rate5_6, codeword_bits: Some(1944), message_bits: Some(1620), valid: true },
    SchemeInfo { scheme: S::ConvR12, name: "CCSDS convolutional K=7 rate 1/2", rate: R::Rate1_2, codeword_bits: None, message_bits: None, valid: true },
    SchemeInfo { scheme: S::ConvR23, name: "CCSDS convolutional K=7 rate 2/3", rate: R::Rate2_3, codeword_bits: None, message_bits: None, valid: true },
    SchemeInfo { scheme: S::ConvR34, name: "CCSDS convolutional K=7 rate 3/4", rate: R::Rate3_4, codeword_bits: None, message_bits: None, valid: true },
    SchemeInfo { scheme: S::ConvR56, name: "CCSDS convolutional K=7 rate 5/6", rate: R::Rate5_6, codeword_bits: None, message_bits: None, valid: true },
    SchemeInfo { scheme: S::ConvR78, name: "CCSDS convolutional K=7 rate 7/8", rate: R::Rate7_8, codeword_bits: None, message_bits: None, valid: true },
    SchemeInfo { scheme: S::Rs255_239I1, name: "CCSDS Reed-Solomon (255,239) interleaving 1", rate: R::RateNa, codeword_bits: Some(2040), message_bits: Some(1912), valid: false },
    SchemeInfo { scheme: S::Rs255_239I2, name: "CCSDS Reed-Solomon (255,239) interleaving 2", rate: R::RateNa, codeword_bits: Some(2040), message_bits: Some(1912), valid: false },
    SchemeInfo { scheme: S::Rs255_239I3, name: "CCSDS Reed-Solomon (255,239) interleaving 3", rate: R::RateNa, codeword_bits: Some(2040), message_bits: Some(1912), valid: false },
    SchemeInfo { scheme: S::Rs255_239I4, name: "CCSDS Reed-Solomon (255,239) interleaving 4", rate: R::RateNa, codeword_bits: Some(2040), message_bits: Some(1912), valid: false },
    SchemeInfo { scheme: S::Rs255_239I5, name: "CCSDS Reed-Solomon (255,239) interleaving 5", rate: R::RateNa, codeword_bits: Some(2040), message_bits: Some(1912), valid: false },
    SchemeInfo { scheme: S::Rs255_239I8, name: "CCSDS Reed-Solomon (255,239) interleaving 8", rate: R::RateNa, codeword_bits: Some(2040), message_bits: Some(1912), valid: false },
    SchemeInfo { scheme: S::Rs255_223I1, name: "CCSDS Reed-Solomon (255,223) interleaving 1", rate: R::RateNa, codeword_bits: Some(2040), message_bits: Some(1784), valid: false },
    SchemeInfo { scheme: S::Rs255_223I2, name: "CCSDS Reed-Solomon (255,223) interleaving 2", rate: R::RateNa, codeword_bits: Some(2040), message_bits: Some(1784), valid: false },
    SchemeInfo { scheme: S::Rs255_223I3, name: "CCSDS Reed-Solomon (255,223) interleaving 3", rate: R::RateNa, codeword_bits: Some(2040), message_bits: Some(1784), valid: false },
    SchemeInfo { scheme: S::Rs255_223I4, name: "CCSDS Reed-Solomon (255,223) interleaving 4", rate: R::RateNa, codeword_bits: Some(2040), message_bits: Some(1784), valid: false },
    SchemeInfo { scheme: S::Rs255_223I5, name: "CCSDS Reed-Solomon (255,223) interleaving 5", rate: R::RateNa, codeword_bits: Some(2040), message_bits: Some(1784), valid: false },
    SchemeInfo { scheme: S::Rs255_223I8, name: "CCSDS Reed-Solomon (255,223) interleaving 8", rate: R::RateNa, codeword_bits: Some(2040), message_bits: Some(1784), valid: false },
    SchemeInfo { scheme: S::Turbo1784R12, name: "CCSDS Turbo k=1784 rate 1/2", rate: R::Rate1_2, codeword_bits: Some(3576),  message_bits: Some(1784), valid: false },
    SchemeInfo { scheme: S::Turbo1784R13, name: "CCSDS Turbo k=1784 rate 1/3", rate: R::Rate1_3, codeword_bits: Some(5364),  message_bits: Some(1784), valid: false },
    SchemeInfo { scheme: S::Turbo1784R14, name: "CCSDS Turbo k=1784 rate 1/4", rate: R::Rate1_4, codeword_bits: Some(7152),  message_bits: Some(1784), valid: false },
    SchemeInfo { scheme: S::Turbo1784R16, name: "CCSDS Turbo k=1784 rate 1/6", rate: R::Rate1_6, codeword_bits: Some(10728), message_bits: Some(1784), valid: false },
    SchemeInfo { scheme: S::Turbo3568R12, name: "CCSDS Turbo k=3568 rate 1/2", rate: R::Rate1_2, codeword_bits: Some(7144),  message_bits: Some(3568), valid: false },
    SchemeInfo { scheme: S::Turbo3568R13, name: "CCSDS Turbo k=3568 rate 1/3", rate: R::Rate1_3, codeword_bits: Some(10716), message_bits: Some(3568), valid: false },
    SchemeInfo { scheme: S::Turbo3568R14, name: "CCSDS Turbo k=3568 rate 1/4", rate: R::Rate1_4, codeword_bits: Some(14288), message_bits: Some(3568), valid: false },
    SchemeInfo { scheme: S::Turbo3568R16, name: "CCSDS Turbo k=3568 rate 1/6", rate: R::Rate1_6, codeword_bits: Some(21432), message_bits: Some(3568), valid: false },
    SchemeInfo { scheme: S::Turbo7136R12, name: "CCSDS Turbo k=7136 rate 1/2", rate: R::Rate1_2, codeword_bits: Some(14280), message_bits: Some(7136), valid: false },
    SchemeInfo { scheme: S::Turbo7136R13, name: "CCSDS Turbo k=7136 rate 1/3", rate: R::Rate1_3, codeword_bits: Some(21420), message_bits: Some(7136), valid: false },
    SchemeInfo { scheme: S::Turbo7136R14, name: "CCSDS Turbo k=7136 rate 1/4", rate: R::Rate1_4, codeword_bits: Some(28560), message_bits: Some(7136), valid: false },
    SchemeInfo { scheme: S::Turbo7136R16, name: "CCSDS Turbo k=7136 rate 1/6", rate: R::Rate1_6, codeword_bits: Some(42840), message_bits: Some(7136), valid: false },
    SchemeInfo { scheme: S::Turbo8920R12, name: "CCSDS Turbo k=8920 rate 1/2", rate: R::Rate1_2, codeword_bits: Some(17848), message_bits: Some(8920), valid: false },
    SchemeInfo { scheme: S::Turbo8920R13, name: "CCSDS Turbo k=8920 rate 1/3", rate: R::Rate1_3, codeword_bits: Some(26772), message_bits: Some(8920), valid: false },
    SchemeInfo { scheme: S::Turbo8920R14, name: "CCSDS Turbo k=8920 rate 1/4", rate: R::Rate1_4, codeword_bits: Some(35696), message_bits: Some(8920), valid: false },
    SchemeInfo { scheme: S::Turbo8920R16, name: "CCSDS Turbo k=8920 rate 1/6", rate: R::Rate1_6, codeword_bits: Some(53544), message_bits: Some(8920), valid: false },
    SchemeInfo { scheme: S::LdpcOrangeBook1280, name: "CCSDS 131.1-O-2 LDPC n=1280", rate: R::Rate4_5, codeword_bits: Some(1280), message_bits: Some(1024), valid: false },
    SchemeInfo { scheme: S::LdpcOrangeBook1536, name: "CCSDS 131.1-O-2 LDPC n=1536", rate: R::Rate2_3, codeword_bits: Some(1536), message_bits: Some(1024), valid: false },
    SchemeInfo { scheme: S::LdpcOrangeBook2048, name: "CCSDS 131.1-O-2 LDPC n=2048", rate: R::Rate1_2, codeword_bits: Some(2048), message_bits: Some(1024), valid: false },
    SchemeInfo { scheme: S::NoFec, name: "No FEC", rate: R::Rate1, codeword_bits: None, message_bits: None, valid: true },
];

impl ErrorCorrectionScheme {
    fn info(self) -> &'static SchemeInfo {
        &SCHEME_TABLE[self as usize]
    }

    /// Human-readable scheme name.
    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// Whether the scheme may be used on this link.
    ///
    /// Reed-Solomon, Turbo and Orange-Book LDPC rows are registered for
    /// wire compatibility but are not usable.
    pub fn is_valid(self) -> bool {
        self.info().valid
    }

    /// Coding rate of the scheme.
    pub fn coding_rate(self) -> CodingRate {
        self.info().rate
    }

    /// Codeword length in bits.
    ///
    /// Continuous codes (and NO_FEC) take `continuous_max` as the codeword
    /// length; block codes ignore it.
    pub fn codeword_bits(self, continuous_max: u32) -> u32 {
        match self.info().codeword_bits {
            Some(bits) => bits,
            None => continuous_max,
        }
    }

    /// Message length in bits.
    ///
    /// For the convolutional schemes this is `floor(n * r) - (K - 1)`
    /// rounded down to a whole number of bytes: the codeword must hold the
    /// K-1 trellis flush bits, and the framer segments packets on byte
    /// boundaries. NO_FEC carries the codeword length unchanged.
    pub fn message_bits(self, continuous_max: u32) -> u32 {
        match self.info().message_bits {
            Some(bits) => bits,
            None => {
                if self == ErrorCorrectionScheme::NoFec {
                    continuous_max
                } else {
                    let (num, den) = self
                        .coding_rate()
                        .as_fraction()
                        .expect("continuous schemes have a concrete rate");
                    let tail = CCSDS_CONSTRAINT_LENGTH as u32 - 1;
                    let m = (continuous_max * num / den).saturating_sub(tail);
                    m - (m % 8)
                }
            }
        }
    }

    /// The 6-bit wire value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ErrorCorrectionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for ErrorCorrectionScheme {
    type Error = MacError;

    fn try_from(value: u8) -> MacResult<Self> {
        SCHEME_TABLE
            .get(value as usize)
            .map(|info| info.scheme)
            .ok_or(MacError::InvalidScheme(value))
    }
}

/// Codeword geometry for one scheme, resolved at construction.
///
/// Read-only after construction; may be shared freely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCorrection {
    scheme: ErrorCorrectionScheme,
    continuous_max_codeword_len: u32,
    rate: CodingRate,
    codeword_len: u32,
    message_len: u32,
}

impl ErrorCorrection {
    /// Geometry with the continuous maximum codeword length set to one MPDU
    /// payload (119 bytes), the value the framer uses.
    pub fn new(scheme: ErrorCorrectionScheme) -> MacResult<Self> {
        Self::with_continuous_max(scheme, (MPDU_PAYLOAD_BYTES * 8) as u32)
    }

    /// Geometry with an explicit continuous maximum codeword length in bits.
    ///
    /// Fails for schemes the link cannot use (`is_valid() == false`).
    pub fn with_continuous_max(
        scheme: ErrorCorrectionScheme,
        continuous_max: u32,
    ) -> MacResult<Self> {
        if !scheme.is_valid() {
            return Err(MacError::SchemeNotSupported(scheme.name()));
        }
        Ok(Self {
            scheme,
            continuous_max_codeword_len: continuous_max,
            rate: scheme.coding_rate(),
            codeword_len: scheme.codeword_bits(continuous_max),
            message_len: scheme.message_bits(continuous_max),
        })
    }

    /// The scheme tag.
    pub fn scheme(&self) -> ErrorCorrectionScheme {
        self.scheme
    }

    /// The continuous maximum codeword length supplied at construction,
    /// in bits.
    pub fn continuous_max_codeword_len(&self) -> u32 {
        self.continuous_max_codeword_len
    }

    /// Coding rate.
    pub fn coding_rate(&self) -> CodingRate {
        self.rate
    }

    /// Codeword length in bits.
    pub fn codeword_len(&self) -> u32 {
        self.codeword_len
    }

    /// Message length in bits.
    pub fn message_len(&self) -> u32 {
        self.message_len
    }

    /// Codeword length in whole bytes.
    pub fn codeword_bytes(&self) -> usize {
        (self.codeword_len / 8) as usize
    }

    /// Per-message byte capacity used for packet segmentation and MPDU
    /// accounting.
    pub fn message_bytes(&self) -> usize {
        self.message_len.div_ceil(8) as usize
    }

    /// Number of MPDU fragments needed to carry one codeword in payloads of
    /// `payload_len` bytes.
    ///
    /// NO_FEC has no codeword boundary, so the answer is always one.
    pub fn num_codeword_fragments(&self, payload_len: usize) -> u32 {
        assert!(payload_len > 0, "payload length must be non-zero");
        if self.scheme == ErrorCorrectionScheme::NoFec {
            1
        } else {
            self.codeword_bytes().div_ceil(payload_len) as u32
        }
    }
}
