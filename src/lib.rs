//! # UHF MAC framing and FEC core
//!
//! MAC-layer framing for a narrow-band UHF satellite link. Variable-length
//! upper-layer datagrams (CSP, up to 4 KiB) become a stream of fixed
//! 128-byte transparent-mode radio frames, and received frames are
//! reassembled back into the datagram while channel bit errors are
//! corrected along the way.
//!
//! ## Signal flow
//!
//! ```text
//! TX: datagram → segment into FEC messages → encode codewords
//!       → split into 119-byte fragments → Golay-protected header + fragment
//!       → 128-byte frame to the radio
//! RX: frame → recover header (Golay) → slot fragment by indices
//!       → Viterbi-decode completed codewords → concatenate → datagram
//! ```
//!
//! The FEC scheme registry ([`error_correction`]) is the single source of
//! truth for codeword geometry; the header ([`mpdu_header`]) survives
//! channel errors on its own thanks to three extended Golay(24,12)
//! codewords; the payload rides the CCSDS K=7 rate-1/2 convolutional code
//! ([`convolutional`]) or passes through uncoded.
//!
//! ## Example
//!
//! ```rust
//! use uhf_mac::{ErrorCorrectionScheme, MpduFramer, ReceiveEvent, RfMode};
//!
//! let mut tx = MpduFramer::new(ErrorCorrectionScheme::ConvR12, RfMode::Mode3).unwrap();
//! let mut rx = MpduFramer::new(ErrorCorrectionScheme::ConvR12, RfMode::Mode3).unwrap();
//!
//! let datagram = b"hello spacecraft".to_vec();
//! let frames = tx.encode_user_packet(&datagram).unwrap();
//! assert!(frames.iter().all(|f| f.len() == 128));
//!
//! for frame in &frames {
//!     match rx.receive_frame(frame).unwrap() {
//!         ReceiveEvent::PacketReady(bytes) => assert_eq!(bytes, datagram),
//!         ReceiveEvent::FragmentAccepted => {}
//!         ReceiveEvent::HeaderInvalid => unreachable!("noiseless channel"),
//!     }
//! }
//! ```
//!
//! The core is synchronous and single-threaded per channel: no internal
//! scheduler, no callbacks, every call completes before returning. Radio
//! I/O and timeout policy live above this crate.

pub mod convolutional;
pub mod error;
pub mod error_correction;
pub mod fec;
pub mod framer;
pub mod golay;
pub mod mpdu;
pub mod mpdu_header;
pub mod ppdu;
pub mod rf_mode;

pub use error::{MacError, MacResult};
pub use error_correction::{CodingRate, ErrorCorrection, ErrorCorrectionScheme};
pub use fec::{fec_for_scheme, Fec};
pub use framer::{FramerStatistics, MpduFramer, ReceiveEvent};
pub use mpdu::{number_of_mpdus, Mpdu, MPDU_LENGTH_BYTES, MPDU_PAYLOAD_BYTES};
pub use mpdu_header::{MpduHeader, MPDU_HEADER_BYTES};
pub use ppdu::{BitsPerOctet, Ppdu};
pub use rf_mode::RfMode;
