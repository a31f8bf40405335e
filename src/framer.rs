//! MPDU framer: user packets to transparent-mode frames and back.
//!
//! Transmit: the upper layer's buffer image (transport prefix plus
//! datagram) is segmented into FEC messages, each message is encoded into
//! one codeword, and each codeword is split into 119-byte fragments that
//! ride in consecutive MPDUs. Frames leave in ascending
//! (user packet fragment index, codeword fragment index) order.
//!
//! Receive: frames arrive in any order. Each valid header places its
//! fragment in a slot keyed by the two indices; a codeword is decoded the
//! moment its last fragment lands, and the datagram is delivered when every
//! codeword of the packet is in. A header that fails Golay correction, or
//! that names a scheme or index the geometry cannot honour, drops only that
//! frame.
//!
//! The core is synchronous and single-channel: one packet is reassembled at
//! a time, and a valid frame for a different (length, scheme) pair restarts
//! reassembly. Timeout policy belongs to the caller, which can simply drop
//! the framer or keep feeding frames.
//!
//! ## Example
//!
//! ```rust
//! use uhf_mac::framer::{MpduFramer, ReceiveEvent};
//! use uhf_mac::error_correction::ErrorCorrectionScheme;
//! use uhf_mac::rf_mode::RfMode;
//!
//! let mut tx = MpduFramer::new(ErrorCorrectionScheme::ConvR12, RfMode::Mode3).unwrap();
//! let mut rx = MpduFramer::new(ErrorCorrectionScheme::ConvR12, RfMode::Mode3).unwrap();
//!
//! let packet: Vec<u8> = (0..200u16).map(|i| i as u8).collect();
//! let frames = tx.encode_user_packet(&packet).unwrap();
//!
//! let mut delivered = None;
//! for frame in &frames {
//!     if let ReceiveEvent::PacketReady(bytes) = rx.receive_frame(frame).unwrap() {
//!         delivered = Some(bytes);
//!     }
//! }
//! assert_eq!(delivered.unwrap(), packet);
//! ```

use tracing::debug;

use crate::error::{MacError, MacResult};
use crate::error_correction::{ErrorCorrection, ErrorCorrectionScheme};
use crate::fec::{fec_for_scheme, Fec};
use crate::mpdu::{
    Mpdu, CSP_LENGTH_OFFSET, CSP_MTU_BYTES, CSP_PACKET_PREFIX_BYTES, MPDU_LENGTH_BYTES,
    MPDU_PAYLOAD_BYTES,
};
use crate::mpdu_header::MpduHeader;
use crate::rf_mode::RfMode;

/// Outcome of feeding one frame to the receive side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveEvent {
    /// The fragment was stored; the packet is still incomplete.
    FragmentAccepted,
    /// The last fragment arrived; here is the reassembled datagram.
    PacketReady(Vec<u8>),
    /// The frame carried an unusable header and was dropped.
    HeaderInvalid,
}

/// Counters for one framer instance.
#[derive(Debug, Clone, Default)]
pub struct FramerStatistics {
    /// Frames handed to `receive_frame` with an acceptable length.
    pub frames_received: u64,
    /// Frames dropped for an uncorrectable or inconsistent header.
    pub invalid_headers: u64,
    /// Partial packets abandoned because a frame for a different packet
    /// arrived.
    pub reassemblies_restarted: u64,
    /// Datagrams delivered upward.
    pub packets_delivered: u64,
    /// Frames produced by `encode_user_packet`.
    pub frames_sent: u64,
}

/// Reassembly state for one in-flight user packet.
struct Reassembly {
    scheme: ErrorCorrectionScheme,
    user_packet_length: u16,
    error_correction: ErrorCorrection,
    codec: Box<dyn Fec>,
    fragments_per_codeword: usize,
    codewords: Vec<CodewordSlot>,
}

/// Fragment accumulator for one codeword.
struct CodewordSlot {
    buffer: Vec<u8>,
    present: Vec<bool>,
    decoded: Option<Vec<u8>>,
}

impl CodewordSlot {
    fn new(fragments_per_codeword: usize) -> Self {
        Self {
            buffer: vec![0; fragments_per_codeword * MPDU_PAYLOAD_BYTES],
            present: vec![false; fragments_per_codeword],
            decoded: None,
        }
    }

    fn complete(&self) -> bool {
        self.present.iter().all(|&p| p)
    }
}

impl Reassembly {
    fn start(header: &MpduHeader) -> MacResult<Self> {
        let scheme = header.error_correction_scheme();
        let codec = fec_for_scheme(scheme)?;
        let error_correction = header.error_correction().clone();
        let fragments_per_codeword =
            error_correction.num_codeword_fragments(MPDU_PAYLOAD_BYTES) as usize;
        let expected_codewords = expected_codewords(
            header.user_packet_length(),
            error_correction.message_bytes(),
        );
        let codewords = (0..expected_codewords)
            .map(|_| CodewordSlot::new(fragments_per_codeword))
            .collect();
        Ok(Self {
            scheme,
            user_packet_length: header.user_packet_length(),
            error_correction,
            codec,
            fragments_per_codeword,
            codewords,
        })
    }

    fn matches(&self, header: &MpduHeader) -> bool {
        self.scheme == header.error_correction_scheme()
            && self.user_packet_length == header.user_packet_length()
    }
}

/// Codewords needed for a datagram whose advertised length is `upl`.
fn expected_codewords(upl: u16, message_bytes: usize) -> usize {
    (upl as usize + CSP_PACKET_PREFIX_BYTES).div_ceil(message_bytes)
}

/// Framer for one UHF channel.
///
/// Owns the codec and the reassembly buffers; not meant to be shared
/// between channels (the decoder scratch is mutable state).
pub struct MpduFramer {
    rf_mode: RfMode,
    error_correction: ErrorCorrection,
    codec: Box<dyn Fec>,
    reassembly: Option<Reassembly>,
    stats: FramerStatistics,
}

impl MpduFramer {
    /// Build a framer transmitting with the given scheme and RF mode.
    ///
    /// Fails when the scheme has no end-to-end codec.
    pub fn new(scheme: ErrorCorrectionScheme, rf_mode: RfMode) -> MacResult<Self> {
        let codec = fec_for_scheme(scheme)?;
        let error_correction = codec.error_correction().clone();
        Ok(Self {
            rf_mode,
            error_correction,
            codec,
            reassembly: None,
            stats: FramerStatistics::default(),
        })
    }

    /// The transmit-side scheme geometry.
    pub fn error_correction(&self) -> &ErrorCorrection {
        &self.error_correction
    }

    /// The RF mode stamped into transmitted headers.
    pub fn rf_mode(&self) -> RfMode {
        self.rf_mode
    }

    /// Counters accumulated so far.
    pub fn statistics(&self) -> &FramerStatistics {
        &self.stats
    }

    /// Encode one datagram into transparent-mode frames of 128 bytes.
    pub fn encode_user_packet(&mut self, packet: &[u8]) -> MacResult<Vec<Vec<u8>>> {
        if packet.len() > CSP_MTU_BYTES {
            return Err(MacError::BadFormat(format!(
                "datagram of {} bytes exceeds the {}-byte MTU",
                packet.len(),
                CSP_MTU_BYTES
            )));
        }

        // The buffer image the radio carries: transport prefix holding the
        // datagram length, then the datagram itself.
        let mut image = vec![0u8; CSP_PACKET_PREFIX_BYTES + packet.len()];
        image[CSP_LENGTH_OFFSET..CSP_LENGTH_OFFSET + 2]
            .copy_from_slice(&(packet.len() as u16).to_be_bytes());
        image[CSP_PACKET_PREFIX_BYTES..].copy_from_slice(packet);

        let message_bytes = self.error_correction.message_bytes();
        let codeword_bytes = self.error_correction.codeword_bytes();
        let upl = packet.len().min(0x0FFF) as u16;

        let mut frames = Vec::new();
        for (codeword_index, chunk) in image.chunks(message_bytes).enumerate() {
            let codeword_index = u8::try_from(codeword_index).map_err(|_| {
                MacError::BadFormat("packet needs more than 256 codewords".to_string())
            })?;

            let mut message = chunk.to_vec();
            message.resize(message_bytes, 0);

            let mut codeword = self.codec.encode(&message);
            codeword.resize(codeword_bytes.max(codeword.len()), 0);

            for (fragment_index, fragment) in
                codeword.chunks(MPDU_PAYLOAD_BYTES).enumerate()
            {
                let header = MpduHeader::new(
                    MPDU_LENGTH_BYTES as u8,
                    self.rf_mode,
                    &self.error_correction,
                    fragment_index as u8,
                    upl,
                    codeword_index,
                )?;
                let mpdu = Mpdu::new(header, fragment.to_vec())?;
                frames.push(mpdu.to_raw(false));
            }
        }

        self.stats.frames_sent += frames.len() as u64;
        Ok(frames)
    }

    /// Feed one received frame (128 bytes, or 129 with the Data Field 1
    /// prefix) to the reassembler.
    ///
    /// A frame of any other length is the caller's bug and fails with
    /// [`MacError::BadFormat`]; everything channel-induced is absorbed into
    /// [`ReceiveEvent::HeaderInvalid`].
    pub fn receive_frame(&mut self, frame: &[u8]) -> MacResult<ReceiveEvent> {
        let mpdu = match Mpdu::from_raw(frame) {
            Ok(mpdu) => mpdu,
            Err(MacError::BadFormat(msg)) => return Err(MacError::BadFormat(msg)),
            Err(error) => {
                debug!(%error, "dropping frame with unusable header");
                self.stats.frames_received += 1;
                self.stats.invalid_headers += 1;
                return Ok(ReceiveEvent::HeaderInvalid);
            }
        };
        self.stats.frames_received += 1;

        let header = mpdu.header();

        // (Re)start reassembly when this frame opens a different packet.
        if !self
            .reassembly
            .as_ref()
            .map(|r| r.matches(header))
            .unwrap_or(false)
        {
            let next = match Reassembly::start(header) {
                Ok(next) => next,
                Err(error) => {
                    debug!(%error, "dropping frame for scheme without a codec");
                    self.stats.invalid_headers += 1;
                    return Ok(ReceiveEvent::HeaderInvalid);
                }
            };
            if self.reassembly.take().is_some() {
                debug!(
                    scheme = %header.error_correction_scheme(),
                    user_packet_length = header.user_packet_length(),
                    "restarting reassembly for a new packet"
                );
                self.stats.reassemblies_restarted += 1;
            }
            self.reassembly = Some(next);
        }
        let reassembly = self.reassembly.as_mut().expect("reassembly just ensured");

        let fragment_index = header.codeword_fragment_index() as usize;
        let codeword_index = header.user_packet_fragment_index() as usize;
        if fragment_index >= reassembly.fragments_per_codeword
            || codeword_index >= reassembly.codewords.len()
        {
            debug!(
                fragment_index,
                codeword_index, "dropping frame with out-of-range indices"
            );
            self.stats.invalid_headers += 1;
            return Ok(ReceiveEvent::HeaderInvalid);
        }

        // Store the fragment; a duplicate simply overwrites its slot.
        let slot = &mut reassembly.codewords[codeword_index];
        let offset = fragment_index * MPDU_PAYLOAD_BYTES;
        slot.buffer[offset..offset + MPDU_PAYLOAD_BYTES].copy_from_slice(mpdu.codeword());
        slot.present[fragment_index] = true;

        if slot.decoded.is_none() && slot.complete() {
            let codeword = &slot.buffer[..reassembly.error_correction.codeword_bytes()];
            let (mut message, _bit_errors) = reassembly.codec.decode(codeword, 0.0);
            message.resize(reassembly.error_correction.message_bytes(), 0);
            slot.decoded = Some(message);
        }

        if reassembly
            .codewords
            .iter()
            .all(|slot| slot.decoded.is_some())
        {
            let reassembly = self.reassembly.take().expect("reassembly present");
            let mut image = Vec::with_capacity(
                reassembly.codewords.len() * reassembly.error_correction.message_bytes(),
            );
            for slot in &reassembly.codewords {
                image.extend_from_slice(slot.decoded.as_ref().expect("all decoded"));
            }

            // The transport prefix carries the authoritative datagram
            // length; the 12-bit header field saturates at 4095.
            let datagram_len = u16::from_be_bytes([
                image[CSP_LENGTH_OFFSET],
                image[CSP_LENGTH_OFFSET + 1],
            ]) as usize;
            let available = image.len() - CSP_PACKET_PREFIX_BYTES;
            let datagram = image
                [CSP_PACKET_PREFIX_BYTES..CSP_PACKET_PREFIX_BYTES + datagram_len.min(available)]
                .to_vec();

            self.stats.packets_delivered += 1;
            return Ok(ReceiveEvent::PacketReady(datagram));
        }

        Ok(ReceiveEvent::FragmentAccepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mpdu::number_of_mpdus;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn framer(scheme: ErrorCorrectionScheme) -> MpduFramer {
        MpduFramer::new(scheme, RfMode::Mode3).unwrap()
    }

    fn deliver(rx: &mut MpduFramer, frames: &[Vec<u8>]) -> Option<Vec<u8>> {
        let mut delivered = None;
        for frame in frames {
            if let ReceiveEvent::PacketReady(bytes) = rx.receive_frame(frame).unwrap() {
                assert!(delivered.is_none(), "packet delivered twice");
                delivered = Some(bytes);
            }
        }
        delivered
    }

    #[test]
    fn test_empty_packet_no_fec() {
        let mut tx = framer(ErrorCorrectionScheme::NoFec);
        let frames = tx.encode_user_packet(&[]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), MPDU_LENGTH_BYTES);

        let mpdu = Mpdu::from_raw(&frames[0]).unwrap();
        let header = mpdu.header();
        assert_eq!(header.rf_mode(), RfMode::Mode3);
        assert_eq!(
            header.error_correction_scheme(),
            ErrorCorrectionScheme::NoFec
        );
        assert_eq!(header.codeword_fragment_index(), 0);
        assert_eq!(header.user_packet_length(), 0);
        assert_eq!(header.user_packet_fragment_index(), 0);
        // prefix length field is zero, so the whole payload is zeros
        assert!(mpdu.codeword().iter().all(|&b| b == 0));

        let mut rx = framer(ErrorCorrectionScheme::NoFec);
        assert_eq!(deliver(&mut rx, &frames), Some(Vec::new()));
    }

    #[test]
    fn test_single_payload_convolutional_packet() {
        let mut tx = framer(ErrorCorrectionScheme::ConvR12);
        let packet: Vec<u8> = (0..119u8).map(|i| i.wrapping_add(0x30)).collect();
        let frames = tx.encode_user_packet(&packet).unwrap();
        assert_eq!(frames.len(), 3);

        for (i, frame) in frames.iter().enumerate() {
            let header = Mpdu::from_raw(frame).unwrap().header().clone();
            assert_eq!(header.user_packet_length(), 119);
            assert_eq!(header.user_packet_fragment_index(), i as u8);
            assert_eq!(header.codeword_fragment_index(), 0);
        }

        let mut rx = framer(ErrorCorrectionScheme::ConvR12);
        assert_eq!(deliver(&mut rx, &frames), Some(packet));
    }

    #[test]
    fn test_fragmented_codeword_header_grid() {
        // A 358-byte packet under QC-LDPC 1944 R1/2 occupies 4 codewords of
        // 3 fragments each. The scheme has no codec, so the grid is checked
        // at the header/accounting level.
        let ec = ErrorCorrection::new(ErrorCorrectionScheme::Qcldpc1944R12).unwrap();
        assert_eq!(number_of_mpdus(358, &ec), 12);
        assert_eq!(ec.num_codeword_fragments(MPDU_PAYLOAD_BYTES), 3);

        for codeword_index in 0..4u8 {
            for fragment_index in 0..3u8 {
                let header = MpduHeader::new(
                    MPDU_LENGTH_BYTES as u8,
                    RfMode::Mode3,
                    &ec,
                    fragment_index,
                    358,
                    codeword_index,
                )
                .unwrap();
                let decoded = MpduHeader::decode(&header.encode(), false).unwrap();
                assert_eq!(decoded.user_packet_length(), 358);
                assert_eq!(decoded.codeword_fragment_index(), fragment_index);
                assert_eq!(decoded.user_packet_fragment_index(), codeword_index);
            }
        }
    }

    #[test]
    fn test_roundtrip_lengths_both_codecs() {
        for scheme in [ErrorCorrectionScheme::ConvR12, ErrorCorrectionScheme::NoFec] {
            for len in [0usize, 10, 103, 119, 358, 4096] {
                let mut tx = framer(scheme);
                let mut rx = framer(scheme);
                let packet: Vec<u8> = (0..len).map(|i| (i % 256) as u8).collect();
                let frames = tx.encode_user_packet(&packet).unwrap();
                assert_eq!(
                    frames.len(),
                    number_of_mpdus(len, tx.error_correction()) as usize,
                    "{} at {} bytes",
                    scheme,
                    len
                );
                assert_eq!(
                    deliver(&mut rx, &frames),
                    Some(packet),
                    "{} at {} bytes",
                    scheme,
                    len
                );
            }
        }
    }

    #[test]
    fn test_out_of_order_and_duplicate_frames() {
        let mut tx = framer(ErrorCorrectionScheme::ConvR12);
        let packet: Vec<u8> = (0..500u16).map(|i| (i * 3) as u8).collect();
        let mut frames = tx.encode_user_packet(&packet).unwrap();

        frames.reverse();
        let duplicate = frames[3].clone();
        frames.insert(0, duplicate);

        let mut rx = framer(ErrorCorrectionScheme::ConvR12);
        assert_eq!(deliver(&mut rx, &frames), Some(packet));
        assert_eq!(rx.statistics().packets_delivered, 1);
    }

    #[test]
    fn test_corrupt_header_drops_only_that_frame() {
        let mut tx = framer(ErrorCorrectionScheme::ConvR12);
        let packet: Vec<u8> = (0..200u8).collect();
        let frames = tx.encode_user_packet(&packet).unwrap();

        let mut rx = framer(ErrorCorrectionScheme::ConvR12);

        // Copy of the first frame with five flips inside header codeword 0.
        let mut corrupted = frames[0].clone();
        for bit in [0usize, 5, 10, 15, 23] {
            corrupted[bit / 8] ^= 1 << (7 - bit % 8);
        }
        assert_eq!(
            rx.receive_frame(&corrupted).unwrap(),
            ReceiveEvent::HeaderInvalid
        );
        assert_eq!(rx.statistics().invalid_headers, 1);

        assert_eq!(deliver(&mut rx, &frames), Some(packet));
    }

    #[test]
    fn test_payload_bit_errors_corrected_end_to_end() {
        let mut tx = framer(ErrorCorrectionScheme::ConvR12);
        let packet: Vec<u8> = (0..119u8).map(|i| i | 0x30).collect();
        let mut frames = tx.encode_user_packet(&packet).unwrap();

        // One flipped bit in half the payload bytes of every frame, chosen
        // at random; the headers stay clean.
        let mut rng = StdRng::seed_from_u64(0xE2);
        for frame in &mut frames {
            let payload_len = frame.len() - 9;
            let mut flipped = std::collections::HashSet::new();
            while flipped.len() < payload_len / 2 {
                let idx = 9 + rng.gen_range(0..payload_len);
                if flipped.insert(idx) {
                    frame[idx] ^= 0x10;
                }
            }
        }

        let mut rx = framer(ErrorCorrectionScheme::ConvR12);
        assert_eq!(deliver(&mut rx, &frames), Some(packet));
    }

    #[test]
    fn test_new_packet_restarts_reassembly() {
        let mut tx = framer(ErrorCorrectionScheme::ConvR12);
        let first: Vec<u8> = vec![0xAB; 200];
        let second: Vec<u8> = vec![0xCD; 100];
        let first_frames = tx.encode_user_packet(&first).unwrap();
        let second_frames = tx.encode_user_packet(&second).unwrap();

        let mut rx = framer(ErrorCorrectionScheme::ConvR12);
        assert_eq!(
            rx.receive_frame(&first_frames[0]).unwrap(),
            ReceiveEvent::FragmentAccepted
        );
        assert_eq!(deliver(&mut rx, &second_frames), Some(second));
        assert_eq!(rx.statistics().reassemblies_restarted, 1);
    }

    #[test]
    fn test_out_of_range_fragment_index_dropped() {
        let ec = ErrorCorrection::new(ErrorCorrectionScheme::ConvR12).unwrap();
        // ConvR12 codewords fit one payload, so fragment index 5 is bogus.
        let header =
            MpduHeader::new(MPDU_LENGTH_BYTES as u8, RfMode::Mode0, &ec, 5, 50, 0).unwrap();
        let frame = Mpdu::new(header, vec![0; MPDU_PAYLOAD_BYTES])
            .unwrap()
            .to_raw(false);

        let mut rx = framer(ErrorCorrectionScheme::ConvR12);
        assert_eq!(
            rx.receive_frame(&frame).unwrap(),
            ReceiveEvent::HeaderInvalid
        );
    }

    #[test]
    fn test_wrong_frame_length_is_callers_error() {
        let mut rx = framer(ErrorCorrectionScheme::NoFec);
        assert!(matches!(
            rx.receive_frame(&[0u8; 64]),
            Err(MacError::BadFormat(_))
        ));
    }

    #[test]
    fn test_oversized_packet_rejected() {
        let mut tx = framer(ErrorCorrectionScheme::NoFec);
        assert!(matches!(
            tx.encode_user_packet(&vec![0u8; CSP_MTU_BYTES + 1]),
            Err(MacError::BadFormat(_))
        ));
    }

    #[test]
    fn test_receive_frame_with_length_prefix() {
        let mut tx = framer(ErrorCorrectionScheme::NoFec);
        let packet = vec![0x42u8; 30];
        let frames = tx.encode_user_packet(&packet).unwrap();

        // Re-wrap the frame the way the radio presents it with Data Field 1.
        let mpdu = Mpdu::from_raw(&frames[0]).unwrap();
        let prefixed = mpdu.to_raw(true);
        assert_eq!(prefixed.len(), 129);

        let mut rx = framer(ErrorCorrectionScheme::NoFec);
        assert_eq!(
            rx.receive_frame(&prefixed).unwrap(),
            ReceiveEvent::PacketReady(packet)
        );
    }

    #[test]
    fn test_statistics_accumulate() {
        let mut tx = framer(ErrorCorrectionScheme::ConvR12);
        let packet = vec![7u8; 150];
        let frames = tx.encode_user_packet(&packet).unwrap();
        assert_eq!(tx.statistics().frames_sent, frames.len() as u64);

        let mut rx = framer(ErrorCorrectionScheme::ConvR12);
        deliver(&mut rx, &frames).unwrap();
        assert_eq!(rx.statistics().frames_received, frames.len() as u64);
        assert_eq!(rx.statistics().packets_delivered, 1);
        assert_eq!(rx.statistics().invalid_headers, 0);
    }
}
