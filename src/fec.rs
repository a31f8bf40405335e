//! FEC codec seam: one trait, one codec per scheme family.
//!
//! The framer talks to codecs through the [`Fec`] trait and builds them
//! with [`fec_for_scheme`]. Only the CCSDS rate-1/2 convolutional codec and
//! the NO_FEC passthrough exist end-to-end; the remaining registered
//! schemes fail construction, never encode.
//!
//! Codecs exchange packed bytes with the framer. Internally the
//! convolutional codec works on 1-bit-per-octet sequences and repacks at
//! the boundary.

use crate::convolutional::{ConvCodeConfig, ConvolutionalEncoder, ViterbiDecoder};
use crate::error::{MacError, MacResult};
use crate::error_correction::{ErrorCorrection, ErrorCorrectionScheme};
use crate::ppdu::{BitsPerOctet, Ppdu};

/// A forward-error-correction codec for one scheme.
///
/// `decode` never fails: hard-decision decoding always produces a
/// best-effort estimate, and the returned bit-error count is the sentinel
/// zero because the receiver has no ground truth. Instances hold mutable
/// decoder scratch and must not be shared between channels.
pub trait Fec {
    /// Geometry of the scheme this codec implements.
    fn error_correction(&self) -> &ErrorCorrection;

    /// Encode one message into one codeword (packed bytes in and out).
    fn encode(&mut self, message: &[u8]) -> Vec<u8>;

    /// Decode one codeword estimate (packed bytes in and out).
    ///
    /// `snr_estimate` is accepted for interface symmetry with soft-decision
    /// codecs; the hard-decision implementations ignore it.
    fn decode(&mut self, encoded: &[u8], snr_estimate: f32) -> (Vec<u8>, u32);
}

/// Build the codec for a scheme.
pub fn fec_for_scheme(scheme: ErrorCorrectionScheme) -> MacResult<Box<dyn Fec>> {
    use ErrorCorrectionScheme::*;
    match scheme {
        NoFec => Ok(Box::new(NoFecCodec::new()?)),
        ConvR12 => Ok(Box::new(ConvolutionalCodecHd::new(scheme)?)),
        ConvR23 | ConvR34 | ConvR56 | ConvR78 => Err(MacError::NotImplemented(
            "punctured convolutional rates have no codec yet",
        )),
        Qcldpc648R12 | Qcldpc648R23 | Qcldpc648R34 | Qcldpc648R56 | Qcldpc1296R12
        | Qcldpc1296R23 | Qcldpc1296R34 | Qcldpc1296R56 | Qcldpc1944R12 | Qcldpc1944R23
        | Qcldpc1944R34 | Qcldpc1944R56 => {
            Err(MacError::NotImplemented("no QC-LDPC codec on this link"))
        }
        other => Err(MacError::SchemeNotSupported(other.name())),
    }
}

/// Passthrough codec: the codeword is the message.
#[derive(Debug)]
pub struct NoFecCodec {
    error_correction: ErrorCorrection,
}

impl NoFecCodec {
    pub fn new() -> MacResult<Self> {
        Ok(Self {
            error_correction: ErrorCorrection::new(ErrorCorrectionScheme::NoFec)?,
        })
    }
}

impl Fec for NoFecCodec {
    fn error_correction(&self) -> &ErrorCorrection {
        &self.error_correction
    }

    fn encode(&mut self, message: &[u8]) -> Vec<u8> {
        message.to_vec()
    }

    fn decode(&mut self, encoded: &[u8], _snr_estimate: f32) -> (Vec<u8>, u32) {
        (encoded.to_vec(), 0)
    }
}

/// CCSDS K=7 rate-1/2 convolutional codec with hard-decision Viterbi
/// decoding.
#[derive(Debug)]
pub struct ConvolutionalCodecHd {
    error_correction: ErrorCorrection,
    encoder: ConvolutionalEncoder,
    decoder: ViterbiDecoder,
}

impl ConvolutionalCodecHd {
    /// Build the codec for a convolutional scheme.
    ///
    /// Only rate 1/2 is implemented; the punctured rates are registered in
    /// the scheme table but fail here.
    pub fn new(scheme: ErrorCorrectionScheme) -> MacResult<Self> {
        use ErrorCorrectionScheme::*;
        match scheme {
            ConvR12 => {}
            ConvR23 | ConvR34 | ConvR56 | ConvR78 => {
                return Err(MacError::NotImplemented(
                    "punctured convolutional rates have no codec yet",
                ))
            }
            other => return Err(MacError::SchemeNotSupported(other.name())),
        }

        let config = ConvCodeConfig::ccsds_k7_rate_half();
        Ok(Self {
            error_correction: ErrorCorrection::new(scheme)?,
            encoder: ConvolutionalEncoder::new(config.clone()),
            decoder: ViterbiDecoder::new(config),
        })
    }
}

impl Fec for ConvolutionalCodecHd {
    fn error_correction(&self) -> &ErrorCorrection {
        &self.error_correction
    }

    fn encode(&mut self, message: &[u8]) -> Vec<u8> {
        let mut bits = Ppdu::new(message.to_vec(), BitsPerOctet::Eight);
        bits.repack(BitsPerOctet::One);
        let encoded = self.encoder.encode_bits(bits.payload());
        let mut packed = Ppdu::new(encoded, BitsPerOctet::One);
        packed.repack(BitsPerOctet::Eight);
        packed.into_payload()
    }

    fn decode(&mut self, encoded: &[u8], _snr_estimate: f32) -> (Vec<u8>, u32) {
        let mut bits = Ppdu::new(encoded.to_vec(), BitsPerOctet::Eight);
        bits.repack(BitsPerOctet::One);
        let mut decoded = self.decoder.decode_bits(bits.payload());

        // drop the trellis flush bits
        let flush = crate::convolutional::CCSDS_CONSTRAINT_LENGTH - 1;
        decoded.truncate(decoded.len().saturating_sub(flush));

        let mut packed = Ppdu::new(decoded, BitsPerOctet::One);
        packed.repack(BitsPerOctet::Eight);
        (packed.into_payload(), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// A CSP buffer image like the flight stack hands down: 14 transport
    /// bytes then ASCII-ish data.
    fn csp_image(data_len: usize) -> Vec<u8> {
        let mut p = vec![0u8; 14];
        p[8] = (data_len >> 8) as u8;
        p[9] = data_len as u8;
        for i in 0..data_len {
            p.push((i as u8) | 0x30);
        }
        p
    }

    #[test]
    fn test_factory_dispatch() {
        assert!(fec_for_scheme(ErrorCorrectionScheme::NoFec).is_ok());
        assert!(fec_for_scheme(ErrorCorrectionScheme::ConvR12).is_ok());
        assert!(matches!(
            fec_for_scheme(ErrorCorrectionScheme::ConvR34),
            Err(MacError::NotImplemented(_))
        ));
        assert!(matches!(
            fec_for_scheme(ErrorCorrectionScheme::Qcldpc648R12),
            Err(MacError::NotImplemented(_))
        ));
        assert!(matches!(
            fec_for_scheme(ErrorCorrectionScheme::Rs255_239I1),
            Err(MacError::SchemeNotSupported(_))
        ));
    }

    #[test]
    fn test_codec_rejects_foreign_schemes() {
        assert!(matches!(
            ConvolutionalCodecHd::new(ErrorCorrectionScheme::ConvR78),
            Err(MacError::NotImplemented(_))
        ));
        assert!(matches!(
            ConvolutionalCodecHd::new(ErrorCorrectionScheme::NoFec),
            Err(MacError::SchemeNotSupported(_))
        ));
    }

    #[test]
    fn test_no_fec_is_identity() {
        let mut codec = NoFecCodec::new().unwrap();
        let data = csp_image(50);
        let encoded = codec.encode(&data);
        assert_eq!(encoded, data);
        let (decoded, bit_errors) = codec.decode(&encoded, 0.0);
        assert_eq!(decoded, data);
        assert_eq!(bit_errors, 0);
    }

    #[test]
    fn test_convolutional_roundtrip_noiseless() {
        let mut codec = ConvolutionalCodecHd::new(ErrorCorrectionScheme::ConvR12).unwrap();
        let payload = csp_image(119);
        let encoded = codec.encode(&payload);
        // (bits + 6 flush) doubled, packed
        assert_eq!(encoded.len(), ((payload.len() * 8 + 6) * 2).div_ceil(8));

        let (decoded, bit_errors) = codec.decode(&encoded, 100.0);
        assert_eq!(bit_errors, 0);
        assert!(decoded.len() >= payload.len());
        assert_eq!(&decoded[..payload.len()], payload.as_slice());
    }

    #[test]
    fn test_convolutional_roundtrip_lengths() {
        let mut codec = ConvolutionalCodecHd::new(ErrorCorrectionScheme::ConvR12).unwrap();
        for len in [0usize, 1, 2, 3, 7, 8, 58, 59, 119, 133, 1024, 4096] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let encoded = codec.encode(&payload);
            let (decoded, _) = codec.decode(&encoded, 0.0);
            assert!(decoded.len() >= len, "len {}", len);
            assert_eq!(&decoded[..len], payload.as_slice(), "len {}", len);
        }
    }

    #[test]
    fn test_convolutional_corrects_byte_spread_bitflips() {
        // One flipped bit (mask 0x10) in half the encoded bytes, byte
        // positions chosen at random. One error per byte keeps errors at
        // least 8 bit-times apart, which the K=7 code always resolves.
        let mut codec = ConvolutionalCodecHd::new(ErrorCorrectionScheme::ConvR12).unwrap();
        let payload = csp_image(119);
        let encoded = codec.encode(&payload);

        let mut rng = StdRng::seed_from_u64(0x2021_0430);
        let mut corrupted = encoded.clone();
        let mut flipped = std::collections::HashSet::new();
        while flipped.len() < corrupted.len() / 2 {
            let idx = rng.gen_range(0..corrupted.len());
            if flipped.insert(idx) {
                corrupted[idx] ^= 0x10;
            }
        }

        let (decoded, bit_errors) = codec.decode(&corrupted, 10.0);
        assert_eq!(bit_errors, 0);
        assert_eq!(&decoded[..payload.len()], payload.as_slice());
    }

    #[test]
    fn test_snr_estimate_ignored() {
        let mut codec = ConvolutionalCodecHd::new(ErrorCorrectionScheme::ConvR12).unwrap();
        let payload = csp_image(10);
        let encoded = codec.encode(&payload);
        let (a, _) = codec.decode(&encoded, -20.0);
        let (b, _) = codec.decode(&encoded, 60.0);
        assert_eq!(a, b);
    }
}
