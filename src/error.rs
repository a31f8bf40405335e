//! Error taxonomy shared across the MAC core.
//!
//! Header-level problems are recoverable (the framer drops the frame and
//! keeps going); construction problems (unknown or unusable FEC scheme) are
//! fatal to the operation that raised them.

/// Result type for MAC-layer operations.
pub type MacResult<T> = Result<T, MacError>;

/// Errors that can occur in the MAC framing and FEC core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MacError {
    /// A scheme tag with no mapping (e.g. a corrupt 6-bit field).
    #[error("invalid error correction scheme value: {0}")]
    InvalidScheme(u8),

    /// The scheme is registered but not usable on this link.
    #[error("scheme not usable: {0}")]
    SchemeNotSupported(&'static str),

    /// The scheme is valid but no codec implementation exists for it.
    #[error("no codec implemented: {0}")]
    NotImplemented(&'static str),

    /// Malformed input: wrong frame length, unsupported bits-per-octet tag.
    #[error("bad format: {0}")]
    BadFormat(String),

    /// A Golay codeword of the MAC header reported an uncorrectable error.
    #[error("MAC header uncorrectable")]
    HeaderCorrupt,

    /// The FEC decoder could not produce a codeword estimate.
    ///
    /// Unreachable for the hard-decision convolutional decoder, which always
    /// emits a best-effort sequence; reserved for block codecs.
    #[error("codeword undecodable")]
    CodewordUndecodable,
}
