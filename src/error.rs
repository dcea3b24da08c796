use thiserror::Error;

/// Errors surfaced by the SM9 scheme layer.
///
/// Decoding problems ([`Error::Der`], [`Error::InvalidPoint`],
/// [`Error::InvalidScalar`]) are kept distinct from a well-formed signature
/// that fails to verify ([`Error::BadSignature`]). Decryption reports a
/// single opaque [`Error::DecryptFailed`] regardless of which internal check
/// rejected the ciphertext.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed DER: bad tag, bad length, trailing bytes, unsupported
    /// EnType, or a primitive of the wrong size.
    #[error("der: {0}")]
    Der(#[from] sec1::der::Error),
    /// Malformed PEM framing (bad label, bad base64, truncated data).
    #[error("pem: {0}")]
    Pem(String),
    /// Byte string does not decode to a point on the curve.
    #[error("point not on curve or not decodable")]
    InvalidPoint,
    /// Scalar outside [1, n-1].
    #[error("scalar out of range")]
    InvalidScalar,
    /// Plaintext longer than [`SM9_MAX_PLAINTEXT_SIZE`](crate::SM9_MAX_PLAINTEXT_SIZE).
    #[error("plaintext too long")]
    PlaintextTooLong,
    /// Requested key length is zero.
    #[error("requested key length is zero")]
    InvalidKeyLength,
    /// The scalar sampler failed to produce an ephemeral value.
    #[error("random scalar sampling failed")]
    Randomness,
    /// The signature is well-formed but does not verify for this
    /// identity and message.
    #[error("signature mismatch")]
    BadSignature,
    /// Decryption failed.
    #[error("decrypt failed")]
    DecryptFailed,
    /// H1(ID || hid) + k is not invertible, or the identity hash failed.
    #[error("identity not usable with this master key")]
    InvalidIdentity,
    /// The derived key is the all-zero string and no retry is possible.
    #[error("derived key is all zero")]
    ZeroSharedKey,
    /// Key bytes do not decode to a group element of the expected form.
    #[error("malformed key encoding")]
    InvalidKey,
    /// Key-exchange step called out of order or for the wrong role.
    #[error("exchange step out of order")]
    NotReady,
    /// Key-confirmation tag received from the peer does not match.
    #[error("key confirmation tag mismatch")]
    ConfirmationMismatch,
}

impl From<pem_rfc7468::Error> for Error {
    fn from(e: pem_rfc7468::Error) -> Self {
        Error::Pem(e.to_string())
    }
}
