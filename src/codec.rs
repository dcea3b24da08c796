//! DER envelopes of the signature and ciphertext wire formats.
//!
//! ```text
//! SM9Signature ::= SEQUENCE {
//!     h   OCTET STRING,  -- 32 bytes
//!     S   BIT STRING,    -- uncompressed octets of an ECPoint
//! }
//! SM9Cipher ::= SEQUENCE {
//!     EnType      INTEGER,      -- 0 for XOR
//!     C1          BIT STRING,   -- uncompressed octets of an ECPoint
//!     C3          OCTET STRING, -- 32 bytes HMAC-SM3 tag
//!     CipherText  OCTET STRING,
//! }
//! ```
//!
//! Both decoders are strict: wrong primitive sizes, an unsupported EnType,
//! trailing bytes inside or after the SEQUENCE, and points that do not lie
//! on the curve are all rejected.

use sec1::der::{
    self,
    asn1::{BitStringRef, OctetStringRef},
    Decode, DecodeValue, Encode, EncodeValue, Header, Length, Reader, Sequence, Tag, Writer,
};
use sm9_core::{Fr, G1};

use crate::{Error, SM9_MAX_PLAINTEXT_SIZE};

/// SM9 digital signature (h, S) with h in [1, n-1] and S on E(Fp).
///
/// The type can only be built from values that already satisfy both range
/// checks, whether it comes from the signing algorithm or from
/// [`Signature::from_der`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Signature {
    h: Fr,
    s: G1,
}

impl Signature {
    pub(crate) fn new(h: Fr, s: G1) -> Self {
        Self { h, s }
    }

    /// The scalar component h.
    pub fn h(&self) -> Fr {
        self.h
    }

    /// The point component S.
    pub fn s(&self) -> G1 {
        self.s
    }

    /// Serialize to the DER SM9Signature envelope.
    pub fn to_der(&self) -> Result<Vec<u8>, Error> {
        Ok(Encode::to_der(self)?)
    }

    /// Strict parse of the DER SM9Signature envelope.
    pub fn from_der(bytes: &[u8]) -> Result<Self, Error> {
        Ok(<Self as Decode>::from_der(bytes)?)
    }
}

impl<'a> DecodeValue<'a> for Signature {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        reader.read_nested(header.length, |reader| {
            let h = OctetStringRef::decode(reader)?.as_bytes();
            if h.len() != 32 {
                return Err(Tag::OctetString.length_error());
            }
            let s_bits = BitStringRef::decode(reader)?;
            if s_bits.unused_bits() != 0 {
                return Err(Tag::BitString.value_error());
            }
            let s = s_bits.raw_bytes();
            if s.len() != 65 {
                return Err(Tag::BitString.length_error());
            }
            // B1: h in [1, n-1]
            let h = Fr::from_slice(h).ok_or_else(|| Tag::OctetString.value_error())?;
            if h.is_zero() {
                return Err(Tag::OctetString.value_error());
            }
            // B2: S on the curve
            let s = G1::from_uncompressed(s).map_err(|_| Tag::BitString.value_error())?;
            Ok(Signature { h, s })
        })
    }
}

impl EncodeValue for Signature {
    fn value_len(&self) -> der::Result<Length> {
        let hbuf = self.h.to_slice();
        let sbuf = self.s.to_uncompressed();
        OctetStringRef::new(hbuf.as_ref())?.encoded_len()?
            + BitStringRef::from_bytes(sbuf.as_ref())?.encoded_len()?
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        let hbuf = self.h.to_slice();
        let sbuf = self.s.to_uncompressed();
        OctetStringRef::new(hbuf.as_ref())?.encode(writer)?;
        BitStringRef::from_bytes(sbuf.as_ref())?.encode(writer)?;
        Ok(())
    }
}

impl<'a> Sequence<'a> for Signature {}

/// Symmetric mode carried in the SM9Cipher envelope.
///
/// Only [`EnType::Xor`] is ever produced or accepted today; the remaining
/// variants reserve the constant values of GM/T 0044.4 for block-cipher
/// envelopes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum EnType {
    /// XOR keystream, the mode of GM/T 0044.4 §7.
    Xor = 0,
    /// SM4-ECB (reserved).
    Ecb = 1,
    /// SM4-CBC (reserved).
    Cbc = 2,
    /// SM4-OFB (reserved).
    Ofb = 4,
    /// SM4-CFB (reserved).
    Cfb = 8,
}

/// SM9 ciphertext envelope (EnType, C1, C3, C2).
#[derive(Clone, Debug, PartialEq)]
pub struct Ciphertext {
    en_type: EnType,
    c1: G1,
    c3: [u8; 32],
    c2: Vec<u8>,
}

impl Ciphertext {
    /// Assemble an XOR-mode envelope.
    pub fn new(c1: G1, c3: [u8; 32], c2: Vec<u8>) -> Self {
        Self {
            en_type: EnType::Xor,
            c1,
            c3,
            c2,
        }
    }

    /// The symmetric mode tag.
    pub fn en_type(&self) -> EnType {
        self.en_type
    }

    /// The KEM point C1.
    pub fn c1(&self) -> G1 {
        self.c1
    }

    /// The 32-byte HMAC-SM3 tag C3.
    pub fn c3(&self) -> &[u8; 32] {
        &self.c3
    }

    /// The masked payload C2; same length as the plaintext.
    pub fn c2(&self) -> &[u8] {
        &self.c2
    }

    /// Serialize to the DER SM9Cipher envelope.
    pub fn to_der(&self) -> Result<Vec<u8>, Error> {
        Ok(Encode::to_der(self)?)
    }

    /// Strict parse of the DER SM9Cipher envelope.
    pub fn from_der(bytes: &[u8]) -> Result<Self, Error> {
        Ok(<Self as Decode>::from_der(bytes)?)
    }
}

impl<'a> DecodeValue<'a> for Ciphertext {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        reader.read_nested(header.length, |reader| {
            let en_type = match u8::decode(reader)? {
                0 => EnType::Xor,
                _ => return Err(Tag::Integer.value_error()),
            };
            let c1_bits = BitStringRef::decode(reader)?;
            if c1_bits.unused_bits() != 0 {
                return Err(Tag::BitString.value_error());
            }
            let c1 = c1_bits.raw_bytes();
            if c1.len() != 65 {
                return Err(Tag::BitString.length_error());
            }
            let c3 = OctetStringRef::decode(reader)?.as_bytes();
            if c3.len() != 32 {
                return Err(Tag::OctetString.length_error());
            }
            let c2 = OctetStringRef::decode(reader)?.as_bytes();
            if c2.len() > SM9_MAX_PLAINTEXT_SIZE {
                return Err(Tag::OctetString.length_error());
            }
            let c1 = G1::from_uncompressed(c1).map_err(|_| Tag::BitString.value_error())?;
            let mut tag = [0u8; 32];
            tag.copy_from_slice(c3);
            Ok(Ciphertext {
                en_type,
                c1,
                c3: tag,
                c2: c2.to_vec(),
            })
        })
    }
}

impl EncodeValue for Ciphertext {
    fn value_len(&self) -> der::Result<Length> {
        let cbuf = self.c1.to_uncompressed();
        let a = (self.en_type as u8).encoded_len()?;
        let b = BitStringRef::from_bytes(cbuf.as_ref())?.encoded_len()?;
        let c = OctetStringRef::new(&self.c3)?.encoded_len()?;
        let d = OctetStringRef::new(&self.c2)?.encoded_len()?;
        ((a + b)? + c)? + d
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        let cbuf = self.c1.to_uncompressed();
        (self.en_type as u8).encode(writer)?;
        BitStringRef::from_bytes(cbuf.as_ref())?.encode(writer)?;
        OctetStringRef::new(&self.c3)?.encode(writer)?;
        OctetStringRef::new(&self.c2)?.encode(writer)?;
        Ok(())
    }
}

impl<'a> Sequence<'a> for Ciphertext {}

#[cfg(test)]
mod tests {
    use super::*;

    // A SEQUENCE whose h field has the wrong size must not reach the
    // group decoder.
    #[test]
    fn test_signature_short_h_rejected() {
        let mut der = Vec::new();
        // SEQUENCE { OCTET STRING (31), BIT STRING (65, 0 unused) }
        der.extend_from_slice(&[0x30, 0x65, 0x04, 0x1F]);
        der.extend_from_slice(&[0xAA; 31]);
        der.extend_from_slice(&[0x03, 0x42, 0x00]);
        der.extend_from_slice(&[0x04; 65]);
        assert!(Signature::from_der(&der).is_err());
    }

    #[test]
    fn test_ciphertext_bad_en_type_rejected() {
        let mut der = Vec::new();
        // SEQUENCE { INTEGER 1, ... } stops at the EnType check.
        der.extend_from_slice(&[0x30, 0x03, 0x02, 0x01, 0x01]);
        assert!(Ciphertext::from_der(&der).is_err());
    }
}
