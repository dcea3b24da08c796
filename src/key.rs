//! Key material: master keys, per-identity private keys, and their
//! DER/PEM persistence.
//!
//! SM9 identity-based cryptographic algorithms
//! Part 1: General
//! 6.2 Generation of keys

use rand_core::RngCore;
use sec1::der::{
    self,
    asn1::OctetStringRef,
    pem::{LineEnding, PemLabel},
    Decode, DecodeValue, Document, Encode, EncodeValue, Header, Length, Reader, Sequence, Writer,
};
use sm9_core::{Fr, Group, G1, G2};
use std::path::Path;
use zeroize::Zeroize;

use crate::{Error, Sm9, SM9_HID_ENC, SM9_HID_EXCH, SM9_HID_SIGN};

macro_rules! key_impl {
    ($name:ident) => {
        #[derive(Clone, Debug, Default, Eq, PartialEq)]
        pub struct $name(Vec<u8>);
        impl $name {
            /// Wrap raw key bytes.
            pub fn new(key: &[u8]) -> Self {
                Self(key.to_vec())
            }
            /// The raw key bytes.
            pub fn as_slice(&self) -> &[u8] {
                self.0.as_slice()
            }
        }

        impl EncodeKey for $name {
            fn to_key_der(&self) -> Result<Document, Error> {
                let key = KeyDer::try_from(self.as_slice())?;
                Ok(Document::try_from(&key)?)
            }
            fn from_pem(pem: &str) -> Result<Self, Error> {
                let (label, doc) = Document::from_pem(pem)?;
                Self::validate_pem_label(label.as_ref())?;
                let key: KeyDer<'_> = doc.decode_msg()?;
                Ok(Self::new(key.key))
            }
            fn read_pem_file(path: impl AsRef<Path>) -> Result<Self, Error> {
                let (label, doc) = Document::read_pem_file(path)?;
                Self::validate_pem_label(&label)?;
                let key: KeyDer<'_> = doc.decode_msg()?;
                Ok(Self::new(key.key))
            }
        }
    };
}

/// Inner DER document shared by every key form:
/// `SEQUENCE { version INTEGER (1), key OCTET STRING }`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
struct KeyDer<'a> {
    key: &'a [u8],
}

const VERSION: u8 = 1;

impl<'a> DecodeValue<'a> for KeyDer<'a> {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        reader.read_nested(header.length, |reader| {
            if u8::decode(reader)? != VERSION {
                return Err(der::Tag::Integer.value_error());
            }
            let key = OctetStringRef::decode(reader)?.as_bytes();

            Ok(KeyDer { key })
        })
    }
}

impl EncodeValue for KeyDer<'_> {
    fn value_len(&self) -> der::Result<Length> {
        VERSION.encoded_len()? + OctetStringRef::new(self.key)?.encoded_len()?
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        VERSION.encode(writer)?;
        OctetStringRef::new(self.key)?.encode(writer)?;
        Ok(())
    }
}

impl<'a> Sequence<'a> for KeyDer<'a> {}

impl<'a> TryFrom<&'a [u8]> for KeyDer<'a> {
    type Error = der::Error;

    fn try_from(bytes: &'a [u8]) -> der::Result<KeyDer<'a>> {
        Ok(Self { key: bytes })
    }
}

impl TryFrom<&KeyDer<'_>> for Document {
    type Error = der::Error;

    fn try_from(key: &KeyDer<'_>) -> der::Result<Self> {
        Self::encode_msg(key)
    }
}

/// DER/PEM persistence shared by every key type.
pub trait EncodeKey: PemLabel + Sized {
    /// Write the ASN.1 DER-encoded key to the given path as PEM.
    fn write_pem_file(&self, path: impl AsRef<Path>, line_ending: LineEnding) -> Result<(), Error> {
        let doc = self.to_key_der()?;
        Ok(doc.write_pem_file(path, Self::PEM_LABEL, line_ending)?)
    }
    /// Serialize the key as a PEM string.
    fn to_pem(&self, line_ending: LineEnding) -> Result<String, Error> {
        let doc = self.to_key_der()?;
        Ok(doc.to_pem(Self::PEM_LABEL, line_ending)?)
    }
    /// Serialize a [`Document`] containing the ASN.1 DER-encoded key.
    fn to_key_der(&self) -> Result<Document, Error>;
    /// Parse a key from a PEM string.
    fn from_pem(pem: &str) -> Result<Self, Error>;
    /// Read a key from the given path.
    fn read_pem_file(path: impl AsRef<Path>) -> Result<Self, Error>;
}

// SM9 master private key (the KGC secret); erased on drop.
key_impl!(MasterPrivateKey);
impl PemLabel for MasterPrivateKey {
    const PEM_LABEL: &'static str = "SM9 MASTER PRIVATE KEY";
}

impl Drop for MasterPrivateKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl MasterPrivateKey {
    /// Generate a fresh master secret in [1, n-1].
    pub fn generate<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        loop {
            let k = Fr::random(&mut crate::RngCoreBridge(rng));
            if !k.is_zero() {
                return Self::new(k.to_slice().as_ref());
            }
        }
    }

    fn secret(&self) -> Result<Fr, Error> {
        Fr::from_slice(self.as_slice()).ok_or(Error::InvalidKey)
    }

    /// Master encryption/exchange public key Ppub-e = ke * P1.
    pub fn master_public_key(&self) -> Result<MasterPublicKey, Error> {
        let ke = self.secret()?;
        let pub_e = G1::one() * ke;
        Ok(MasterPublicKey::new(pub_e.to_compressed().as_ref()))
    }

    /// Master signature public key Ppub-s = ks * P2.
    pub fn master_signature_public_key(&self) -> Result<MasterSignaturePublicKey, Error> {
        let ks = self.secret()?;
        let pub_s = G2::one() * ks;
        Ok(MasterSignaturePublicKey::new(pub_s.to_compressed().as_ref()))
    }

    // t2 = k * (H1(ID || hid, N) + k)^-1 mod n.
    // The sum can fail to be invertible for one identity per master key;
    // that identity is rejected.
    fn extraction_exponent(&self, user_id: &[u8], hid: u8) -> Result<Fr, Error> {
        let k = self.secret()?;
        let h1 = Sm9::hash_1(user_id, hid).ok_or(Error::InvalidIdentity)?;
        let t1 = h1 + k;
        let t1_inv = t1.inverse().ok_or(Error::InvalidIdentity)?;
        Ok(k * t1_inv)
    }

    /// Encryption private key of the user: de = t2 * P2 (hid 0x03).
    pub fn user_private_key(&self, user_id: &[u8]) -> Result<UserPrivateKey, Error> {
        let t2 = self.extraction_exponent(user_id, SM9_HID_ENC)?;
        let de = G2::one() * t2;
        Ok(UserPrivateKey::new(de.to_compressed().as_ref()))
    }

    /// Key-exchange private key of the user (hid 0x02); same shape as the
    /// encryption key, different family.
    pub fn user_exchange_key(&self, user_id: &[u8]) -> Result<UserPrivateKey, Error> {
        let t2 = self.extraction_exponent(user_id, SM9_HID_EXCH)?;
        let de = G2::one() * t2;
        Ok(UserPrivateKey::new(de.to_compressed().as_ref()))
    }

    /// Signature private key of the user: ds = t2 * P1 (hid 0x01).
    pub fn user_signature_key(&self, user_id: &[u8]) -> Result<UserSignaturePrivateKey, Error> {
        let t2 = self.extraction_exponent(user_id, SM9_HID_SIGN)?;
        let ds = G1::one() * t2;
        Ok(UserSignaturePrivateKey::new(ds.to_compressed().as_ref()))
    }
}

// SM9 master encryption/exchange public key, a point of G1.
key_impl!(MasterPublicKey);
impl PemLabel for MasterPublicKey {
    const PEM_LABEL: &'static str = "SM9 MASTER PUBLIC KEY";
}

impl MasterPublicKey {
    pub(crate) fn is_ok(&self) -> bool {
        self.to_g1().is_some()
    }
    pub(crate) fn to_g1(&self) -> Option<G1> {
        let b = self.as_slice();
        match b.len() {
            33 => G1::from_compressed(b).ok(),
            64 => G1::from_slice(b).ok(),
            65 => G1::from_uncompressed(b).ok(),
            _ => None,
        }
    }
}

// SM9 encryption/exchange private key of the user, a point of G2.
key_impl!(UserPrivateKey);
impl PemLabel for UserPrivateKey {
    const PEM_LABEL: &'static str = "SM9 USER PRIVATE KEY";
}

impl Drop for UserPrivateKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl UserPrivateKey {
    pub(crate) fn is_ok(&self) -> bool {
        self.to_g2().is_some()
    }
    pub(crate) fn to_g2(&self) -> Option<G2> {
        let b = self.as_slice();
        match b.len() {
            65 => G2::from_compressed(b).ok(),
            128 => G2::from_slice(b).ok(),
            129 => G2::from_uncompressed(b).ok(),
            _ => None,
        }
    }
}

// SM9 master signature public key, a point of G2.
key_impl!(MasterSignaturePublicKey);
impl PemLabel for MasterSignaturePublicKey {
    const PEM_LABEL: &'static str = "SM9 MASTER SIGNATURE PUBLIC KEY";
}

impl MasterSignaturePublicKey {
    pub(crate) fn is_ok(&self) -> bool {
        self.to_g2().is_some()
    }
    pub(crate) fn to_g2(&self) -> Option<G2> {
        let b = self.as_slice();
        match b.len() {
            65 => G2::from_compressed(b).ok(),
            128 => G2::from_slice(b).ok(),
            129 => G2::from_uncompressed(b).ok(),
            _ => None,
        }
    }
}

// SM9 signature private key of the user, a point of G1.
key_impl!(UserSignaturePrivateKey);
impl PemLabel for UserSignaturePrivateKey {
    const PEM_LABEL: &'static str = "SM9 USER SIGNATURE PRIVATE KEY";
}

impl Drop for UserSignaturePrivateKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl UserSignaturePrivateKey {
    pub(crate) fn is_ok(&self) -> bool {
        self.to_g1().is_some()
    }
    pub(crate) fn to_g1(&self) -> Option<G1> {
        let b = self.as_slice();
        match b.len() {
            33 => G1::from_compressed(b).ok(),
            64 => G1::from_slice(b).ok(),
            65 => G1::from_uncompressed(b).ok(),
            _ => None,
        }
    }
}
