#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

mod codec;
mod encapsulating;
mod encrypting;
mod error;
mod exchanging;
mod key;
mod signing;
mod verifying;

use hmac::Hmac;
use rand_core::RngCore;
use sm3::{Digest, Sm3};
use zeroize::Zeroizing;

pub use crate::codec::{Ciphertext, EnType, Signature};
pub use crate::error::Error;
pub use crate::exchanging::{ConfirmationTag, EphemeralKey, KeyExchanger, Secret, SharedKey};
pub use crate::key::{
    EncodeKey, MasterPrivateKey, MasterPublicKey, MasterSignaturePublicKey, UserPrivateKey,
    UserSignaturePrivateKey,
};
pub use crate::signing::{SignContext, SigningKey};
pub use crate::verifying::VerifyingKey;
pub use pem_rfc7468::{LineEnding, PemLabel};
pub use sm9_core::{fast_pairing, Fr, Group, Gt, G1, G2};

// Create alias for HMAC-Sm3
pub(crate) type HmacSm3 = Hmac<Sm3>;

/// hid byte of the signature private key family (GM/T 0044.2).
pub const SM9_HID_SIGN: u8 = 0x01;
/// hid byte of the key-exchange private key family (GM/T 0044.3).
pub const SM9_HID_EXCH: u8 = 0x02;
/// hid byte of the encryption private key family (GM/T 0044.4).
pub const SM9_HID_ENC: u8 = 0x03;

/// Domain-separation prefix of the H1 hash.
pub const SM9_HASH1_PREFIX: u8 = 0x01;
/// Domain-separation prefix of the H2 hash.
pub const SM9_HASH2_PREFIX: u8 = 0x02;

/// Ceiling on the plaintext length accepted by encryption and enforced by
/// the ciphertext decoder.
pub const SM9_MAX_PLAINTEXT_SIZE: usize = 255;

/// Source of ephemeral scalars in [1, n-1].
///
/// Wrap any CSPRNG in [`RngSampler`] for production use; a deterministic
/// sampler may be injected to reproduce the worked examples of
/// GM/T 0044 Part 5.
pub trait ScalarSampler {
    /// Produce the next scalar in [1, n-1].
    fn sample(&mut self) -> Result<Fr, Error>;
}

/// [`ScalarSampler`] over any [`RngCore`].
pub struct RngSampler<R: RngCore>(pub R);

// sm9_core::Fr::random is bounded on rand 0.8's `Rng` (rand_core 0.6),
// while this crate's public API uses rand_core 0.9. Bridge the two
// RngCore generations so any 0.9 RNG can feed the 0.8-bounded API.
pub(crate) struct RngCoreBridge<'a, R: RngCore + ?Sized>(pub(crate) &'a mut R);

impl<'a, R: RngCore + ?Sized> rand_core_06::RngCore for RngCoreBridge<'a, R> {
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core_06::Error> {
        self.0.fill_bytes(dest);
        Ok(())
    }
}

impl<R: RngCore> ScalarSampler for RngSampler<R> {
    fn sample(&mut self) -> Result<Fr, Error> {
        // Fr::random is uniform over [0, n); reject zero.
        loop {
            let r = Fr::random(&mut RngCoreBridge(&mut self.0));
            if !r.is_zero() {
                return Ok(r);
            }
        }
    }
}

/// SM9 identity-based cryptographic
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Sm9;

impl Sm9 {
    // SM9 identity-based cryptographic algorithms
    // Part 4: Key encapsulation mechanism and public key encryption algorithm
    // 5.4 Auxiliary functions
    // 5.4.2.2 Cryptographic function H1() : generate h1 in [1, n-1]
    pub fn hash_1(id: &[u8], hid: u8) -> Option<Fr> {
        let mut v = Vec::with_capacity(id.len() + 6);
        v.push(SM9_HASH1_PREFIX);
        v.extend_from_slice(id);
        v.push(hid);
        v.extend_from_slice(&1u32.to_be_bytes());

        let mut ha = [0u8; 64];
        let mut sm3 = Sm3::new();
        sm3.update(&v);
        ha[..32].copy_from_slice(&sm3.finalize());

        // ct++
        let len = v.len();
        v[len - 1] = 2;
        let mut sm3 = Sm3::new();
        sm3.update(&v);
        ha[32..].copy_from_slice(&sm3.finalize());

        Fr::from_hash(&ha[..40])
    }

    // SM9 identity-based cryptographic algorithms
    // Part 3: Key exchange protocol
    // 5.4.3 Key derivation functions
    pub(crate) fn kdf(z: &[u8], mut klen: usize) -> Option<Zeroizing<Vec<u8>>> {
        if klen == 0 {
            return None;
        }
        // Step 1: Initialize a 32-bit counter ct = 0x00000001.
        let mut ct: u32 = 1;
        let mut k = Zeroizing::new(Vec::with_capacity(klen));
        // Step 2: For i = 1 to ceil(klen/v): Ha_i = Hv(Z || ct); ct++
        while klen > 0 {
            let mut sm3 = Sm3::new();
            sm3.update(z);
            sm3.update(ct.to_be_bytes());
            let ha = sm3.finalize();
            // Step 3/4: K = Ha_1 || Ha_2 || ... truncated to klen
            let len = klen.min(32);
            k.extend_from_slice(&ha[..len]);
            klen -= len;
            ct += 1;
        }
        Some(k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_hash1() {
        let id = b"Bob";
        let hid = SM9_HID_ENC;
        let a = Sm9::hash_1(id, hid).unwrap();
        let ex = hex!("9CB1F628 8CE0E510 43CE7234 4582FFC3 01E0A812 A7F5F200 4B85547A 24B82716");
        assert_eq!(a.to_slice().as_ref(), ex);
    }

    #[test]
    fn test_kdf() {
        // SM9 identity-based cryptographic algorithms
        // Part 5: Parameter definition
        // Annex C: Example of key encapsulation mechanism
        let r0 = hex!(
            "1EDEE2C3 F4659144 91DE44CE FB2CB434 AB02C308 D9DC5E20 67B4FED5 AAAC8A0F"
            "1C9B4C43 5ECA35AB 83BB7341 74C0F78F DE81A533 74AFF3B3 602BBC5E 37BE9A4C"
            "8EAB0CD6 D0C95A6B BB7051AC 848FDFB9 689E5E5C 486B1294 557189B3 38B53B1D"
            "78082BB4 0152DC35 AC774442 CC6408FF D68494D9 953D77BF 55E30E84 697F6674"
            "5AAF5223 9E46B037 3B3168BA B75C32E0 48B5FAEB ABFA1F7F 9BA6B4C0 C90E65B0"
            "75F6A2D9 ED54C87C DDD2EAA7 87032320 205E7AC7 D7FEAA86 95AB2BF7 F5710861"
            "247C2034 CCF4A143 2DA1876D 023AD6D7 4FF1678F DA3AF37A 3D9F613C DE805798"
            "8B07151B AC93AF48 D78D86C2 6EA97F24 E2DACC84 104CCE87 91FE90BA 61B2049C"
            "AAC6AB38 EA07F996 6173FD9B BF34AAB5 8EE84CD3 777A9FD0 0BBCA1DC 09CF8696"
            "A1040465 BD723AE5 13C4BE3E F2CFDC08 8A935F0B 207DEED7 AAD5CE2F C37D4203"
            "4D874A4C E9B3B587 65B1252A 0880952B 4FF3C97E A1A4CFDC 67A0A007 2541A03D"
            "3924EABC 443B0503 510B93BB CD98EB70 E0192B82 1D14D69C CB2513A1 A7421EB7"
            "A018A035 E8FB61F2 71DE1C5B 3E781C63 508C113B 3EAC5378 05EAE164 D732FAD0"
            "56BEA27C 8624D506 4C9C278A 193D63F6 908EE558 DF5F5E07 21317FC6 E829C242 426F62"
        );
        let k = hex!("4FF5CF86 D2AD40C8 F4BAC98D 76ABDBDE 0C0E2F0A 829D3F91 1EF5B2BC E0695480");
        let d = Sm9::kdf(&r0, 32).unwrap();
        assert_eq!(k, d.as_slice());
    }

    #[test]
    fn test_kdf_zero_length() {
        assert!(Sm9::kdf(b"z", 0).is_none());
    }

    #[test]
    fn test_kdf_prefix_stability() {
        // A longer request extends, never rewrites, the earlier blocks.
        let d = Sm9::kdf(b"abc", 33).unwrap();
        assert_eq!(d.len(), 33);
        let e = Sm9::kdf(b"abc", 64).unwrap();
        assert_eq!(&d[..33], &e[..33]);
    }
}
