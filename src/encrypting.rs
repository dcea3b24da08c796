//! Public key encryption over the KEM: XOR keystream plus HMAC-SM3 tag.
//!
//! SM9 identity-based cryptographic algorithms
//! Part 4: Key encapsulation mechanism and public key encryption algorithm
//! 7.1 Encryption algorithm / 7.2 Decryption algorithm

use hmac::Mac;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::{
    Ciphertext, Error, HmacSm3, MasterPublicKey, RngSampler, ScalarSampler, UserPrivateKey,
    SM9_MAX_PLAINTEXT_SIZE,
};

impl MasterPublicKey {
    /// Encrypt `m` to the holder of `user_id`'s encryption private key:
    /// steps A1-A8 of GM/T 0044.4 §7.1.1. Emits the DER SM9Cipher envelope.
    ///
    /// The KEM supplies |m| + 32 bytes: the first |m| are the keystream,
    /// the last 32 key the tag.
    pub fn encrypt_with<S: ScalarSampler + ?Sized>(
        &self,
        sampler: &mut S,
        user_id: &[u8],
        m: &[u8],
    ) -> Result<Vec<u8>, Error> {
        if m.len() > SM9_MAX_PLAINTEXT_SIZE {
            return Err(Error::PlaintextTooLong);
        }
        // A1-A6(1): K1 || K2 and C1 from the KEM
        let (k, c1) = self.kem_encapsulate(sampler, user_id, m.len() + 32)?;
        // A6(2): C2 = M xor K1
        let c2: Vec<u8> = m.iter().zip(k.iter()).map(|(b, x)| b ^ x).collect();
        // A7: C3 = MAC(K2, C2)
        let mut mac = HmacSm3::new_from_slice(&k[m.len()..]).expect("HMAC can take key of any size");
        mac.update(&c2);
        let mut c3 = [0u8; 32];
        c3.copy_from_slice(&mac.finalize().into_bytes());
        // A8: output the envelope (EnType, C1, C3, C2)
        Ciphertext::new(c1, c3, c2).to_der()
    }

    /// [`encrypt_with`](Self::encrypt_with) using the thread rng.
    pub fn encrypt(&self, user_id: &[u8], m: &[u8]) -> Result<Vec<u8>, Error> {
        self.encrypt_with(&mut RngSampler(rand::rng()), user_id, m)
    }
}

impl UserPrivateKey {
    /// Decrypt a DER SM9Cipher envelope: steps B1-B5 of GM/T 0044.4 §7.2.1.
    ///
    /// Envelope parse errors are reported as such; once the ciphertext is
    /// well-formed, every failure is the opaque [`Error::DecryptFailed`].
    pub fn decrypt(&self, user_id: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
        // B1: parse the envelope; C1 is validated against the curve here and
        // |C2| is capped by the decoder
        let envelope = Ciphertext::from_der(ciphertext)?;
        let c2 = envelope.c2();
        // B2/B3(1): K1 || K2 from the KEM, klen = |C2| + 32
        let k = self
            .kem_decapsulate(user_id, &envelope.c1(), c2.len() + 32)
            .map_err(|_| Error::DecryptFailed)?;
        // B4: u = MAC(K2, C2), compared with C3 in constant time
        let mut mac = HmacSm3::new_from_slice(&k[c2.len()..]).expect("HMAC can take key of any size");
        mac.update(c2);
        let tag = mac.finalize().into_bytes();
        if !bool::from(tag.as_slice().ct_eq(envelope.c3())) {
            return Err(Error::DecryptFailed);
        }
        // B3(2)/B5: M = C2 xor K1
        let m = c2.iter().zip(k.iter()).map(|(b, x)| b ^ x).collect();
        Ok(Zeroizing::new(m))
    }
}
