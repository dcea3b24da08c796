//! Key encapsulation mechanism.
//!
//! SM9 identity-based cryptographic algorithms
//! Part 4: Key encapsulation mechanism and public key encryption algorithm
//! 6.1 Key encapsulation algorithm / 6.2 Decapsulation algorithm

use sm9_core::{fast_pairing, Group, G1, G2};
use zeroize::Zeroizing;

use crate::{Error, MasterPublicKey, ScalarSampler, Sm9, UserPrivateKey, SM9_HID_ENC};

impl MasterPublicKey {
    /// Encapsulate a fresh `klen`-byte key to the holder of `user_id`'s
    /// encryption private key: steps A1-A7 of GM/T 0044.4 §6.1.1.
    ///
    /// Returns the key and the point C to transmit.
    pub fn kem_encapsulate<S: ScalarSampler + ?Sized>(
        &self,
        sampler: &mut S,
        user_id: &[u8],
        klen: usize,
    ) -> Result<(Zeroizing<Vec<u8>>, G1), Error> {
        let pube = self.to_g1().ok_or(Error::InvalidKey)?;
        // A1: Q = H1(ID || hid, N) * P1 + Ppub-e
        let h1 = Sm9::hash_1(user_id, SM9_HID_ENC).ok_or(Error::InvalidIdentity)?;
        let q = G1::one() * h1 + pube;
        // A4: g = e(Ppub-e, P2)
        let g = fast_pairing(pube, G2::one());

        loop {
            // A2: rand r in [1, n-1]
            let r = sampler.sample()?;
            // A3: C = r * Q
            let c = r * q;
            // A5: w = g^r
            let w = g.pow(r);
            // A6: K = KDF(X || Y || w || ID, klen); if K = 0, go to A2
            let mut z = Zeroizing::new(Vec::with_capacity(64 + 384 + user_id.len()));
            z.extend_from_slice(c.to_slice().as_ref());
            z.extend_from_slice(w.to_slice().as_ref());
            z.extend_from_slice(user_id);
            let k = Sm9::kdf(&z, klen).ok_or(Error::InvalidKeyLength)?;
            if !k.iter().all(|&b| b == 0) {
                // A7: output (K, C)
                return Ok((k, c));
            }
        }
    }

    /// [`kem_encapsulate`](Self::kem_encapsulate) with the thread rng.
    pub fn encapsulate(
        &self,
        user_id: &[u8],
        klen: usize,
    ) -> Result<(Zeroizing<Vec<u8>>, G1), Error> {
        self.kem_encapsulate(&mut crate::RngSampler(rand::rng()), user_id, klen)
    }
}

impl UserPrivateKey {
    /// Recover the encapsulated key from the point C: steps B1-B4 of
    /// GM/T 0044.4 §6.2.1.
    pub fn kem_decapsulate(
        &self,
        user_id: &[u8],
        c: &G1,
        klen: usize,
    ) -> Result<Zeroizing<Vec<u8>>, Error> {
        let de = self.to_g2().ok_or(Error::InvalidKey)?;
        // B1: C was checked against the curve equation when it was decoded;
        // G1 holds no other points.
        // B2: w = e(C, de)
        let w = fast_pairing(*c, de);
        // B3: K = KDF(X || Y || w || ID, klen)
        let mut z = Zeroizing::new(Vec::with_capacity(64 + 384 + user_id.len()));
        z.extend_from_slice(c.to_slice().as_ref());
        z.extend_from_slice(w.to_slice().as_ref());
        z.extend_from_slice(user_id);
        let k = Sm9::kdf(&z, klen).ok_or(Error::InvalidKeyLength)?;
        if k.iter().all(|&b| b == 0) {
            return Err(Error::ZeroSharedKey);
        }
        // B4: output K
        Ok(k)
    }
}
