//! Signing side of the digital signature algorithm.
//!
//! SM9 identity-based cryptographic algorithms
//! Part 2: Digital signature algorithm
//! 6.1 Digital signature generation algorithm

use sm3::{Digest, Sm3};
use sm9_core::{fast_pairing, Fr, Group, G1};
use zeroize::Zeroize;

use signature::Signer;

use crate::{
    Error, MasterSignaturePublicKey, RngSampler, ScalarSampler, Signature,
    UserSignaturePrivateKey, SM9_HASH2_PREFIX,
};

/// Streaming message context shared by signing and verification.
///
/// Wraps the running SM3 state seeded with the H2 domain prefix; the message
/// is absorbed incrementally and the group element w only enters at
/// finalization.
#[derive(Clone)]
pub struct SignContext {
    sm3: Sm3,
}

impl SignContext {
    pub fn new() -> Self {
        let mut sm3 = Sm3::new();
        sm3.update([SM9_HASH2_PREFIX]);
        Self { sm3 }
    }

    /// Absorb the next chunk of the message.
    pub fn update(&mut self, data: &[u8]) {
        self.sm3.update(data);
    }

    // H2(M || w, N): both counter blocks continue the running state, so the
    // state is copied before the first counter is appended.
    pub(crate) fn finalize_h2(&self, w: &[u8]) -> Option<Fr> {
        let mut ctx = self.sm3.clone();
        ctx.update(w);
        let mut tmp = ctx.clone();

        let mut ha = [0u8; 64];
        ctx.update(1u32.to_be_bytes());
        ha[..32].copy_from_slice(&ctx.finalize());
        tmp.update(2u32.to_be_bytes());
        ha[32..].copy_from_slice(&tmp.finalize());

        let h = Fr::from_hash(&ha[..40]);
        ha.zeroize();
        h
    }
}

impl Default for SignContext {
    fn default() -> Self {
        Self::new()
    }
}

/// SM9 signing key: the user's signature private key paired with the
/// master signature public key.
#[derive(Clone)]
pub struct SigningKey {
    user_private_key: UserSignaturePrivateKey,
    master_public_key: MasterSignaturePublicKey,
}

impl SigningKey {
    /// Create a signing key from a [`UserSignaturePrivateKey`] and the
    /// [`MasterSignaturePublicKey`] it was extracted under.
    pub fn new(
        user_private_key: &UserSignaturePrivateKey,
        master_public_key: &MasterSignaturePublicKey,
    ) -> Option<Self> {
        if user_private_key.is_ok() && master_public_key.is_ok() {
            Some(Self {
                user_private_key: user_private_key.clone(),
                master_public_key: master_public_key.clone(),
            })
        } else {
            None
        }
    }

    /// Sign a streamed message: steps A1-A7 of GM/T 0044.2 §6.1.
    pub fn sign_stream<S: ScalarSampler + ?Sized>(
        &self,
        ctx: &SignContext,
        sampler: &mut S,
    ) -> Result<Signature, Error> {
        let ds = self.user_private_key.to_g1().ok_or(Error::InvalidKey)?;
        let pub_s = self.master_public_key.to_g2().ok_or(Error::InvalidKey)?;
        // A1: g = e(P1, Ppub-s); the base is fixed for every retry below
        let g = fast_pairing(G1::one(), pub_s);

        let (h, l) = loop {
            // A2: rand r in [1, n-1]
            let r = sampler.sample()?;
            // A3: w = g^r
            let w = g.pow(r);
            let mut wbuf = [0u8; 384];
            wbuf.copy_from_slice(w.to_slice().as_ref());
            // A4: h = H2(M || w, N)
            let h = ctx.finalize_h2(&wbuf);
            wbuf.zeroize();
            let h = h.ok_or(Error::InvalidScalar)?;
            // A5: l = (r - h) mod n; if l = 0, go to A2
            let l = r - h;
            if !l.is_zero() {
                break (h, l);
            }
        };
        // A6: S = l * ds
        let s = ds * l;
        // A7: output (h, S)
        Ok(Signature::new(h, s))
    }

    /// One-shot signing to the DER envelope.
    pub fn sign_to_der<S: ScalarSampler + ?Sized>(
        &self,
        msg: &[u8],
        sampler: &mut S,
    ) -> Result<Vec<u8>, Error> {
        let mut ctx = SignContext::new();
        ctx.update(msg);
        self.sign_stream(&ctx, sampler)?.to_der()
    }
}

// `Signer` trait impls
impl Signer<Signature> for SigningKey {
    fn try_sign(&self, msg: &[u8]) -> Result<Signature, signature::Error> {
        let mut ctx = SignContext::new();
        ctx.update(msg);
        self.sign_stream(&ctx, &mut RngSampler(rand::rng()))
            .map_err(|_| signature::Error::new())
    }
}
