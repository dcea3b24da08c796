//! Verification side of the digital signature algorithm.
//!
//! SM9 identity-based cryptographic algorithms
//! Part 2: Digital signature algorithm
//! 7.1 Digital signature verification algorithm

use sm9_core::{fast_pairing, Group, G1, G2};
use zeroize::Zeroize;

use signature::Verifier;

use crate::{Error, MasterSignaturePublicKey, SignContext, Signature, Sm9, SM9_HID_SIGN};

/// SM9 public key used for verifying signatures: the master signature
/// public key bound to the signer's identity.
#[derive(Clone, Debug)]
pub struct VerifyingKey {
    public_key: MasterSignaturePublicKey,
    user_id: Vec<u8>,
}

impl VerifyingKey {
    /// Initialize a [`VerifyingKey`] from a signer's identity and the
    /// master signature public key.
    pub fn new(user_id: &[u8], public_key: &MasterSignaturePublicKey) -> Option<Self> {
        if public_key.is_ok() && !user_id.is_empty() {
            Some(Self {
                public_key: public_key.clone(),
                user_id: user_id.to_vec(),
            })
        } else {
            None
        }
    }

    /// Verify a signature over a streamed message: steps B1-B9 of
    /// GM/T 0044.2 §7.1.
    ///
    /// `Ok(())` means the signature is valid. [`Error::BadSignature`] means
    /// it is well-formed but does not match this identity and message;
    /// every other error marks malformed input.
    pub fn verify_stream(&self, ctx: &SignContext, sig: &Signature) -> Result<(), Error> {
        // B1/B2: h in [1, n-1] and S on the curve hold for every
        // constructible `Signature`; the DER decoder enforces them.
        let pub_s = self.public_key.to_g2().ok_or(Error::InvalidKey)?;
        // B3: g = e(P1, Ppub-s)
        let g = fast_pairing(G1::one(), pub_s);
        // B4: t = g^h
        let t = g.pow(sig.h());
        // B5: h1 = H1(ID || hid, N)
        let h1 = Sm9::hash_1(&self.user_id, SM9_HID_SIGN).ok_or(Error::InvalidIdentity)?;
        // B6: P = h1 * P2 + Ppub-s (full addition, the terms are unrelated)
        let p = G2::one() * h1 + pub_s;
        // B7: u = e(S, P)
        let u = fast_pairing(sig.s(), p);
        // B8: w = u * t
        let w = u * t;
        let mut wbuf = [0u8; 384];
        wbuf.copy_from_slice(w.to_slice().as_ref());
        // B9: h2 = H2(M || w, N); valid iff h2 == h
        let h2 = ctx.finalize_h2(&wbuf);
        wbuf.zeroize();
        if h2.ok_or(Error::InvalidScalar)? == sig.h() {
            Ok(())
        } else {
            Err(Error::BadSignature)
        }
    }

    /// Verify a DER-encoded signature over a streamed message.
    pub fn verify_der(&self, ctx: &SignContext, sig_der: &[u8]) -> Result<(), Error> {
        let sig = Signature::from_der(sig_der)?;
        self.verify_stream(ctx, &sig)
    }
}

// `Verifier` trait impls
impl Verifier<Signature> for VerifyingKey {
    fn verify(&self, msg: &[u8], signature: &Signature) -> Result<(), signature::Error> {
        let mut ctx = SignContext::new();
        ctx.update(msg);
        self.verify_stream(&ctx, signature)
            .map_err(|_| signature::Error::new())
    }
}
