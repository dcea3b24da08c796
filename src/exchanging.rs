//! Authenticated key exchange.
//!
//! SM9 identity-based cryptographic algorithms
//! Part 3: Key exchange protocol
//! 6.2 Key exchange process
//!
//! Two-round protocol between an initiator A and a responder B, each holding
//! a key-exchange private key extracted with hid 0x02:
//!
//! ```text
//! A: RA = rA * (H1(ID_B || hid, N) * P1 + Ppub-e)   --- RA -->  B
//! B: RB = rB * (H1(ID_A || hid, N) * P1 + Ppub-e)   <-- RB ---  A
//! ```
//!
//! after which both sides derive the same key from
//! KDF(ID_A || ID_B || RA || RB || g1 || g2 || g3, klen) and may exchange
//! the optional confirmation tags SB (0x82, B to A) and SA (0x83, A to B).

use generic_array::{typenum, ArrayLength, GenericArray};
use sm3::{Digest, Sm3};
use sm9_core::{fast_pairing, Fr, Group, Gt, G1, G2};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use crate::{Error, MasterPublicKey, ScalarSampler, Sm9, UserPrivateKey, SM9_HID_EXCH};

/// Fixed-size secret bytes, erased on drop.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Secret<N: ArrayLength>(GenericArray<u8, N>);

impl<N: ArrayLength> Zeroize for Secret<N> {
    fn zeroize(&mut self) {
        self.0.as_mut_slice().zeroize();
    }
}

// Zero the secret on drop
impl<N: ArrayLength> Drop for Secret<N> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl<N: ArrayLength> Secret<N> {
    /// Constructs a new `Secret` by wrapping the given bytes.
    pub fn new(bytes: GenericArray<u8, N>) -> Self {
        Secret(bytes)
    }
    /// Converts a slice to a `Secret` with inferred length.
    /// Panics if the slice length does not match.
    pub fn from_slice(slice: &[u8]) -> Self {
        Secret(GenericArray::<u8, N>::from_slice(slice).clone())
    }
    /// Extracts a slice containing the entire array.
    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }
}

/// Ephemeral point RA / RB as its 64-byte X || Y form.
pub type EphemeralKey = Secret<typenum::U64>;

/// Key-confirmation tag SA / SB.
pub type ConfirmationTag = Secret<typenum::U32>;

/// The agreed key of the length negotiated at construction.
pub type SharedKey = Zeroizing<Vec<u8>>;

fn gt_bytes(g: &Gt) -> Zeroizing<[u8; 384]> {
    let mut b = Zeroizing::new([0u8; 384]);
    b.copy_from_slice(g.to_slice().as_ref());
    b
}

/// One side of the key exchange.
///
/// An initiator runs [`initiate`](KeyExchanger::initiate) then
/// [`finalize`](KeyExchanger::finalize); a responder runs
/// [`respond`](KeyExchanger::respond). Either side may then emit and check
/// the confirmation tags.
#[derive(Clone)]
pub struct KeyExchanger {
    public_key: MasterPublicKey,
    user_key: UserPrivateKey,
    user_id: Vec<u8>,
    peer_id: Vec<u8>,
    klen: usize,
    is_initiator: bool,
    r: Option<Fr>,
    ra: EphemeralKey,
    rb: EphemeralKey,
    sa_tag: Option<ConfirmationTag>,
    sb_tag: Option<ConfirmationTag>,
}

impl KeyExchanger {
    /// Create one side of the exchange.
    ///
    /// `user_key` must be the key-exchange private key of `user_id`; `klen`
    /// is the byte length of the key to agree on.
    pub fn new(
        user_id: &[u8],
        user_key: &UserPrivateKey,
        public_key: &MasterPublicKey,
        peer_id: &[u8],
        klen: usize,
        is_initiator: bool,
    ) -> Result<Self, Error> {
        if !public_key.is_ok() || !user_key.is_ok() || user_id.is_empty() || peer_id.is_empty() {
            return Err(Error::InvalidKey);
        }
        if klen == 0 {
            return Err(Error::InvalidKeyLength);
        }
        Ok(Self {
            public_key: public_key.clone(),
            user_key: user_key.clone(),
            user_id: user_id.to_vec(),
            peer_id: peer_id.to_vec(),
            klen,
            is_initiator,
            r: None,
            ra: EphemeralKey::default(),
            rb: EphemeralKey::default(),
            sa_tag: None,
            sb_tag: None,
        })
    }

    // Q = H1(ID || hid, N) * P1 + Ppub-e for the given identity.
    fn peer_point(&self) -> Result<G1, Error> {
        let h1 = Sm9::hash_1(&self.peer_id, SM9_HID_EXCH).ok_or(Error::InvalidIdentity)?;
        let pube = self.public_key.to_g1().ok_or(Error::InvalidKey)?;
        Ok(G1::one() * h1 + pube)
    }

    /// Steps A1-A4: compute RA toward the responder. Initiator only.
    ///
    /// RA goes to the peer; rA is retained for [`finalize`](Self::finalize).
    pub fn initiate<S: ScalarSampler + ?Sized>(
        &mut self,
        sampler: &mut S,
    ) -> Result<EphemeralKey, Error> {
        if !self.is_initiator {
            return Err(Error::NotReady);
        }
        // A1: Q_B = H1(ID_B || hid, N) * P1 + Ppub-e
        let q = self.peer_point()?;
        // A2: rand rA in [1, n-1]
        let r = sampler.sample()?;
        // A3: RA = rA * Q_B
        let ra = r * q;
        self.r = Some(r);
        self.ra = EphemeralKey::from_slice(ra.to_slice().as_ref());
        // A4: output RA, keep rA
        Ok(self.ra.clone())
    }

    /// Steps B1-B7: consume RA, compute RB and the agreed key. Responder
    /// only.
    ///
    /// rB is resampled while the derived key is all zero, so the returned
    /// key is never the zero string.
    pub fn respond<S: ScalarSampler + ?Sized>(
        &mut self,
        sampler: &mut S,
        ra: &EphemeralKey,
    ) -> Result<(EphemeralKey, SharedKey), Error> {
        if self.is_initiator {
            return Err(Error::NotReady);
        }
        // B1: Q_A = H1(ID_A || hid, N) * P1 + Ppub-e
        let q = self.peer_point()?;
        // B4(check): RA must satisfy the curve equation
        let ra_point = G1::from_slice(ra.as_slice()).map_err(|_| Error::InvalidPoint)?;
        let de = self.user_key.to_g2().ok_or(Error::InvalidKey)?;
        let pube = self.public_key.to_g1().ok_or(Error::InvalidKey)?;
        // B4: G1 = e(RA, de_B); fixed across rB retries
        let g1 = fast_pairing(ra_point, de);
        let g1_buf = gt_bytes(&g1);
        let g_base = fast_pairing(pube, G2::one());

        loop {
            // B2: rand rB in [1, n-1]
            let rb = sampler.sample()?;
            // B3: RB = rB * Q_A
            let rb_point = rb * q;
            // B4: G2 = e(Ppub-e, P2)^rB, G3 = G1^rB
            let g2_buf = gt_bytes(&g_base.pow(rb));
            let g3_buf = gt_bytes(&g1.pow(rb));
            let rb_bytes = rb_point.to_slice();
            // B5: SK = KDF(ID_A || ID_B || RA || RB || g1 || g2 || g3, klen);
            // if SK = 0, go to B2
            let sk = self.derive_key(
                ra.as_slice(),
                rb_bytes.as_ref(),
                g1_buf.as_slice(),
                g2_buf.as_slice(),
                g3_buf.as_slice(),
            )?;
            if sk.iter().all(|&b| b == 0) {
                continue;
            }
            self.ra = ra.clone();
            self.rb = EphemeralKey::from_slice(rb_bytes.as_ref());
            // B6: confirmation tags over (g1, g2, g3)
            self.compute_tags(g1_buf.as_slice(), g2_buf.as_slice(), g3_buf.as_slice());
            // B7: output RB and SK
            return Ok((self.rb.clone(), sk));
        }
    }

    /// Steps A5-A8: consume RB, compute the agreed key. Initiator only,
    /// after [`initiate`](Self::initiate).
    ///
    /// RB is fixed by the peer, so an all-zero derived key cannot be
    /// retried here and surfaces as [`Error::ZeroSharedKey`].
    pub fn finalize(&mut self, rb: &EphemeralKey) -> Result<SharedKey, Error> {
        if !self.is_initiator {
            return Err(Error::NotReady);
        }
        let r = self.r.ok_or(Error::NotReady)?;
        // A5(check): RB must satisfy the curve equation
        let rb_point = G1::from_slice(rb.as_slice()).map_err(|_| Error::InvalidPoint)?;
        let de = self.user_key.to_g2().ok_or(Error::InvalidKey)?;
        let pube = self.public_key.to_g1().ok_or(Error::InvalidKey)?;
        // A5: G1 = e(Ppub-e, P2)^rA, G2 = e(RB, de_A), G3 = G2^rA
        let g1_buf = gt_bytes(&fast_pairing(pube, G2::one()).pow(r));
        let g2 = fast_pairing(rb_point, de);
        let g2_buf = gt_bytes(&g2);
        let g3_buf = gt_bytes(&g2.pow(r));
        self.r = None;
        self.rb = rb.clone();
        // A7: SK = KDF(ID_A || ID_B || RA || RB || g1 || g2 || g3, klen)
        let ra_bytes = self.ra.clone();
        let sk = self.derive_key(ra_bytes.as_slice(), rb.as_slice(), g1_buf.as_slice(), g2_buf.as_slice(), g3_buf.as_slice())?;
        if sk.iter().all(|&b| b == 0) {
            return Err(Error::ZeroSharedKey);
        }
        // A6/A8: confirmation tags over (g1, g2, g3)
        self.compute_tags(g1_buf.as_slice(), g2_buf.as_slice(), g3_buf.as_slice());
        Ok(sk)
    }

    // (ID_A, ID_B) in protocol order for this side's role.
    fn ordered_ids(&self) -> (&[u8], &[u8]) {
        if self.is_initiator {
            (&self.user_id, &self.peer_id)
        } else {
            (&self.peer_id, &self.user_id)
        }
    }

    fn derive_key(
        &self,
        ra: &[u8],
        rb: &[u8],
        g1: &[u8],
        g2: &[u8],
        g3: &[u8],
    ) -> Result<SharedKey, Error> {
        let (id_a, id_b) = self.ordered_ids();
        let mut z = Zeroizing::new(Vec::with_capacity(
            id_a.len() + id_b.len() + 128 + 3 * 384,
        ));
        z.extend_from_slice(id_a);
        z.extend_from_slice(id_b);
        z.extend_from_slice(ra);
        z.extend_from_slice(rb);
        z.extend_from_slice(g1);
        z.extend_from_slice(g2);
        z.extend_from_slice(g3);
        Sm9::kdf(&z, self.klen).ok_or(Error::InvalidKeyLength)
    }

    // SB = Hv(0x82 || g1 || Hv(g2 || g3 || ID_A || ID_B || RA || RB))
    // SA = Hv(0x83 || g1 || Hv(g2 || g3 || ID_A || ID_B || RA || RB))
    fn compute_tags(&mut self, g1: &[u8], g2: &[u8], g3: &[u8]) {
        let (id_a, id_b) = self.ordered_ids();
        let mut sm3 = Sm3::new();
        sm3.update(g2);
        sm3.update(g3);
        sm3.update(id_a);
        sm3.update(id_b);
        sm3.update(self.ra.as_slice());
        sm3.update(self.rb.as_slice());
        let inner = sm3.finalize();

        let mut sm3 = Sm3::new();
        sm3.update([0x82u8]);
        sm3.update(g1);
        sm3.update(&inner);
        self.sb_tag = Some(ConfirmationTag::from_slice(&sm3.finalize()));

        let mut sm3 = Sm3::new();
        sm3.update([0x83u8]);
        sm3.update(g1);
        sm3.update(&inner);
        self.sa_tag = Some(ConfirmationTag::from_slice(&sm3.finalize()));
    }

    /// The tag this side sends: SB from the responder, SA from the
    /// initiator. Available once the key has been derived.
    pub fn confirmation_tag(&self) -> Result<ConfirmationTag, Error> {
        let tag = if self.is_initiator {
            &self.sa_tag
        } else {
            &self.sb_tag
        };
        tag.clone().ok_or(Error::NotReady)
    }

    /// Check the tag received from the peer, in constant time.
    pub fn confirm(&self, tag: &ConfirmationTag) -> Result<(), Error> {
        let expected = if self.is_initiator {
            &self.sb_tag
        } else {
            &self.sa_tag
        };
        let expected = expected.as_ref().ok_or(Error::NotReady)?;
        if bool::from(expected.as_slice().ct_eq(tag.as_slice())) {
            Ok(())
        } else {
            Err(Error::ConfirmationMismatch)
        }
    }
}
