// Key exchange protocol process
// SM9 identity-based cryptographic algorithms
// Part 3: Key exchange protocol
// 6.2 Key exchange process

use hex_literal::hex;
use sm9_ibc::*;

struct FixedScalar(Fr);

impl ScalarSampler for FixedScalar {
    fn sample(&mut self) -> Result<Fr, Error> {
        Ok(self.0)
    }
}

fn master_key() -> MasterPrivateKey {
    MasterPrivateKey::new(&hex!(
        "0002E65B 0762D042 F51F0D23 542B13ED 8CFA2E9A 0E720636 1E013A28 3905E31F"
    ))
}

fn exchangers(klen: usize) -> (KeyExchanger, KeyExchanger) {
    let master = master_key();
    let mpk = master.master_public_key().unwrap();
    let alice_key = master.user_exchange_key(b"Alice").unwrap();
    let bob_key = master.user_exchange_key(b"Bob").unwrap();
    let initiator = KeyExchanger::new(b"Alice", &alice_key, &mpk, b"Bob", klen, true).unwrap();
    let responder = KeyExchanger::new(b"Bob", &bob_key, &mpk, b"Alice", klen, false).unwrap();
    (initiator, responder)
}

#[test]
fn test_key_exchange() {
    let (mut initiator, mut responder) = exchangers(16);

    // A: compute RA, send it to B
    let ra = initiator.initiate(&mut RngSampler(rand::rng())).unwrap();
    // B: compute RB and SK_B, send RB (and optionally SB) to A
    let (rb, sk_b) = responder
        .respond(&mut RngSampler(rand::rng()), &ra)
        .unwrap();
    // A: compute SK_A
    let sk_a = initiator.finalize(&rb).unwrap();

    assert_eq!(sk_a.as_slice(), sk_b.as_slice());
    assert_eq!(sk_a.len(), 16);
    assert!(sk_a.iter().any(|&b| b != 0));

    // optional confirmation, both directions
    let sb = responder.confirmation_tag().unwrap();
    assert!(initiator.confirm(&sb).is_ok());
    let sa = initiator.confirmation_tag().unwrap();
    assert!(responder.confirm(&sa).is_ok());
}

#[test]
fn test_key_exchange_deterministic() {
    let ra_scalar = hex!("00005879 DD1D51E1 75946F23 B1B41E93 BA31C584 AE59A426 EC1046A4 D03B06C8");
    let rb_scalar = hex!("00018B98 C44BEF9F 8537FB7D 071B2C92 8B3BC65B D3D69E1E EE213564 905634FE");

    let run = || {
        let (mut initiator, mut responder) = exchangers(16);
        let ra = initiator
            .initiate(&mut FixedScalar(Fr::from_slice(&ra_scalar).unwrap()))
            .unwrap();
        let (rb, sk_b) = responder
            .respond(&mut FixedScalar(Fr::from_slice(&rb_scalar).unwrap()), &ra)
            .unwrap();
        let sk_a = initiator.finalize(&rb).unwrap();
        assert_eq!(sk_a.as_slice(), sk_b.as_slice());
        sk_a.to_vec()
    };

    assert_eq!(run(), run());
}

#[test]
fn test_reject_off_curve_points() {
    let (mut initiator, mut responder) = exchangers(16);

    let garbage = EphemeralKey::from_slice(&[0xFF; 64]);
    assert!(matches!(
        responder.respond(&mut RngSampler(rand::rng()), &garbage),
        Err(Error::InvalidPoint)
    ));

    initiator.initiate(&mut RngSampler(rand::rng())).unwrap();
    assert!(matches!(
        initiator.finalize(&garbage),
        Err(Error::InvalidPoint)
    ));
}

#[test]
fn test_role_and_order_misuse() {
    let (mut initiator, mut responder) = exchangers(16);

    let ra = EphemeralKey::default();
    assert!(matches!(
        initiator.respond(&mut RngSampler(rand::rng()), &ra),
        Err(Error::NotReady)
    ));
    assert!(matches!(
        responder.initiate(&mut RngSampler(rand::rng())),
        Err(Error::NotReady)
    ));
    // finalize before initiate
    assert!(matches!(
        initiator.finalize(&EphemeralKey::default()),
        Err(Error::NotReady)
    ));
    // no tag before the key is derived
    assert!(matches!(
        initiator.confirmation_tag(),
        Err(Error::NotReady)
    ));
}

#[test]
fn test_confirmation_mismatch() {
    let (mut initiator, mut responder) = exchangers(16);

    let ra = initiator.initiate(&mut RngSampler(rand::rng())).unwrap();
    let (rb, _) = responder
        .respond(&mut RngSampler(rand::rng()), &ra)
        .unwrap();
    initiator.finalize(&rb).unwrap();

    let sb = responder.confirmation_tag().unwrap();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(sb.as_slice());
    bytes[0] ^= 0x01;
    let forged = ConfirmationTag::from_slice(&bytes);
    assert!(matches!(
        initiator.confirm(&forged),
        Err(Error::ConfirmationMismatch)
    ));
}

#[test]
fn test_zero_klen_rejected() {
    let master = master_key();
    let mpk = master.master_public_key().unwrap();
    let alice_key = master.user_exchange_key(b"Alice").unwrap();
    assert!(matches!(
        KeyExchanger::new(b"Alice", &alice_key, &mpk, b"Bob", 0, true),
        Err(Error::InvalidKeyLength)
    ));
}
