//! Known-answer tests for the key schedule and record sealing
//!
//! The RFC 8448 vectors come from the "Simple 1-RTT Handshake" trace. The
//! zero-secret vectors are fixtures computed once with an independent
//! HKDF/AES-GCM implementation.

use sealframe_crypto::{
    ContentType, ProtectorConfig, RecordProtector, TrafficSecret, derive_implicit_iv, derive_key,
    expand_label, nonce_for,
};

fn unhex(s: &str) -> Vec<u8> {
    hex::decode(s.replace(' ', "")).unwrap()
}

#[test]
fn zero_secret_iv_fixture() {
    let iv = expand_label(&[0u8; 32], b"iv", &[], 12).unwrap();
    assert_eq!(hex::encode(iv), "3f22fbb61c1412e692986d64");
}

#[test]
fn zero_secret_key_fixtures() {
    let key16 = derive_key(&[0u8; 32], 16).unwrap();
    assert_eq!(hex::encode(key16), "cbee7571c611039ca327a2e879dfcd45");

    let key32 = derive_key(&[0u8; 32], 32).unwrap();
    assert_eq!(
        hex::encode(key32),
        "0ac208433b007cc53760c8c2eba09c42f1eab3390dd010a894554ee594f0d7c6"
    );
}

#[test]
fn rfc8448_server_handshake_traffic_keys() {
    let secret = unhex(
        "b6 7b 7d 69 0c c1 6c 4e 75 e5 42 13 cb 2d 37 b4 \
         e9 c9 12 bc de d9 10 5d 42 be fd 59 d3 91 ad 38",
    );

    let key = derive_key(&secret, 16).unwrap();
    let iv = derive_implicit_iv(&secret).unwrap();

    assert_eq!(key, unhex("3f ce 51 60 09 c2 17 27 d0 f2 e4 e8 6e e4 03 bc"));
    assert_eq!(iv.to_vec(), unhex("5d 31 3e b2 67 12 76 ee 13 00 0b 30"));
}

#[test]
fn second_record_nonce_fixture() {
    let iv = derive_implicit_iv(&[0u8; 32]).unwrap();
    assert_eq!(hex::encode(nonce_for(&iv, 1)), "3f22fbb61c1412e692986d65");
}

#[test]
fn sealed_record_fixture() {
    let secret = TrafficSecret::new([0u8; 32]);
    let mut writer = RecordProtector::new(secret, ProtectorConfig::default()).unwrap();

    let wire = writer.seal_content(ContentType::ApplicationData, b"hello, world", 0).unwrap();

    assert_eq!(
        hex::encode(&wire),
        "170303001dfd9032c98578e47a766bd50711e7e48b6ce349b35b686b6ea4b872a56d"
    );
}

#[test]
fn sealed_record_fixture_opens() {
    let wire = unhex("170303001dfd9032c98578e47a766bd50711e7e48b6ce349b35b686b6ea4b872a56d");
    let mut header = [0u8; 5];
    header.copy_from_slice(&wire[..5]);

    let secret = TrafficSecret::new([0u8; 32]);
    let mut reader = RecordProtector::new(secret, ProtectorConfig::default()).unwrap();

    let (content_type, content) = reader.open_content(&header, &wire[5..]).unwrap();
    assert_eq!(content_type, ContentType::ApplicationData);
    assert_eq!(content, b"hello, world");
}
