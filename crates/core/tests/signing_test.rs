//! Signing helpers against fixtures produced by OpenSSL.
//!
//! - `signer-key.der`: 1024-bit RSA key, PKCS#1 DER
//! - `signer-cert.der`: self-signed certificate for that key
//! - `raw-sig.hex`: `openssl pkeyutl -sign -pkeyopt rsa_padding_mode:pkcs1`
//!   over the ASCII bytes of `RAW_INPUT`

use der::asn1::SetOfVec;
use der::{Decode, Encode};
use quire_core::crypto::signing::{
    self, OID_CONTENT_TYPE, OID_MESSAGE_DIGEST, OID_SIGNING_CERTIFICATE_V2, OID_SIGNING_TIME,
    SignedAttributes, SigningCertificateV2,
};
use quire_core::crypto::{CryptoContext, HashingAlgorithm};
use std::time::{Duration, UNIX_EPOCH};
use x509_cert::attr::Attribute;

const KEY_DER: &[u8] = include_bytes!("fixtures/signer-key.der");
const CERT_DER: &[u8] = include_bytes!("fixtures/signer-cert.der");
const RAW_SIG_HEX: &str = include_str!("fixtures/raw-sig.hex");
const RAW_INPUT: &[u8] = b"quire raw transform";
const CERT_SHA256: &str = "05004cc730e79ff42811a3a6b8eed0cafff83daf4c5d83e826f2cfe92e57b216";

fn first_value<T: for<'a> Decode<'a>>(attr: &Attribute) -> T {
    let value = attr.values.iter().next().unwrap();
    T::from_der(&value.to_der().unwrap()).unwrap()
}

#[test]
fn test_raw_transform_matches_openssl() {
    let key = signing::load_private_key(KEY_DER).unwrap();
    let signature = signing::raw_private_key_transform(RAW_INPUT, &key).unwrap();
    assert_eq!(signature.len(), 128);
    assert_eq!(hex::encode(signature), RAW_SIG_HEX.trim());
}

#[test]
fn test_raw_transform_output_is_modulus_sized() {
    let key = signing::load_private_key(KEY_DER).unwrap();
    for len in 0..=117 {
        let input = vec![0xa5u8; len];
        let signature = signing::raw_private_key_transform(&input, &key).unwrap();
        assert_eq!(signature.len(), 128, "input of {len} bytes");
    }
}

#[test]
fn test_raw_transform_rejects_oversized_input() {
    let key = signing::load_private_key(KEY_DER).unwrap();
    assert!(signing::raw_private_key_transform(&[0u8; 117], &key).is_ok());
    let err = signing::raw_private_key_transform(&[0u8; 118], &key).unwrap_err();
    assert!(matches!(err, quire_core::PdfError::CryptoEngine(_)));
}

#[test]
fn test_export_round_trips_fixtures() {
    let cert = signing::load_certificate(CERT_DER).unwrap();
    assert_eq!(signing::export_certificate(&cert).unwrap(), CERT_DER);

    let key = signing::load_private_key(KEY_DER).unwrap();
    assert_eq!(signing::export_private_key(&key).unwrap().as_slice(), KEY_DER);
}

#[test]
fn test_signing_certificate_for_fixture() {
    let ctx = CryptoContext::default();
    let attr =
        signing::signing_certificate_v2_attribute_for(&ctx, CERT_DER, HashingAlgorithm::Sha256)
            .unwrap();
    assert_eq!(attr.oid, OID_SIGNING_CERTIFICATE_V2);
    let parsed: SigningCertificateV2 = first_value(&attr);
    assert_eq!(parsed.certs.len(), 1);
    assert!(parsed.certs[0].hash_algorithm.is_none());
    assert_eq!(hex::encode(parsed.certs[0].cert_hash.as_bytes()), CERT_SHA256);
}

#[test]
fn test_signing_time_is_utc_time() {
    // 2024-03-01T12:00:00Z
    let attr = signing::signing_time_attribute(UNIX_EPOCH + Duration::from_secs(1_709_294_400))
        .unwrap();
    assert_eq!(attr.oid, OID_SIGNING_TIME);
    let value = attr.values.iter().next().unwrap().to_der().unwrap();
    // UTCTime tag, 13 bytes, "240301120000Z"
    assert_eq!(value, b"\x17\x0d240301120000Z");
}

#[test]
fn test_signed_attributes_der() {
    let ctx = CryptoContext::default();
    let time = UNIX_EPOCH + Duration::from_secs(1_709_294_400);
    let attrs = SignedAttributes::for_content(
        &ctx,
        b"%PDF-1.7 signed byte range",
        CERT_DER,
        HashingAlgorithm::Sha256,
        time,
    )
    .unwrap();
    assert_eq!(attrs.len(), 4);

    let der = attrs.to_der().unwrap();
    assert_eq!(der[0], 0x31, "SET OF");
    let parsed = SetOfVec::<Attribute>::from_der(&der).unwrap();
    assert_eq!(parsed.len(), 4);
    for oid in [
        OID_CONTENT_TYPE,
        OID_MESSAGE_DIGEST,
        OID_SIGNING_TIME,
        OID_SIGNING_CERTIFICATE_V2,
    ] {
        assert!(parsed.iter().any(|attr| attr.oid == oid), "{oid}");
    }

    let digest_attr = attrs.get(&OID_MESSAGE_DIGEST).unwrap();
    let digest: der::asn1::OctetString = first_value(digest_attr);
    assert_eq!(
        digest.as_bytes(),
        ctx.compute_digest(b"%PDF-1.7 signed byte range", HashingAlgorithm::Sha256)
            .unwrap()
    );
}

#[test]
fn test_sign_signed_attributes() {
    let ctx = CryptoContext::default();
    let key = signing::load_private_key(KEY_DER).unwrap();
    let attrs = SignedAttributes::for_content(
        &ctx,
        b"content",
        CERT_DER,
        HashingAlgorithm::Sha512,
        UNIX_EPOCH + Duration::from_secs(1_709_294_400),
    )
    .unwrap();
    let digest = ctx
        .compute_digest(&attrs.to_der().unwrap(), HashingAlgorithm::Sha512)
        .unwrap();
    let signature = signing::raw_private_key_transform(&digest, &key).unwrap();
    assert_eq!(signature.len(), 128);
}

#[test]
fn test_duplicate_attribute_rejected() {
    let mut attrs = SignedAttributes::new();
    attrs.add(signing::message_digest_attribute(&[1; 32]).unwrap()).unwrap();
    let err = attrs
        .add(signing::message_digest_attribute(&[2; 32]).unwrap())
        .unwrap_err();
    assert!(err.is_usage());
}
