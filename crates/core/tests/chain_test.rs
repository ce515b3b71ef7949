//! FilterChain ordering, progressive use and failure propagation.

use quire_core::codec::ascii85::ascii85decode;
use quire_core::codec::{AsciiHexCodec, CryptCodec, FlateCodec, RunLengthCodec};
use quire_core::crypto::{CipherKind, CryptoContext};
use quire_core::filter::{DecodeParms, FilterChain, FilterKind, FilterState};
use std::sync::Arc;

#[test]
fn test_encode_applies_stages_in_declared_order() {
    let mut chain: FilterChain =
        FilterChain::from_kinds(&[FilterKind::RunLength, FilterKind::Ascii85]).unwrap();
    let encoded = chain.encode(b"aaaaaaaa").unwrap();
    // Outermost layer is ASCII85, wrapping the RunLength records.
    assert!(encoded.ends_with(b"~>"));
    assert_eq!(ascii85decode(&encoded).unwrap(), b"\xf9a\x80");
    assert_eq!(chain.decode(&encoded).unwrap(), b"aaaaaaaa");
}

#[test]
fn test_pdf_filter_array() {
    // /Filter [/ASCIIHexDecode /FlateDecode]
    let mut writer: FilterChain = FilterChain::new();
    writer.push(FlateCodec::new()).push(AsciiHexCodec::new());
    let encoded = writer.encode(b"stream body").unwrap();
    assert!(encoded.iter().all(|b| b.is_ascii_hexdigit() || *b == b'>'));

    let mut reader: FilterChain =
        FilterChain::from_decode_order([("AHx", None), ("FlateDecode", None)]).unwrap();
    assert_eq!(reader.decode(&encoded).unwrap(), b"stream body");
}

#[test]
fn test_stage_parms_reach_their_codec() {
    // One PNG Up row pair, deflated, then hex encoded.
    let rows = [2u8, 5, 5, 2, 1, 1];
    let mut writer: FilterChain = FilterChain::new();
    writer.push(FlateCodec::new()).push(AsciiHexCodec::new());
    let encoded = writer.encode(&rows).unwrap();

    let parms = DecodeParms::new().with_int("Predictor", 12).with_int("Columns", 2);
    let mut reader: FilterChain =
        FilterChain::from_decode_order([("ASCIIHexDecode", None), ("FlateDecode", Some(parms))])
            .unwrap();
    assert_eq!(reader.decode(&encoded).unwrap(), [5, 5, 6, 6]);
}

#[test]
fn test_progressive_chain_matches_one_shot() {
    let input: Vec<u8> = b"0123456789".iter().cycle().take(3000).copied().collect();
    let kinds = [FilterKind::Flate, FilterKind::Lzw, FilterKind::Ascii85];
    let mut one_shot: FilterChain = FilterChain::from_kinds(&kinds).unwrap();
    let expected = one_shot.encode(&input).unwrap();

    let mut chain: FilterChain = FilterChain::from_kinds(&kinds).unwrap();
    chain.begin_encode(Vec::new()).unwrap();
    for piece in input.chunks(17) {
        chain.encode_block(piece).unwrap();
    }
    assert_eq!(chain.end_encode().unwrap(), expected);

    chain.begin_decode(Vec::new()).unwrap();
    for piece in expected.chunks(5) {
        chain.decode_block(piece).unwrap();
    }
    assert_eq!(chain.end_decode().unwrap(), input);
}

#[test]
fn test_crypt_stage_in_chain() {
    let ctx = Arc::new(CryptoContext::default());
    let mut chain: FilterChain = FilterChain::new();
    chain
        .push(FlateCodec::new())
        .push(CryptCodec::new(ctx, CipherKind::Aes128Cbc, vec![0x11; 16]));
    let encoded = chain.encode(b"confidential content stream").unwrap();
    assert_eq!(encoded.len() % 16, 0);
    assert_eq!(chain.decode(&encoded).unwrap(), b"confidential content stream");
}

#[test]
fn test_stage_failure_aborts_chain() {
    let mut chain: FilterChain =
        FilterChain::from_kinds(&[FilterKind::Flate, FilterKind::AsciiHex]).unwrap();
    chain.begin_decode(Vec::new()).unwrap();
    // 01 02 is not a zlib header.
    let err = chain.decode_block(b"0102030405>").unwrap_err();
    assert!(err.is_decode());
    assert_eq!(chain.state(), FilterState::Failed);
    assert!(chain.decode_block(b"more").unwrap_err().is_usage());

    // A failed chain can start over.
    let encoded = chain.encode(b"again").unwrap();
    assert_eq!(chain.decode(&encoded).unwrap(), b"again");
}

#[test]
fn test_fail_returns_final_sink() {
    let mut chain: FilterChain = FilterChain::new();
    chain.push(RunLengthCodec::new());
    chain.begin_encode(b"prefix:".to_vec()).unwrap();
    chain.encode_block(b"xyz").unwrap();
    let sink = chain.fail().unwrap();
    assert!(sink.starts_with(b"prefix:"));
    assert_eq!(chain.state(), FilterState::Failed);
    assert!(chain.fail().unwrap_err().is_usage());
}

#[test]
fn test_unknown_filter_name() {
    let err = FilterChain::<Vec<u8>>::from_decode_order([("JBIG2Decode", None)])
        .err()
        .unwrap();
    assert!(err.is_configuration());
}
