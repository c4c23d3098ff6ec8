use hsq::{FormatError, HEADER_SIZE};

const LOREM: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, \
sed do eiusmod tempor incididunt ut labore et dolore magna aliqua. Ut enim ad \
minim veniam, quis nostrud exercitation ullamco laboris nisi ut aliquip ex ea \
commodo consequat. Duis aute irure dolor in reprehenderit in voluptate velit \
esse cillum dolore eu fugiat nulla pariatur.";

/// Simple deterministic byte generator for incompressible-ish inputs.
fn lcg_bytes(len: usize, mut seed: u32) -> Vec<u8> {
    (0..len)
        .map(|_| {
            seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
            (seed >> 24) as u8
        })
        .collect()
}

fn roundtrip(input: &[u8]) {
    let compressed = hsq::compress(input).unwrap();
    let decompressed = hsq::decompress(&compressed).unwrap();
    assert_eq!(input, decompressed.as_slice(), "{} byte input", input.len());
}

#[test]
fn roundtrip_empty() {
    roundtrip(&[]);
}

#[test]
fn roundtrip_single_byte() {
    roundtrip(&[0x42]);
}

#[test]
fn roundtrip_two_identical_bytes() {
    roundtrip(&[0x42, 0x42]);
}

#[test]
fn roundtrip_text() {
    roundtrip(LOREM.as_bytes());
}

#[test]
fn roundtrip_long_runs() {
    let mut input = vec![0u8; 2000];
    input.extend_from_slice(LOREM.as_bytes());
    input.extend(std::iter::repeat(0xEE).take(3000));
    roundtrip(&input);
}

#[test]
fn roundtrip_incompressible() {
    roundtrip(&lcg_bytes(20_000, 0xDEADBEEF));
}

#[test]
fn roundtrip_all_byte_values() {
    let input: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    roundtrip(&input);
}

#[test]
fn text_actually_compresses() {
    let mut input = Vec::new();
    for _ in 0..8 {
        input.extend_from_slice(LOREM.as_bytes());
    }
    let compressed = hsq::compress(&input).unwrap();
    assert!(
        compressed.len() < input.len() / 2,
        "{} -> {} bytes",
        input.len(),
        compressed.len()
    );
}

#[test]
fn emitted_headers_hold_the_checksum_invariant() {
    for input in [&b""[..], &[0x41u8; 100][..], LOREM.as_bytes()] {
        let compressed = hsq::compress(input).unwrap();
        let sum = compressed[..HEADER_SIZE]
            .iter()
            .fold(0u8, |acc, &b| acc.wrapping_add(b));
        assert_eq!(sum, 0xAB);

        let header = hsq::hsq_info(&compressed).unwrap();
        assert_eq!(header.decompressed_size as usize, input.len());
        assert_eq!(header.compressed_size as usize, compressed.len());
        assert_eq!(hsq::Decoder::for_bytes(&compressed).header().unwrap(), header);
    }
}

#[test]
fn oversized_input_rejected() {
    let input = vec![0u8; u16::MAX as usize + 1];
    assert!(matches!(
        hsq::compress(&input),
        Err(FormatError::InputTooLarge(_))
    ));
}

#[test]
fn decode_rejects_corruption() {
    let compressed = hsq::compress(LOREM.as_bytes()).unwrap();

    let mut bad = compressed.clone();
    bad[2] = bad[2].wrapping_add(1);
    assert!(matches!(
        hsq::decompress(&bad),
        Err(FormatError::Checksum { .. })
    ));

    let mut truncated = compressed.clone();
    truncated.truncate(compressed.len() - 4);
    assert!(matches!(
        hsq::decompress(&truncated),
        Err(FormatError::SizeMismatch { .. })
    ));

    assert!(matches!(
        hsq::decompress(&compressed[..3]),
        Err(FormatError::TooShort(3))
    ));
}

#[test]
fn encoder_logging_traces_tokens() {
    let mut log = Vec::new();
    let compressed = hsq::EncoderBuilder::for_bytes(b"ABBACABBACD")
        .with_logging(&mut log)
        .encode_to_vec()
        .unwrap();
    let trace = String::from_utf8(log).unwrap();
    assert!(trace.contains("Uncoded"));
    assert!(trace.contains("Copyback"));
    assert_eq!(hsq::decompress(&compressed).unwrap(), b"ABBACABBACD");
}

#[test]
fn file_roundtrip() {
    let path = std::env::temp_dir().join("hsq-test-roundtrip.hsq");
    hsq::EncoderBuilder::for_bytes(LOREM.as_bytes())
        .encode_to_file(&path)
        .unwrap();

    assert_eq!(hsq::decompress_file(&path).unwrap(), LOREM.as_bytes());
    let mut decoder = hsq::Decoder::for_file(&path).unwrap();
    assert_eq!(decoder.decode().unwrap(), LOREM.as_bytes());
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn shallow_chain_still_roundtrips() {
    let input = lcg_bytes(5000, 7).repeat(3);
    let compressed = hsq::EncoderBuilder::for_bytes(&input)
        .with_settings(hsq::EncoderSettings { max_chain: 1 })
        .encode_to_vec()
        .unwrap();
    assert_eq!(hsq::decompress(&compressed).unwrap(), input);
}
