//! RFC 4648 §10 Base32 test vectors.

use otpkit_core::base32::{decode, encode, encode_padded};

const VECTORS: [(&str, &str); 7] = [
    ("", ""),
    ("f", "MY======"),
    ("fo", "MZXQ===="),
    ("foo", "MZXW6==="),
    ("foob", "MZXW6YQ="),
    ("fooba", "MZXW6YTB"),
    ("foobar", "MZXW6YTBOI======"),
];

#[test]
fn rfc4648_section10_encode() {
    for (plain, encoded) in &VECTORS {
        assert_eq!(
            &encode_padded(plain.as_bytes()),
            encoded,
            "RFC 4648 padded mismatch for {plain:?}"
        );
        assert_eq!(
            encode(plain.as_bytes()),
            encoded.trim_end_matches('='),
            "RFC 4648 unpadded mismatch for {plain:?}"
        );
    }
}

#[test]
fn rfc4648_section10_decode() {
    for (plain, encoded) in &VECTORS {
        assert_eq!(
            decode(encoded).unwrap(),
            plain.as_bytes(),
            "RFC 4648 decode mismatch for {encoded:?}"
        );
        assert_eq!(
            decode(encoded.trim_end_matches('=')).unwrap(),
            plain.as_bytes(),
            "RFC 4648 unpadded decode mismatch for {encoded:?}"
        );
    }
}
