//! Entropy quality of generated shared secrets.
//!
//! Shannon entropy approaches 8.0 bits/byte for uniform data only as the
//! sample grows; small samples use relaxed thresholds that still catch
//! degenerate output (all zeros, repeated bytes).

use otpkit_core::{base32, secret, Algorithm};
use rand::rngs::OsRng;

/// Shannon entropy of a byte slice (bits per byte).
#[allow(clippy::cast_precision_loss)]
fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut freq = [0u64; 256];
    for &b in data {
        freq[b as usize] = freq[b as usize].saturating_add(1);
    }
    let len = data.len() as f64;
    freq.iter()
        .filter(|&&f| f > 0)
        .map(|&f| {
            let p = f as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// 64 KB of secret bytes: expected ~7.997 bits/byte.
#[test]
fn secret_bytes_64kb_entropy() {
    let handle = secret::generate_secret_bytes(&mut OsRng, 65536).expect("CSPRNG should succeed");
    let entropy = shannon_entropy(handle.bytes().unwrap());
    assert!(entropy > 7.99, "entropy too low: {entropy:.4} (expected > 7.99)");
}

/// SHA512-sized secret (64 bytes): expected ~5.75 bits/byte.
#[test]
fn sha512_secret_entropy() {
    let encoded = secret::generate_secret_for(&mut OsRng, Algorithm::Sha512).unwrap();
    let bytes = base32::decode(&encoded).unwrap();
    assert_eq!(bytes.len(), 64);
    let entropy = shannon_entropy(&bytes);
    assert!(entropy > 5.0, "entropy too low: {entropy:.4} (expected > 5.0)");
}

/// SHA256-sized secret (32 bytes): expected ~4.88 bits/byte.
#[test]
fn sha256_secret_entropy() {
    let encoded = secret::generate_secret_for(&mut OsRng, Algorithm::Sha256).unwrap();
    let entropy = shannon_entropy(&base32::decode(&encoded).unwrap());
    assert!(entropy > 4.0, "entropy too low: {entropy:.4} (expected > 4.0)");
}

#[test]
fn consecutive_secrets_are_distinct() {
    let a = secret::generate_secret_bytes(&mut OsRng, 256).unwrap();
    let b = secret::generate_secret_bytes(&mut OsRng, 256).unwrap();
    assert_ne!(
        a.bytes().unwrap(),
        b.bytes().unwrap(),
        "two consecutive secrets are identical; CSPRNG may be broken"
    );
}
