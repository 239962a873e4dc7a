//! Generated Base32 secrets flow through decode → handle → engine.

use otpkit_core::{engine, secret, Algorithm, FixedClock, TotpConfig};
use rand::rngs::OsRng;

#[test]
fn generated_secret_produces_verifiable_codes() {
    for algorithm in Algorithm::ALL {
        let encoded = secret::generate_secret_for(&mut OsRng, algorithm).unwrap();
        engine::validate_encoded_secret(&encoded).unwrap();

        let cfg = TotpConfig::builder().algorithm(algorithm).build().unwrap();
        let clock = FixedClock::at_epoch_seconds(1_700_000_000);
        let code = secret::decode_secret(&encoded)
            .unwrap()
            .use_once(|key| engine::generate_now(key, &cfg, &clock))
            .unwrap();
        let valid = secret::decode_secret(&encoded)
            .unwrap()
            .use_once(|key| engine::verify(key, &code, &cfg, &clock))
            .unwrap();
        assert!(valid, "{algorithm} round-trip failed");
    }
}

#[test]
fn lowercase_spaced_secret_matches_canonical() {
    let cfg = TotpConfig::default();
    let clock = FixedClock::at_epoch_seconds(59);
    let canonical = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";
    let spaced = "gezd gnbv gy3t qojq gezd gnbv gy3t qojq";

    let a = secret::decode_secret(canonical)
        .unwrap()
        .use_once(|key| engine::generate_now(key, &cfg, &clock))
        .unwrap();
    let b = secret::decode_secret(spaced)
        .unwrap()
        .use_once(|key| engine::generate_now(key, &cfg, &clock))
        .unwrap();
    assert_eq!(a, "287082");
    assert_eq!(a, b);
}

#[test]
fn short_encoded_secret_rejected_before_decode() {
    assert!(engine::validate_encoded_secret("JBSWY3DPEHPK3PXP").is_err());
    assert!(!secret::is_valid_secret("JBSWY3DPEHPK3PXP"));
}
