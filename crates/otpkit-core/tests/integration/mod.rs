mod secret_roundtrip;
