#![allow(dead_code)]
use strata_core::{ContextPath, FallbackKey};

/// Parses a context path, panicking on malformed input (intended for tests).
pub fn path(text: &str) -> ContextPath {
    text.parse().expect("Failed to parse test context path")
}

/// The application key used throughout the fallback scenarios.
pub fn application_key() -> FallbackKey<u64> {
    FallbackKey::new(7)
        .with_tenant(5)
        .with_client(3)
        .with_product(2)
        .with_context(path("1.10-2.20"))
}
