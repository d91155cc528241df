use std::{env, sync::LazyLock};

use crate::statement::AttestationFormat;

/// Statement formats accepted by `ValidationOrchestrator::default()`.
pub(crate) static PASSKEY_ATTESTATION_FORMATS: LazyLock<Vec<AttestationFormat>> =
    LazyLock::new(|| parse_formats(env::var("PASSKEY_ATTESTATION_FORMATS").ok().as_deref()));

/// When true, android-key only trusts the TEE-enforced authorization list.
pub(crate) static PASSKEY_ANDROID_KEY_TEE_ENFORCED_ONLY: LazyLock<bool> = LazyLock::new(|| {
    parse_bool_flag(
        "PASSKEY_ANDROID_KEY_TEE_ENFORCED_ONLY",
        env::var("PASSKEY_ANDROID_KEY_TEE_ENFORCED_ONLY")
            .ok()
            .as_deref(),
        false,
    )
});

pub(crate) fn parse_formats(value: Option<&str>) -> Vec<AttestationFormat> {
    let Some(value) = value else {
        return AttestationFormat::ALL.to_vec();
    };

    let mut formats = Vec::new();
    for entry in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match entry.to_lowercase().parse::<AttestationFormat>() {
            Ok(format) if !formats.contains(&format) => formats.push(format),
            Ok(_) => {}
            Err(_) => tracing::warn!("Invalid attestation format: {}. Ignoring", entry),
        }
    }

    if formats.is_empty() {
        tracing::warn!(
            "No valid attestation format in '{}'. Using all supported formats",
            value
        );
        return AttestationFormat::ALL.to_vec();
    }
    formats
}

pub(crate) fn parse_bool_flag(name: &str, value: Option<&str>, default: bool) -> bool {
    match value {
        None => default,
        Some(v) => match v.to_lowercase().as_str() {
            "true" => true,
            "false" => false,
            invalid => {
                tracing::warn!("Invalid {}: {}. Using default '{}'", name, invalid, default);
                default
            }
        },
    }
}
