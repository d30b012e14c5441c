//! TOTP second factor: enrollment secrets, provisioning URIs and QR
//! rendering, skew-tolerant code verification, backup codes, and
//! AES-256-GCM secret-at-rest encryption.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use subtle::{Choice, ConstantTimeEq};
use totp_rs::{Algorithm, Secret, TOTP};

use crate::error::AuthError;

/// RFC 6238 defaults, compatible with standard authenticator apps.
const DIGITS: usize = 6;
const SKEW: u8 = 1;
const STEP_SECS: u64 = 30;

/// A freshly generated enrollment: base32 secret plus the otpauth
/// provisioning URI embedding issuer and account label.
#[derive(Debug, Clone)]
pub struct Enrollment {
    pub secret_base32: String,
    pub otpauth_url: String,
}

/// Generate a TOTP enrollment from a secure random source.
///
/// The secret is 20 bytes before base32 encoding and is generated
/// exactly once per enrollment — callers persist it, it is never
/// regenerated implicitly.
pub fn generate_enrollment(issuer: &str, account: &str) -> Result<Enrollment, AuthError> {
    let secret = Secret::generate_secret();
    let secret_bytes = secret
        .to_bytes()
        .map_err(|e| AuthError::Crypto(format!("secret bytes: {e:?}")))?;

    let totp = TOTP::new(
        Algorithm::SHA1,
        DIGITS,
        SKEW,
        STEP_SECS,
        secret_bytes,
        Some(issuer.to_string()),
        account.to_string(),
    )
    .map_err(|e| AuthError::Crypto(format!("TOTP init: {e}")))?;

    Ok(Enrollment {
        secret_base32: secret.to_encoded().to_string(),
        otpauth_url: totp.get_url(),
    })
}

/// Render a provisioning URI as a PNG image.
///
/// Presentation convenience only — mutates no enrollment state. Fails
/// with [`AuthError::RenderError`] if the URI is malformed.
pub fn render_provisioning_png(otpauth_url: &str) -> Result<Vec<u8>, AuthError> {
    let totp = TOTP::from_url(otpauth_url)
        .map_err(|e| AuthError::RenderError(format!("malformed otpauth URI: {e}")))?;
    totp.get_qr_png()
        .map_err(|e| AuthError::RenderError(format!("QR encode: {e}")))
}

/// Verify a submitted code against a base32 secret, accepting one
/// time-step of clock drift in either direction.
///
/// All candidate codes are compared in constant time and the results
/// OR-ed, so response timing is independent of which step (if any)
/// matched. A malformed or missing secret yields `false` rather than
/// an error — callers cannot distinguish a wrong code from a corrupt
/// secret; the detail is logged instead.
pub fn verify_code(secret_base32: &str, code: &str) -> bool {
    match check_code(secret_base32, code) {
        Ok(matched) => matched,
        Err(err) => {
            tracing::warn!(error = %err, "TOTP verification failed before comparison");
            false
        }
    }
}

fn check_code(secret_base32: &str, code: &str) -> Result<bool, AuthError> {
    let secret_bytes = Secret::Encoded(secret_base32.to_string())
        .to_bytes()
        .map_err(|e| AuthError::Crypto(format!("secret decode: {e:?}")))?;

    let totp = TOTP::new(
        Algorithm::SHA1,
        DIGITS,
        SKEW,
        STEP_SECS,
        secret_bytes,
        None,
        "principal".to_string(),
    )
    .map_err(|e| AuthError::Crypto(format!("TOTP init: {e}")))?;

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| AuthError::Crypto(format!("clock: {e}")))?
        .as_secs();

    let mut matched = Choice::from(0u8);
    for offset in [-(STEP_SECS as i64), 0, STEP_SECS as i64] {
        let expected = totp.generate(now.saturating_add_signed(offset));
        matched |= constant_time_eq(expected.as_bytes(), code.as_bytes());
    }
    Ok(bool::from(matched))
}

fn constant_time_eq(expected: &[u8], submitted: &[u8]) -> Choice {
    if expected.len() != submitted.len() {
        return Choice::from(0u8);
    }
    expected.ct_eq(submitted)
}

/// Generate a code for a secret at an explicit Unix time. Test and
/// provisioning helper; verification never calls this.
pub fn code_at(secret_base32: &str, unix_time: u64) -> Result<String, AuthError> {
    let secret_bytes = Secret::Encoded(secret_base32.to_string())
        .to_bytes()
        .map_err(|e| AuthError::Crypto(format!("secret decode: {e:?}")))?;
    let totp = TOTP::new(
        Algorithm::SHA1,
        DIGITS,
        SKEW,
        STEP_SECS,
        secret_bytes,
        None,
        "principal".to_string(),
    )
    .map_err(|e| AuthError::Crypto(format!("TOTP init: {e}")))?;
    Ok(totp.generate(unix_time))
}

/// Generate one-time backup recovery codes: 8 uppercase hex characters
/// each, independently drawn from a CSPRNG.
///
/// 32 bits of entropy per code — acceptable for a human-entered
/// one-time fallback, not for cryptographic keys.
pub fn generate_backup_codes(count: usize) -> Vec<String> {
    let mut rng = rand::rng();
    (0..count)
        .map(|_| format!("{:08X}", rand::Rng::random::<u32>(&mut rng)))
        .collect()
}

/// The stored form of a backup code: SHA-256 hex digest of the
/// normalized (trimmed, uppercased) code.
pub fn hash_backup_code(code: &str) -> String {
    let normalized = code.trim().to_ascii_uppercase();
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

/// Encrypt a TOTP secret for storage with AES-256-GCM.
///
/// Returns `base64(nonce || ciphertext || tag)`.
pub fn encrypt_secret(key: &[u8; 32], secret_base32: &str) -> Result<String, AuthError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut nonce_bytes = [0u8; 12];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, secret_base32.as_bytes())
        .map_err(|e| AuthError::Crypto(format!("AES-GCM encrypt: {e}")))?;

    let mut combined = nonce_bytes.to_vec();
    combined.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(combined))
}

/// Decrypt an AES-256-GCM encrypted TOTP secret back to base32.
pub fn decrypt_secret(key: &[u8; 32], encoded: &str) -> Result<String, AuthError> {
    let combined = STANDARD
        .decode(encoded)
        .map_err(|e| AuthError::Crypto(format!("base64 decode: {e}")))?;

    if combined.len() < 13 {
        return Err(AuthError::Crypto("ciphertext too short".into()));
    }

    let (nonce_bytes, ciphertext) = combined.split_at(12);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(nonce_bytes);

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| AuthError::Crypto(format!("AES-GCM decrypt: {e}")))?;
    String::from_utf8(plaintext).map_err(|e| AuthError::Crypto(format!("secret encoding: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    #[test]
    fn enrollment_produces_valid_uri() {
        let enrollment = generate_enrollment("Comptoir", "user@test.com").unwrap();
        assert!(!enrollment.secret_base32.is_empty());
        assert!(enrollment.otpauth_url.starts_with("otpauth://totp/"));
        assert!(enrollment.otpauth_url.contains("Comptoir"));
        assert!(enrollment.otpauth_url.contains("user"));
    }

    #[test]
    fn enrollment_secrets_are_unique() {
        let a = generate_enrollment("Comptoir", "user@test.com").unwrap();
        let b = generate_enrollment("Comptoir", "user@test.com").unwrap();
        assert_ne!(a.secret_base32, b.secret_base32);
    }

    #[test]
    fn current_code_verifies() {
        let enrollment = generate_enrollment("Comptoir", "user@test.com").unwrap();
        let code = code_at(&enrollment.secret_base32, now_secs()).unwrap();
        assert!(verify_code(&enrollment.secret_base32, &code));
    }

    #[test]
    fn adjacent_step_verifies() {
        let enrollment = generate_enrollment("Comptoir", "user@test.com").unwrap();
        let code = code_at(&enrollment.secret_base32, now_secs() - STEP_SECS).unwrap();
        assert!(verify_code(&enrollment.secret_base32, &code));
    }

    #[test]
    fn stale_code_fails() {
        let enrollment = generate_enrollment("Comptoir", "user@test.com").unwrap();
        let code = code_at(&enrollment.secret_base32, now_secs() - 10 * STEP_SECS).unwrap();
        assert!(!verify_code(&enrollment.secret_base32, &code));
    }

    #[test]
    fn code_from_other_secret_fails() {
        let a = generate_enrollment("Comptoir", "user@test.com").unwrap();
        let b = generate_enrollment("Comptoir", "user@test.com").unwrap();
        let code = code_at(&a.secret_base32, now_secs()).unwrap();
        assert!(!verify_code(&b.secret_base32, &code));
    }

    #[test]
    fn malformed_secret_yields_false() {
        assert!(!verify_code("not base32 at all!!", "000000"));
    }

    #[test]
    fn render_png_from_valid_uri() {
        let enrollment = generate_enrollment("Comptoir", "user@test.com").unwrap();
        let png = render_provisioning_png(&enrollment.otpauth_url).unwrap();
        // PNG magic number.
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn render_malformed_uri_fails() {
        assert!(matches!(
            render_provisioning_png("https://not-an-otpauth-uri"),
            Err(AuthError::RenderError(_))
        ));
    }

    #[test]
    fn backup_codes_shape() {
        let codes = generate_backup_codes(10);
        assert_eq!(codes.len(), 10);
        for code in &codes {
            assert_eq!(code.len(), 8);
            assert!(
                code.chars()
                    .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase())
            );
        }
    }

    #[test]
    fn backup_codes_unique_within_batches() {
        // Statistical collision check: 10_000 batches of 10, no
        // within-batch duplicate expected at 32 bits per code.
        for _ in 0..10_000 {
            let codes = generate_backup_codes(10);
            let unique: HashSet<&String> = codes.iter().collect();
            assert_eq!(unique.len(), codes.len());
        }
    }

    #[test]
    fn backup_code_hash_normalizes() {
        assert_eq!(hash_backup_code("a1b2c3d4"), hash_backup_code(" A1B2C3D4 "));
        assert_ne!(hash_backup_code("A1B2C3D4"), hash_backup_code("A1B2C3D5"));
    }

    #[test]
    fn secret_encryption_roundtrip() {
        let key = [42u8; 32];
        let enrollment = generate_enrollment("Comptoir", "user@test.com").unwrap();
        let sealed = encrypt_secret(&key, &enrollment.secret_base32).unwrap();
        assert_ne!(sealed, enrollment.secret_base32);
        let opened = decrypt_secret(&key, &sealed).unwrap();
        assert_eq!(opened, enrollment.secret_base32);
    }

    #[test]
    fn wrong_key_fails_decrypt() {
        let sealed = encrypt_secret(&[1u8; 32], "JBSWY3DPEHPK3PXP").unwrap();
        assert!(decrypt_secret(&[2u8; 32], &sealed).is_err());
    }
}
