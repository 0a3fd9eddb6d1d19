// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use base64::{engine::general_purpose, Engine};
use rand::{rng, Rng};

use super::error::code::ErrorCode;
use crate::raise_error;

#[macro_export]
macro_rules! mailboard_version {
    () => {
        env!("CARGO_PKG_VERSION")
    };
}

#[macro_export]
macro_rules! utc_now {
    () => {{
        use chrono::Utc;
        Utc::now().timestamp_millis()
    }};
}

#[macro_export]
macro_rules! raise_error {
    ($msg:expr, $code:expr) => {
        $crate::modules::error::MailBoardError::Generic {
            message: $msg,
            location: snafu::Location::default(),
            code: $code,
        }
    };
}

#[macro_export]
macro_rules! generate_token {
    ($bit_strength:expr) => {{
        $crate::modules::utils::generate_token_impl($bit_strength)
    }};
}

pub(crate) fn generate_token_impl(bit_strength: usize) -> String {
    let byte_length = (bit_strength + 23) / 24 * 3;
    let random_bytes: Vec<u8> = (0..byte_length).map(|_| rand::random::<u8>()).collect();
    let mut encoded = general_purpose::URL_SAFE.encode(&random_bytes);

    encoded = encoded
        .chars()
        .map(|c| {
            if c == '/' || c == '+' || c == '-' || c == '_' || c == '=' {
                make_single_random_char()
            } else {
                c
            }
        })
        .collect();

    encoded
}

fn make_single_random_char() -> char {
    let random_bytes: [u8; 3] = rng().random();
    let encoded = general_purpose::URL_SAFE.encode(random_bytes);
    encoded
        .chars()
        .find(|&c| c != '-' && c != '_' && c != '+' && c != '/' && c != '=')
        .unwrap_or('a')
}

/// Generates a random entity id folded to 53 bits so it survives a round
/// trip through JSON numbers.
#[macro_export]
macro_rules! id {
    ($bit_strength:expr) => {{
        let token = $crate::modules::utils::generate_token_impl($bit_strength);
        $crate::modules::utils::hash(&token)
    }};
}

pub fn hash(s: &str) -> u64 {
    let mut cursor = std::io::Cursor::new(s.as_bytes().to_vec());
    let hash = murmur3::murmur3_x64_128(&mut cursor, 0).unwrap_or_default();
    (hash & 0x1F_FFFF_FFFF_FFFF) as u64
}

#[macro_export]
macro_rules! validate_email {
    ($email:expr) => {{
        $crate::modules::utils::validate_email($email)
    }};
}

pub fn validate_email(email: &str) -> crate::modules::error::MailBoardResult<()> {
    use std::str::FromStr;
    let email_address = email_address::EmailAddress::from_str(email).map_err(|_| {
        raise_error!(
            format!("Invalid email format : {}", email),
            ErrorCode::InvalidParameter
        )
    })?;
    if email != email_address.email() {
        return Err(raise_error!(
            format!("Invalid email format: {}", email),
            ErrorCode::InvalidParameter
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_contains_only_plain_base64_chars() {
        for _ in 0..16 {
            let token = generate_token_impl(128);
            assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn hash_is_stable_and_fits_53_bits() {
        let a = hash("alice@example.com");
        let b = hash("alice@example.com");
        assert_eq!(a, b);
        assert!(a <= 0x1F_FFFF_FFFF_FFFF);
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(validate_email("not-an-address").is_err());
        assert!(validate_email("user@example.com").is_ok());
    }
}
