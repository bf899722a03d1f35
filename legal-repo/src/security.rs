//! Security utilities for payment signatures and password hashing.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub use bcrypt::DEFAULT_COST;

/// Signs an `(order, payment)` pair the way the payment gateway does:
/// hex HMAC-SHA256 over `"{order_id}|{payment_id}"` keyed by the API secret.
pub fn sign_payment(order_id: &str, payment_id: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a payment signature using constant-time comparison.
pub fn verify_payment_signature(
    order_id: &str,
    payment_id: &str,
    signature: &str,
    secret: &str,
) -> bool {
    let expected = sign_payment(order_id, payment_id, secret);
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}

/// Hashes a password with bcrypt.
pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, cost)
}

/// Checks a password against a stored bcrypt hash.
///
/// A malformed hash counts as a mismatch.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    bcrypt::verify(password, stored_hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "rzp_test_secret";

    #[test]
    fn test_payment_signature_is_hex_sha256() {
        let signature = sign_payment("order_1", "pay_1", SECRET);

        assert_eq!(signature.len(), 64);
        assert_eq!(signature, sign_payment("order_1", "pay_1", SECRET));
    }

    #[test]
    fn test_payment_signature_verification() {
        let signature = sign_payment("order_1", "pay_1", SECRET);

        assert!(verify_payment_signature(
            "order_1", "pay_1", &signature, SECRET
        ));
        assert!(!verify_payment_signature(
            "order_1",
            "pay_1",
            &signature,
            "wrong_secret"
        ));
        assert!(!verify_payment_signature(
            "order_1", "pay_2", &signature, SECRET
        ));
        assert!(!verify_payment_signature(
            "order_2", "pay_1", &signature, SECRET
        ));
    }

    #[test]
    fn test_single_flipped_character_is_rejected() {
        let mut signature = sign_payment("order_1", "pay_1", SECRET).into_bytes();
        signature[10] = if signature[10] == b'a' { b'b' } else { b'a' };
        let signature = String::from_utf8(signature).unwrap();

        assert!(!verify_payment_signature(
            "order_1", "pay_1", &signature, SECRET
        ));
    }

    #[test]
    fn test_separator_is_part_of_the_payload() {
        assert_ne!(
            sign_payment("order_1", "pay_1", SECRET),
            sign_payment("order_1|", "pay_1", SECRET)
        );
    }

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("hunter22", 4).unwrap();

        assert_ne!(hash, "hunter22");
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
        assert!(!verify_password("hunter22", "not-a-bcrypt-hash"));
    }
}
