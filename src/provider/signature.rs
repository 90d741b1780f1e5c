use sha2::{Digest, Sha512};

/// `hex(SHA512(order_id + status_code + gross_amount + server_key))`
pub fn notification_signature(
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    server_key: &str,
) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn verify_signature(
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    server_key: &str,
    provided: &str,
) -> bool {
    let expected = notification_signature(order_id, status_code, gross_amount, server_key);
    constant_time_eq(&expected, &provided.to_ascii_lowercase())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_lowercase_sha512_hex() {
        let sig = notification_signature("MOCHI-1", "200", "150000.00", "server-key");
        assert_eq!(sig.len(), 128);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn any_changed_component_breaks_the_signature() {
        let sig = notification_signature("MOCHI-1", "200", "150000.00", "server-key");
        assert!(verify_signature("MOCHI-1", "200", "150000.00", "server-key", &sig));
        assert!(verify_signature(
            "MOCHI-1",
            "200",
            "150000.00",
            "server-key",
            &sig.to_uppercase()
        ));
        assert!(!verify_signature("MOCHI-2", "200", "150000.00", "server-key", &sig));
        assert!(!verify_signature("MOCHI-1", "201", "150000.00", "server-key", &sig));
        assert!(!verify_signature("MOCHI-1", "200", "150000", "server-key", &sig));
        assert!(!verify_signature("MOCHI-1", "200", "150000.00", "other-key", &sig));
        assert!(!verify_signature("MOCHI-1", "200", "150000.00", "server-key", ""));
    }
}
