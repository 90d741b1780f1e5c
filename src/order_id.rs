//! Order reference generator.
//!
//! References look like `MOCHI-1718000000000-7Q2KX9D4ZM`: prefix, wall-clock
//! milliseconds, then ten base-36 characters drawn from the thread-local
//! CSPRNG (about 51 bits of entropy per reference).

use chrono::Utc;
use rand::Rng;

pub const DEFAULT_PREFIX: &str = "MOCHI";

const SUFFIX_LEN: usize = 10;
const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone)]
pub struct OrderIdGenerator {
    prefix: String,
}

impl Default for OrderIdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl OrderIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn generate(&self) -> String {
        let timestamp = Utc::now().timestamp_millis();
        format!("{}-{}-{}", self.prefix, timestamp, random_suffix())
    }
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn reference_has_prefix_timestamp_and_suffix() {
        let id = OrderIdGenerator::default().generate();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3, "unexpected shape: {}", id);
        assert_eq!(parts[0], "MOCHI");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), SUFFIX_LEN);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn ten_thousand_sequential_references_are_unique() {
        let generator = OrderIdGenerator::default();
        let ids: HashSet<String> = (0..10_000).map(|_| generator.generate()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn references_fit_provider_length_limit() {
        let id = OrderIdGenerator::new("MOCHI").generate();
        assert!(id.len() <= 50);
    }

    #[test]
    fn concurrent_generation_does_not_collide() {
        let generator = OrderIdGenerator::default();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let generator = generator.clone();
                std::thread::spawn(move || {
                    (0..1_000).map(|_| generator.generate()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(all.insert(id));
            }
        }
        assert_eq!(all.len(), 8_000);
    }
}
