//! Chronologically sortable child keys.
//!
//! A key is 20 characters: 8 encode the creation time in milliseconds, 12 are
//! random. Keys minted within the same millisecond reuse the previous random
//! tail incremented by one, so lexical order always matches creation order.

use std::sync::{LazyLock, Mutex};

use chrono::Utc;
use uuid::Uuid;

const ALPHABET: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";
const TIME_LEN: usize = 8;
const RANDOM_LEN: usize = 12;

static GENERATOR: LazyLock<Mutex<PushIdGenerator>> =
    LazyLock::new(|| Mutex::new(PushIdGenerator::default()));

/// Mint a new key for the current wall-clock time.
pub fn generate() -> String {
    let now = Utc::now().timestamp_millis();
    match GENERATOR.lock() {
        Ok(mut generator) => generator.next(now),
        Err(poisoned) => poisoned.into_inner().next(now),
    }
}

#[derive(Debug, Default)]
pub struct PushIdGenerator {
    last_time: i64,
    last_random: [u8; RANDOM_LEN],
}

impl PushIdGenerator {
    pub fn next(&mut self, now_ms: i64) -> String {
        if now_ms == self.last_time {
            self.increment_random();
        } else {
            self.last_time = now_ms;
            let entropy = Uuid::new_v4();
            for (slot, byte) in self.last_random.iter_mut().zip(entropy.as_bytes()) {
                *slot = byte & 63;
            }
        }

        let mut id = Vec::with_capacity(TIME_LEN + RANDOM_LEN);
        let mut time = now_ms.max(0);
        let mut time_chars = [0u8; TIME_LEN];
        for slot in time_chars.iter_mut().rev() {
            *slot = ALPHABET[(time % 64) as usize];
            time /= 64;
        }
        id.extend_from_slice(&time_chars);
        id.extend(self.last_random.iter().map(|&i| ALPHABET[i as usize]));

        String::from_utf8(id).unwrap_or_default()
    }

    fn increment_random(&mut self) {
        for slot in self.last_random.iter_mut().rev() {
            if *slot == 63 {
                *slot = 0;
            } else {
                *slot += 1;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_have_fixed_length_and_safe_alphabet() {
        let id = generate();
        assert_eq!(id.len(), TIME_LEN + RANDOM_LEN);
        assert!(id.bytes().all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn ids_sort_by_creation_time() {
        let mut generator = PushIdGenerator::default();
        let earlier = generator.next(1_700_000_000_000);
        let later = generator.next(1_700_000_000_001);
        assert!(earlier < later);
    }

    #[test]
    fn same_millisecond_ids_stay_ordered() {
        let mut generator = PushIdGenerator::default();
        let ids: Vec<String> = (0..50).map(|_| generator.next(42)).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        sorted.dedup();
        assert_eq!(sorted.len(), 50);
    }
}
