//! Process-wide transition ordering.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Claim the next sequence number. Values are never reused.
pub fn next_sequence() -> u64 {
    NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_strictly_increases() {
        let first = next_sequence();
        let second = next_sequence();
        let third = next_sequence();

        assert!(first < second);
        assert!(second < third);
    }

    #[test]
    fn concurrent_claims_are_unique() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| (0..100).map(|_| next_sequence()).collect::<Vec<_>>()))
            .collect();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = all.len();
        all.sort_unstable();
        all.dedup();

        assert_eq!(all.len(), total);
    }
}
