//! Queue traversal arithmetic.
//!
//! The queue itself is just an ordered `Vec` of songs owned by the engine;
//! these helpers define what "next" and "previous" mean over its indices.

use rand::Rng;

/// Manual skip forward: wraps to the start at the end of the queue.
pub(crate) fn next_index(current: usize, len: usize) -> usize {
    debug_assert!(len > 0 && current < len);
    (current + 1) % len
}

/// Skip backward: wraps to the last index from the start.
pub(crate) fn previous_index(current: usize, len: usize) -> usize {
    debug_assert!(len > 0 && current < len);
    if current == 0 {
        len - 1
    } else {
        current - 1
    }
}

/// Uniformly random index different from `current`. With a single entry
/// there is nothing else to pick, so `current` comes back.
pub(crate) fn random_other_index(current: usize, len: usize) -> usize {
    debug_assert!(len > 0 && current < len);
    if len == 1 {
        return current;
    }
    let mut index = rand::rng().random_range(0..len - 1);
    if index >= current {
        index += 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_cycles_back_to_start_in_exactly_len_steps() {
        for len in 2..8 {
            for start in 0..len {
                let mut index = start;
                let mut visited = Vec::new();
                for _ in 0..len {
                    index = next_index(index, len);
                    visited.push(index);
                }
                // (start+1) mod len, (start+2) mod len, ...
                for (step, visited_index) in visited.iter().enumerate() {
                    assert_eq!(*visited_index, (start + step + 1) % len);
                }
                assert_eq!(index, start);
            }
        }
    }

    #[test]
    fn previous_wraps_to_last() {
        for len in 2..8 {
            assert_eq!(previous_index(0, len), len - 1);
            for current in 1..len {
                assert_eq!(previous_index(current, len), current - 1);
            }
        }
    }

    #[test]
    fn random_other_never_repeats_current() {
        for _ in 0..200 {
            let index = random_other_index(2, 5);
            assert!(index < 5);
            assert_ne!(index, 2);
        }
    }

    #[test]
    fn random_other_covers_all_other_indices() {
        let mut seen = [false; 4];
        for _ in 0..400 {
            seen[random_other_index(1, 4)] = true;
        }
        assert!(seen[0] && seen[2] && seen[3]);
        assert!(!seen[1]);
    }

    #[test]
    fn random_other_with_single_entry_stays_put() {
        assert_eq!(random_other_index(0, 1), 0);
    }
}
