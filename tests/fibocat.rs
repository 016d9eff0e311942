//! Fibonacci-style concatenation chains: every vector past the seeds is
//! the concatenation of two earlier ones, so structural sharing compounds
//! across generations.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rrb::Vector;

const COUNT: usize = 2_600;
const SEEDS: usize = 200;
const MAX_SEED_LEN: usize = 16;

#[test]
fn every_link_of_the_chain_is_a_juxtaposition() {
    let mut rng = StdRng::seed_from_u64(0xF1B0);
    let mut vectors: Vec<Vector<u32>> = Vec::with_capacity(COUNT);

    for _ in 0..SEEDS {
        let len = rng.gen_range(0..MAX_SEED_LEN);
        let seed: Vector<u32> = (0..len).map(|_| rng.gen_range(0..0x10000)).collect();
        vectors.push(seed);
    }
    for i in SEEDS..COUNT {
        let joined = vectors[i - SEEDS].concat(&vectors[i - SEEDS + 1]);
        vectors.push(joined);
    }

    for i in SEEDS..COUNT {
        let merged = &vectors[i];
        let left = &vectors[i - SEEDS];
        let right = &vectors[i - SEEDS + 1];
        assert_eq!(merged.len(), left.len() + right.len(), "vector {}", i);

        let mut merged_idx = 0;
        for left_idx in 0..left.len() {
            assert_eq!(
                merged.nth(merged_idx),
                left.nth(left_idx),
                "vector {}, left element {}",
                i,
                left_idx
            );
            merged_idx += 1;
        }
        for right_idx in 0..right.len() {
            assert_eq!(
                merged.nth(merged_idx),
                right.nth(right_idx),
                "vector {}, right element {}",
                i,
                right_idx
            );
            merged_idx += 1;
        }
    }

    // The late generations have been concatenated a dozen times over;
    // their trees must still be sound.
    for merged in &vectors[COUNT - SEEDS..] {
        assert!(merged.validate().is_ok());
    }
}
