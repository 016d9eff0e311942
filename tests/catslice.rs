//! Interleaved concatenation and slicing, the combination that exercises
//! size-table maintenance hardest.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rrb::Vector;

fn random_vector(rng: &mut StdRng, max_len: usize) -> (Vector<u32>, Vec<u32>) {
    let len = rng.gen_range(0..max_len);
    let values: Vec<u32> = (0..len).map(|_| rng.gen_range(0..0x10000)).collect();
    (values.iter().copied().collect(), values)
}

#[test]
fn slices_of_concatenations() {
    let mut rng = StdRng::seed_from_u64(0xCA75);
    for _ in 0..80 {
        let (left, mut mirror) = random_vector(&mut rng, 2_000);
        let (right, right_mirror) = random_vector(&mut rng, 2_000);
        mirror.extend_from_slice(&right_mirror);

        let joined = left.concat(&right);
        if mirror.is_empty() {
            assert!(joined.is_empty());
            continue;
        }
        let from = rng.gen_range(0..mirror.len());
        let to = rng.gen_range(from..=mirror.len());
        let sliced = joined.slice(from, to);

        assert_eq!(sliced.len(), to - from);
        for (i, expected) in mirror[from..to].iter().enumerate() {
            assert_eq!(sliced.nth(i), Ok(expected));
        }
        assert!(sliced.validate().is_ok());
    }
}

#[test]
fn concatenations_of_slices() {
    let mut rng = StdRng::seed_from_u64(0x5CA7);
    for _ in 0..80 {
        let (source, mirror) = random_vector(&mut rng, 4_000);
        if mirror.len() < 2 {
            continue;
        }
        let cut_a = rng.gen_range(0..mirror.len());
        let cut_b = rng.gen_range(0..mirror.len());
        let (lo, hi) = (cut_a.min(cut_b), cut_a.max(cut_b));

        // Rebuild the vector from three slices of itself.
        let rebuilt = source
            .slice(0, lo)
            .concat(&source.slice(lo, hi))
            .concat(&source.slice(hi, mirror.len()));

        assert_eq!(rebuilt.len(), mirror.len());
        for (i, expected) in mirror.iter().enumerate() {
            assert_eq!(rebuilt.nth(i), Ok(expected));
        }
        assert!(rebuilt.validate().is_ok());
    }
}

#[test]
fn pushes_keep_working_after_catslice() {
    let mut rng = StdRng::seed_from_u64(0x715);
    for _ in 0..40 {
        let (left, mut mirror) = random_vector(&mut rng, 1_500);
        let (right, right_mirror) = random_vector(&mut rng, 1_500);
        mirror.extend_from_slice(&right_mirror);

        let joined = left.concat(&right);
        let from = rng.gen_range(0..=mirror.len());
        let to = rng.gen_range(from..=mirror.len());
        let mut v = joined.slice(from, to);
        let mut model: Vec<u32> = mirror[from..to].to_vec();

        for _ in 0..rng.gen_range(1..200) {
            let value = rng.gen::<u32>();
            v = v.push(value);
            model.push(value);
        }
        assert_eq!(v.len(), model.len());
        for (i, expected) in model.iter().enumerate() {
            assert_eq!(v.nth(i), Ok(expected));
        }
        assert!(v.validate().is_ok());
    }
}
