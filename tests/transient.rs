use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rrb::{Error, Vector};

#[test]
fn transient_pushes_then_freeze() {
    let mut rng = StdRng::seed_from_u64(0x7247);
    let mut expected: Vec<u32> = Vec::with_capacity(13_000);
    let mut transient = Vector::new().to_transient();

    for i in 0..13_000usize {
        let value = rng.gen::<u32>();
        transient.push(value).unwrap();
        expected.push(value);
        assert_eq!(transient.len(), Ok(i + 1));
        assert_eq!(transient.nth(i), Ok(&expected[i]));
        // Every so often, re-read a prefix sample.
        if i % 977 == 0 {
            for probe in (0..=i).step_by(89) {
                assert_eq!(transient.nth(probe), Ok(&expected[probe]));
            }
        }
    }

    let frozen = transient.freeze().unwrap();
    assert_eq!(frozen.len(), expected.len());
    for (i, value) in expected.iter().enumerate() {
        assert_eq!(frozen.nth(i), Ok(value));
    }
    assert!(frozen.validate().is_ok());
}

#[test]
fn transient_pushes_onto_concatenated_and_sliced_vectors() {
    let mut rng = StdRng::seed_from_u64(0x7248);
    for _ in 0..120 {
        let size = rng.gen_range(1..320);
        let values: Vec<u32> = (0..size).map(|_| rng.gen_range(0..0x1000)).collect();
        let extra: Vec<u32> = (0..rng.gen_range(32..82))
            .map(|_| rng.gen_range(0..0x1000))
            .collect();

        // Build both halves transiently, then concatenate.
        let cut = rng.gen_range(0..size);
        let left: Vector<u32> = values[..cut].iter().copied().collect();
        let right: Vector<u32> = values[cut..].iter().copied().collect();
        let cat = left.concat(&right);

        let mut transient = cat.to_transient();
        for &value in &extra {
            transient.push(value).unwrap();
        }
        assert_eq!(transient.len(), Ok(size + extra.len()));
        for (i, value) in values.iter().enumerate() {
            assert_eq!(transient.nth(i), Ok(value));
            // Mutating the transient must not have flooded into the
            // persistent source.
            assert_eq!(cat.nth(i), Ok(value));
        }
        for (i, value) in extra.iter().enumerate() {
            assert_eq!(transient.nth(size + i), Ok(value));
        }
        let pushed = transient.freeze().unwrap();
        assert!(pushed.validate().is_ok());

        // The same again on a slice of the concatenation.
        let from = rng.gen_range(0..size);
        let to = rng.gen_range(from..=size);
        let slice = cat.slice(from, to);
        let mut transient = slice.to_transient();
        for &value in &extra {
            transient.push(value).unwrap();
        }
        for i in 0..slice.len() {
            assert_eq!(transient.nth(i), Ok(&values[from + i]));
            assert_eq!(slice.nth(i), Ok(&values[from + i]));
        }
        for (i, value) in extra.iter().enumerate() {
            assert_eq!(transient.nth(slice.len() + i), Ok(value));
        }
        let pushed = transient.freeze().unwrap();
        assert!(pushed.validate().is_ok());
    }
}

#[test]
fn transient_pops_mirror_persistent_pops() {
    let mut rng = StdRng::seed_from_u64(0x7249);
    for _ in 0..60 {
        let size = rng.gen_range(1..3_000);
        let values: Vec<u32> = (0..size).map(|_| rng.gen()).collect();
        let v: Vector<u32> = values.iter().copied().collect();

        let pops = rng.gen_range(0..=size);
        let mut transient = v.to_transient();
        for _ in 0..pops {
            transient.pop().unwrap();
        }
        let frozen = transient.freeze().unwrap();

        assert_eq!(frozen.len(), size - pops);
        for (i, value) in values[..size - pops].iter().enumerate() {
            assert_eq!(frozen.nth(i), Ok(value));
        }
        assert!(frozen.validate().is_ok());
    }
}

#[test]
fn transient_updates_land_in_the_frozen_result() {
    let mut rng = StdRng::seed_from_u64(0x724A);
    let size = 20_000;
    let mut mirror: Vec<u32> = (0..size as u32).collect();
    let v: Vector<u32> = mirror.iter().copied().collect();

    let mut transient = v.to_transient();
    for _ in 0..10_000 {
        let at = rng.gen_range(0..size);
        let value = rng.gen::<u32>();
        transient.update(at, value).unwrap();
        mirror[at] = value;
    }
    let frozen = transient.freeze().unwrap();
    for (i, value) in mirror.iter().enumerate() {
        assert_eq!(frozen.nth(i), Ok(value));
    }
    // The source is untouched.
    for i in 0..size {
        assert_eq!(v.nth(i), Ok(&(i as u32)));
    }
    assert!(frozen.validate().is_ok());
}

#[test]
fn freeze_round_trip_equals_source() {
    let v: Vector<u32> = (0..50_000u32).collect();
    let frozen = v.to_transient().freeze().unwrap();
    assert_eq!(frozen, v);
}

#[test]
fn operations_after_freeze_fail() {
    let mut transient = Vector::<u32>::new().to_transient();
    transient.push(7).unwrap();
    let _ = transient.freeze().unwrap();

    assert_eq!(transient.push(8), Err(Error::MisusedTransient));
    assert_eq!(transient.pop(), Err(Error::MisusedTransient));
    assert_eq!(transient.update(0, 9), Err(Error::MisusedTransient));
    assert_eq!(transient.nth(0), Err(Error::MisusedTransient));
    assert_eq!(transient.peek(), Err(Error::MisusedTransient));
    assert_eq!(transient.len(), Err(Error::MisusedTransient));
    assert_eq!(transient.freeze().unwrap_err(), Error::MisusedTransient);
}
