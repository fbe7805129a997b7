//! Reproducible random stimulus.
//!
//! Given the same seed, [`random_inputs`] produces the same input sequence,
//! so a failing property check can be replayed exactly.

use std::collections::BTreeMap;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use rtlkit_core::{Block, VectorKind};

/// Generates a random value of `width` bits.
///
/// About 30% of draws are boundary values (0, 1 and all-ones).
pub fn random_value(width: u32, rng: &mut ChaCha8Rng) -> u64 {
    let max = if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    };
    if rng.gen_ratio(3, 10) {
        let boundaries = [0, 1, max];
        boundaries[rng.gen_range(0..boundaries.len())]
    } else {
        rng.gen::<u64>() & max
    }
}

/// Generates `cycles` cycles of values for every input of `block`.
pub fn random_inputs(block: &Block, seed: u64, cycles: usize) -> Vec<BTreeMap<String, u64>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let inputs: Vec<(String, u32)> = block
        .vectors()
        .filter(|(_, info)| info.kind == VectorKind::Input)
        .map(|(_, info)| (info.name.clone(), info.width))
        .collect();

    (0..cycles)
        .map(|_| {
            inputs
                .iter()
                .map(|(name, width)| (name.clone(), random_value(*width, &mut rng)))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stimulus() {
        let mut block = Block::new();
        let a = block.input("a", 3).unwrap();
        let b = block.input("b", 1).unwrap();
        let o = block.output("o", 3).unwrap();
        let both = block.and(a, b).unwrap();
        block.connect(o, both).unwrap();

        let first = random_inputs(&block, 42, 16);
        let second = random_inputs(&block, 42, 16);
        assert_eq!(first, second);
        assert_eq!(first.len(), 16);
        for cycle in &first {
            assert_eq!(cycle.len(), 2);
            assert!(cycle["a"] < 8);
            assert!(cycle["b"] < 2);
        }
    }

    #[test]
    fn values_fit_their_width() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for width in [1, 5, 63, 64] {
            for _ in 0..200 {
                let v = random_value(width, &mut rng);
                assert!(rtlkit_core::vector::fits_in(v, width));
            }
        }
    }
}
