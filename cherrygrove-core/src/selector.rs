use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::pools::SpecialPool;
use crate::species::{StaticData, Type};

/// BST tolerance of the preferred tier of the themed search.
pub const PRIMARY_BAND_PCT: f64 = 0.10;
/// BST tolerance of the widened fallback tier.
pub const FALLBACK_BAND_PCT: f64 = 0.50;

/// Uniform choice from `pool` restricted to a single BST band around
/// `original_bst`, minus `excluded`. Returns `None` when the band is empty;
/// callers wanting a wider net retry with different tolerances themselves,
/// this function never widens on its own.
pub fn select_by_stat_band(
    data: &StaticData,
    original_bst: u16,
    pool: &[u16],
    excluded: &HashSet<u16>,
    tolerance_low: f64,
    tolerance_high: f64,
    rng: &mut StdRng,
) -> Option<u16> {
    let min_bst = original_bst as f64 * tolerance_low;
    let max_bst = original_bst as f64 * tolerance_high;

    let candidates: Vec<u16> = pool
        .iter()
        .copied()
        .filter(|id| !excluded.contains(id))
        .filter(|&id| {
            data.bst(id)
                .map_or(false, |bst| (bst as f64) >= min_bst && (bst as f64) <= max_bst)
        })
        .collect();

    candidates.choose(rng).copied()
}

/// Themed replacement search used for the mimic/pivot/fulcrum roles.
///
/// The tier ordering is a contract: the tightest viable match always wins.
/// 1. candidates of the type within ±10% BST of the original;
/// 2. same candidates within ±50%;
/// 3. any non-excluded candidate of the type, BST ignored;
/// 4. `None`: the type has no pool entry, or every candidate is excluded.
pub fn select_by_type_and_stat_band(
    data: &StaticData,
    ty: Type,
    original_bst: u16,
    pool: &SpecialPool,
    excluded: &HashSet<u16>,
    rng: &mut StdRng,
) -> Option<u16> {
    let candidates = pool.candidates(ty)?;

    let tight = select_by_stat_band(
        data,
        original_bst,
        candidates,
        excluded,
        1.0 - PRIMARY_BAND_PCT,
        1.0 + PRIMARY_BAND_PCT,
        rng,
    );
    if tight.is_some() {
        return tight;
    }

    let wide = select_by_stat_band(
        data,
        original_bst,
        candidates,
        excluded,
        1.0 - FALLBACK_BAND_PCT,
        1.0 + FALLBACK_BAND_PCT,
        rng,
    );
    if wide.is_some() {
        return wide;
    }

    select_fully_random(candidates, excluded, rng)
}

/// Uniform choice over `pool` minus `excluded`, with no stat constraint.
pub fn select_fully_random(
    pool: &[u16],
    excluded: &HashSet<u16>,
    rng: &mut StdRng,
) -> Option<u16> {
    let candidates: Vec<u16> = pool
        .iter()
        .copied()
        .filter(|id| !excluded.contains(id))
        .collect();
    candidates.choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::{select_by_stat_band, select_by_type_and_stat_band, select_fully_random};
    use crate::pools::SpecialPool;
    use crate::species::{SpeciesStats, StaticData, Type};

    fn mono(name: &str, bst: u16, ty: Type) -> Option<SpeciesStats> {
        Some(SpeciesStats {
            name: name.into(),
            bst,
            type1: ty,
            type2: None,
        })
    }

    fn test_data() -> StaticData {
        let species = vec![
            None,
            mono("A", 300, Type::Water), // 1
            mono("B", 310, Type::Water), // 2
            mono("C", 600, Type::Water), // 3
            mono("D", 450, Type::Water), // 4
            mono("E", 305, Type::Fire),  // 5
        ];
        StaticData::new(species, Vec::new())
    }

    fn water_pool(data: &StaticData, ids: &[u16]) -> SpecialPool {
        let names: Vec<String> = ids
            .iter()
            .map(|&id| data.species_stats(id).unwrap().name.clone())
            .collect();
        let text = format!("[WATER]\n{}\n", names.join("\n"));
        SpecialPool::parse(&text, data)
    }

    #[test]
    fn stat_band_is_a_single_band() {
        let data = test_data();
        let pool = [1u16, 2, 3];
        let excluded = HashSet::new();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..32 {
            let got =
                select_by_stat_band(&data, 300, &pool, &excluded, 0.9, 1.1, &mut rng).unwrap();
            assert!(got == 1 || got == 2, "600-BST candidate leaked into the band");
        }
    }

    #[test]
    fn stat_band_exhausted_pool_returns_none() {
        let data = test_data();
        let pool = [1u16, 2, 3];
        let excluded: HashSet<u16> = pool.iter().copied().collect();
        let mut rng = StdRng::seed_from_u64(7);

        assert_eq!(
            select_by_stat_band(&data, 300, &pool, &excluded, 0.9, 1.1, &mut rng),
            None
        );
    }

    #[test]
    fn tier_one_always_preferred_when_nonempty() {
        let data = test_data();
        // Species 2 (310) is within ±10% of 300; species 3 (600) is not.
        let pool = water_pool(&data, &[2, 3]);
        let excluded = HashSet::new();

        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let got =
                select_by_type_and_stat_band(&data, Type::Water, 300, &pool, &excluded, &mut rng);
            assert_eq!(got, Some(2));
        }
    }

    #[test]
    fn tier_three_rescues_a_double_bst_candidate() {
        let data = test_data();
        // The only candidate sits at 200% of the target BST: rejected by
        // both bands, still returned by the any-of-type tier.
        let pool = water_pool(&data, &[3]);
        let excluded = HashSet::new();
        let mut rng = StdRng::seed_from_u64(1);

        let got = select_by_type_and_stat_band(&data, Type::Water, 300, &pool, &excluded, &mut rng);
        assert_eq!(got, Some(3));
    }

    #[test]
    fn tier_two_beats_tier_three() {
        let data = test_data();
        // 450 is within ±50% of 300, 600 is not: the widened band must win
        // before the unconstrained tier can pick 600.
        let pool = water_pool(&data, &[3, 4]);
        let excluded = HashSet::new();

        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let got =
                select_by_type_and_stat_band(&data, Type::Water, 300, &pool, &excluded, &mut rng);
            assert_eq!(got, Some(4));
        }
    }

    #[test]
    fn missing_type_entry_gives_none() {
        let data = test_data();
        let pool = water_pool(&data, &[1]);
        let excluded = HashSet::new();
        let mut rng = StdRng::seed_from_u64(1);

        let got = select_by_type_and_stat_band(&data, Type::Grass, 300, &pool, &excluded, &mut rng);
        assert_eq!(got, None);
    }

    #[test]
    fn fully_excluded_type_pool_gives_none() {
        let data = test_data();
        let pool = water_pool(&data, &[1, 2]);
        let excluded: HashSet<u16> = [1u16, 2].into_iter().collect();
        let mut rng = StdRng::seed_from_u64(1);

        let got = select_by_type_and_stat_band(&data, Type::Water, 300, &pool, &excluded, &mut rng);
        assert_eq!(got, None);
    }

    #[test]
    fn fully_random_respects_exclusions() {
        let pool = [5u16, 6, 7];
        let excluded: HashSet<u16> = [5u16, 7].into_iter().collect();
        let mut rng = StdRng::seed_from_u64(3);

        assert_eq!(select_fully_random(&pool, &excluded, &mut rng), Some(6));

        let all: HashSet<u16> = pool.iter().copied().collect();
        assert_eq!(select_fully_random(&pool, &all, &mut rng), None);
    }

    #[test]
    fn same_seed_reproduces_the_same_choice() {
        let data = test_data();
        let pool = [1u16, 2, 4];
        let excluded = HashSet::new();

        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        for _ in 0..8 {
            assert_eq!(
                select_by_stat_band(&data, 320, &pool, &excluded, 0.5, 1.5, &mut a),
                select_by_stat_band(&data, 320, &pool, &excluded, 0.5, 1.5, &mut b),
            );
        }
    }
}
