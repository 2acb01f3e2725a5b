use std::collections::HashSet;

use log::warn;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::directory::TrainerRecord;
use crate::metadata;
use crate::party::{self, Moveset, PokemonSlot};
use crate::pools::SpecialPool;
use crate::selector;
use crate::species::{StaticData, Type};
use crate::store::BlobStore;

/// Minimum roster for a mimic substitution.
pub const MIMIC_MIN_PARTY: usize = 4;
/// Minimum roster for a pivot substitution.
pub const PIVOT_MIN_PARTY: usize = 5;
/// Fulcrums require an exactly full roster, not merely a large one.
pub const FULCRUM_PARTY: usize = 6;

/// BST assumed for species missing from the stats table.
const DEFAULT_BST: u16 = 300;

/// Themed regular randomisation keeps replacements within this band before
/// falling back to any same-type species.
const GYM_THEME_BAND_PCT: f64 = 0.20;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    Unmodified,
    Modified,
}

#[derive(Copy, Clone, Debug)]
pub enum RegularMode {
    /// Stay within ±10% of the original species' BST.
    StatBand,
    /// Any non-blacklisted species.
    FullyRandom,
    /// Same-type substitution for trainers defending a themed gym.
    Themed(Type),
}

/// The three role pools, loaded once per run.
pub struct RolePools<'a> {
    pub mimic: &'a SpecialPool,
    pub pivot: &'a SpecialPool,
    pub fulcrum: &'a SpecialPool,
}

/// Everything a single trainer mutation needs besides the trainer itself.
pub struct MutationContext<'a> {
    pub data: &'a StaticData,
    pub pools: RolePools<'a>,
    /// Precomputed candidate pool for regular randomisation (blacklist and
    /// placeholder species already removed).
    pub replacement_pool: &'a [u16],
}

/// Per-trainer instructions: which roles to attempt, the theme type for
/// them, and whether (and how) the remaining slots get randomised.
#[derive(Copy, Clone, Debug, Default)]
pub struct TrainerPlan {
    pub mimic: bool,
    pub pivot: bool,
    pub fulcrum: bool,
    pub theme: Option<Type>,
    pub regular: Option<RegularMode>,
}

impl TrainerPlan {
    pub fn wants_roles(&self) -> bool {
        self.mimic || self.pivot || self.fulcrum
    }
}

/// Index of the slot with the strictly highest level. Two slots sharing the
/// maximum means there is no unique ace and role substitution must not run:
/// replacing a tied-for-strongest slot would risk swapping out the
/// trainer's signature Pokemon.
pub fn find_unique_ace(slots: &[PokemonSlot]) -> Option<usize> {
    let (best_idx, best) = slots
        .iter()
        .enumerate()
        .max_by_key(|(_, slot)| slot.level)?;

    let tied = slots
        .iter()
        .filter(|slot| slot.level == best.level)
        .count();

    if tied == 1 {
        Some(best_idx)
    } else {
        None
    }
}

fn bst_of(data: &StaticData, species: u16) -> u16 {
    data.bst(species).unwrap_or(DEFAULT_BST)
}

fn log_change(
    report: &mut String,
    record: &TrainerRecord,
    slot_idx: usize,
    tag: &str,
    old_species: u16,
    new_species: u16,
    data: &StaticData,
) {
    let old_bst = bst_of(data, old_species);
    let new_bst = bst_of(data, new_species);
    let pct = if old_bst > 0 {
        (new_bst as f64 - old_bst as f64) / old_bst as f64 * 100.0
    } else {
        0.0
    };

    report.push_str(&format!(
        "{:<4} {:<24} {:<2} {:<8} {:<12} {:<4} --> {:<12} {:<4} {:+.1}%\n",
        record.id,
        record.display_name(),
        slot_idx,
        tag,
        data.species_name(old_species),
        old_bst,
        data.species_name(new_species),
        new_bst,
        pct,
    ));
}

/// Attempt one role substitution: pick a random non-excluded slot, search
/// the role pool for the theme type, and swap the species in. The touched
/// index joins the exclusion set so later roles (and the regular pass) never
/// revisit it. A failed search leaves everything untouched.
fn apply_role(
    record: &mut TrainerRecord,
    tag: &str,
    pool: &SpecialPool,
    theme: Type,
    excluded: &mut HashSet<usize>,
    ctx: &MutationContext,
    rng: &mut StdRng,
    report: &mut String,
) -> bool {
    let candidates: Vec<usize> = (0..record.slots.len())
        .filter(|i| !excluded.contains(i))
        .collect();

    let &target = match candidates.choose(rng) {
        Some(idx) => idx,
        None => return false,
    };

    let old_species = record.slots[target].species;
    let target_bst = bst_of(ctx.data, old_species);

    let roster: HashSet<u16> = record.slots.iter().map(|s| s.species).collect();
    let replacement = selector::select_by_type_and_stat_band(
        ctx.data,
        theme,
        target_bst,
        pool,
        &roster,
        rng,
    );

    match replacement {
        Some(new_species) => {
            record.slots[target].species = new_species;
            excluded.insert(target);
            log_change(report, record, target, tag, old_species, new_species, ctx.data);
            true
        }
        None => false,
    }
}

fn select_regular(
    mode: RegularMode,
    original_species: u16,
    ctx: &MutationContext,
    rng: &mut StdRng,
) -> Option<u16> {
    let none_excluded = HashSet::new();
    let original_bst = bst_of(ctx.data, original_species);

    match mode {
        RegularMode::StatBand => selector::select_by_stat_band(
            ctx.data,
            original_bst,
            ctx.replacement_pool,
            &none_excluded,
            0.9,
            1.1,
            rng,
        ),
        RegularMode::FullyRandom => {
            selector::select_fully_random(ctx.replacement_pool, &none_excluded, rng)
        }
        RegularMode::Themed(ty) => {
            // Primary-type species first; thin pools open up to secondary
            // types before the band is applied.
            let mut type_pool = ctx.data.species_of_type(ty, false);
            if type_pool.len() < 5 {
                type_pool = ctx.data.species_of_type(ty, true);
            }
            if type_pool.is_empty() {
                return None;
            }

            selector::select_by_stat_band(
                ctx.data,
                original_bst,
                &type_pool,
                &none_excluded,
                1.0 - GYM_THEME_BAND_PCT,
                1.0 + GYM_THEME_BAND_PCT,
                rng,
            )
            .or_else(|| selector::select_fully_random(&type_pool, &none_excluded, rng))
        }
    }
}

/// Run the per-trainer mutation state machine: locate the ace, apply the
/// enabled roles in mimic → pivot → fulcrum order, then randomise the
/// remaining slots. The caller resyncs and persists on `Modified`.
pub fn mutate_trainer(
    record: &mut TrainerRecord,
    plan: &TrainerPlan,
    ctx: &MutationContext,
    rng: &mut StdRng,
    report: &mut String,
) -> Outcome {
    if record.slots.is_empty() {
        return Outcome::Unmodified;
    }

    let mut excluded: HashSet<usize> = HashSet::new();

    if plan.wants_roles() {
        // No unique ace, no role pass at all for this trainer.
        let ace = match find_unique_ace(&record.slots) {
            Some(ace) => ace,
            None => return Outcome::Unmodified,
        };
        excluded.insert(ace);
    }

    let mut changed = false;

    if let Some(theme) = plan.theme {
        if plan.wants_roles() {
            let size = record.slots.len();

            if plan.mimic && size >= MIMIC_MIN_PARTY {
                changed |= apply_role(
                    record, "mimic", ctx.pools.mimic, theme, &mut excluded, ctx, rng, report,
                );
            }
            if plan.pivot && size >= PIVOT_MIN_PARTY {
                changed |= apply_role(
                    record, "pivot", ctx.pools.pivot, theme, &mut excluded, ctx, rng, report,
                );
            }
            if plan.fulcrum && size == FULCRUM_PARTY {
                changed |= apply_role(
                    record, "fulcrum", ctx.pools.fulcrum, theme, &mut excluded, ctx, rng, report,
                );
            }
        }
    }

    if let Some(mode) = plan.regular {
        for i in 0..record.slots.len() {
            if excluded.contains(&i) {
                continue;
            }

            let original = record.slots[i].species;
            if original == 0
                || crate::species::is_blacklisted(original)
                || ctx.data.species_stats(original).is_none()
            {
                continue;
            }

            if let Some(new_species) = select_regular(mode, original, ctx, rng) {
                if new_species != original {
                    record.slots[i].species = new_species;
                    log_change(report, record, i, "random", original, new_species, ctx.data);
                    changed = true;
                }
            }
        }
    }

    if changed {
        Outcome::Modified
    } else {
        Outcome::Unmodified
    }
}

/// Re-encode the party blob and overwrite the metadata party-size cache with
/// the decoded slot count. This is the invariant the rest of the pipeline
/// relies on. Returns false when the metadata record could not be updated.
pub fn resync_trainer(
    party_store: &mut dyn BlobStore,
    meta_store: &mut dyn BlobStore,
    record: &TrainerRecord,
) -> bool {
    let blob = party::encode(&record.slots, record.has_moves);
    party_store.set(record.id, blob);

    let ok = metadata::write_party_size(meta_store, record.id, record.slots.len() as u8);
    if !ok {
        warn!(
            "trainer {}: party blob updated but metadata count could not be synced",
            record.id
        );
    }
    ok
}

fn mean_level(slots: &[PokemonSlot]) -> u16 {
    if slots.is_empty() {
        return 5;
    }
    let sum: u32 = slots.iter().map(|s| s.level as u32).sum();
    let mean = (sum / slots.len() as u32) as u16;
    mean.max(5)
}

fn mean_bst(data: &StaticData, slots: &[PokemonSlot]) -> u16 {
    if slots.is_empty() {
        return DEFAULT_BST;
    }
    let sum: u32 = slots.iter().map(|s| bst_of(data, s.species) as u32).sum();
    (sum / slots.len() as u32) as u16
}

/// Pick a species for a team-filling addition: near the team's mean BST,
/// preferring the trainer's theme type, falling back through progressively
/// looser criteria rather than giving up.
fn select_addition(
    target_bst: u16,
    theme: Option<Type>,
    use_bst: bool,
    existing: &HashSet<u16>,
    ctx: &MutationContext,
    rng: &mut StdRng,
) -> Option<u16> {
    let type_pool: Vec<u16> = theme
        .map(|ty| ctx.data.species_of_type(ty, true))
        .unwrap_or_default();

    if use_bst {
        let themed = selector::select_by_stat_band(
            ctx.data, target_bst, &type_pool, existing, 0.9, 1.1, rng,
        );
        if themed.is_some() {
            return themed;
        }

        let banded = selector::select_by_stat_band(
            ctx.data,
            target_bst,
            ctx.replacement_pool,
            existing,
            0.9,
            1.1,
            rng,
        );
        if banded.is_some() {
            return banded;
        }
    }

    selector::select_fully_random(&type_pool, existing, rng)
        .or_else(|| selector::select_fully_random(ctx.replacement_pool, existing, rng))
}

/// Collect the non-empty move ids already used by the party, as donor
/// material for the moves of an added slot.
fn party_move_options(slots: &[PokemonSlot]) -> Vec<u16> {
    slots
        .iter()
        .filter_map(|s| s.moveset.as_ref())
        .flat_map(|m| m.moves)
        .filter(|&mv| mv != 0)
        .collect()
}

/// Grow or shrink a trainer's roster to `target` members.
///
/// Shrinking truncates from the tail (the lead slots carry the trainer's
/// identity). Growing appends slots at the team's mean level with species
/// chosen near the team's mean BST, copying moves from existing members for
/// the wide-variant parties. Returns whether the roster changed; the caller
/// resyncs afterwards.
pub fn set_team_size(
    record: &mut TrainerRecord,
    target: usize,
    use_bst: bool,
    theme: Option<Type>,
    ctx: &MutationContext,
    rng: &mut StdRng,
    report: &mut String,
) -> bool {
    let current = record.slots.len();
    if current == target {
        return false;
    }

    if current > target {
        record.slots.truncate(target);
        report.push_str(&format!(
            "{:<4} {:<24} trimmed roster {} -> {}\n",
            record.id,
            record.display_name(),
            current,
            target,
        ));
        return true;
    }

    let level = mean_level(&record.slots);
    let target_bst = mean_bst(ctx.data, &record.slots);
    let move_options = party_move_options(&record.slots);
    let mut existing: HashSet<u16> = record.slots.iter().map(|s| s.species).collect();

    for _ in current..target {
        let species = match select_addition(target_bst, theme, use_bst, &existing, ctx, rng) {
            Some(species) => species,
            None => {
                warn!(
                    "trainer {}: no species available to grow roster past {}",
                    record.id,
                    record.slots.len()
                );
                break;
            }
        };
        existing.insert(species);

        let moveset = if record.has_moves {
            let mut moves = [0u16; 4];
            if !move_options.is_empty() {
                for slot in moves.iter_mut().take(3) {
                    *slot = *move_options.choose(rng).expect("non-empty move options");
                }
                moves.shuffle(rng);
            } else {
                // Bare-minimum kit for parties whose donors carry no moves.
                moves[0] = 33; // Tackle
                moves[1] = 45; // Growl
            }
            Some(Moveset { item: 0, moves })
        } else {
            None
        };

        record.slots.push(PokemonSlot {
            ivs: 50,
            ability_slot: 0,
            level,
            species,
            ball_seal: 0,
            moveset,
        });

        report.push_str(&format!(
            "{:<4} {:<24} added {} (lv {})\n",
            record.id,
            record.display_name(),
            ctx.data.species_name(species),
            level,
        ));
    }

    record.slots.len() != current
}
