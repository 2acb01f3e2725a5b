use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod bosses;
pub mod directory;
pub mod metadata;
pub mod mutator;
pub mod party;
pub mod pools;
pub mod selector;
pub mod species;
pub mod store;

use bosses::TypeAssignment;
use directory::TrainerRecord;
use mutator::{MutationContext, Outcome, RegularMode, RolePools, TrainerPlan};
use pools::SpecialPool;
use species::{StaticData, Type};
use store::DirStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomiserSettings {
    pub seed: u64,
    pub adjust_boss_teams: bool,
    pub boss_team_size: u8,
    pub scale_boss_teams: bool,
    pub use_bst: bool,
    pub randomize_trainers: bool,
    pub use_mimics: bool,
    pub use_pivots: bool,
    pub use_fulcrums: bool,
    pub randomize_gym_types: bool,
    pub theme_gyms: bool,
    pub debug: bool,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

#[derive(Debug, Error)]
pub enum RandomiserError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("name resolution error: {0}")]
    NameResolution(String),
}

pub type Result<T> = std::result::Result<T, RandomiserError>;

// Input dump layout: one directory of NNNN.bin blobs per extracted
// container, plus the text tables the build tree carries.
const PARTY_DIR: &str = "trainer_party";
const METADATA_DIR: &str = "trainer_data";
const MONDATA_DIR: &str = "mondata";
const MOVES_DIR: &str = "moves";

const SPECIES_NAME_CANDIDATES: &[&str] = &["pokemon_names.txt", "build/rawtext/237.txt"];
const TRAINER_NAME_CANDIDATES: &[&str] = &["trainers.s", "armips/data/trainers/trainers.s"];
const MIMIC_POOL_CANDIDATES: &[&str] =
    &["data/type_mimics_with_prevos.txt", "data/type_mimics.txt"];
const PIVOT_POOL_CANDIDATES: &[&str] = &["data/pivot_analysis.txt", "data/pivots.txt"];
const FULCRUM_POOL_CANDIDATES: &[&str] = &["data/fulcrumsmonlist.txt", "data/fulcrums.txt"];

const GYM_TYPES_FILE: &str = "gym_types.json";
const SPOILER_LOG_FILE: &str = "spoiler_log.txt";

fn join_candidate(base: &Path, candidate: &str) -> PathBuf {
    let mut path = base.to_path_buf();
    for part in candidate.split(['/', '\\']) {
        if !part.is_empty() {
            path.push(part);
        }
    }
    path
}

fn find_first_existing(base: &Path, candidates: &[&str]) -> Option<PathBuf> {
    for candidate in candidates {
        let path = join_candidate(base, candidate);
        if path.exists() {
            return Some(path);
        }
    }
    None
}

fn load_pool(
    base: &Path,
    candidates: &[&str],
    data: &StaticData,
    label: &str,
) -> Result<SpecialPool> {
    match find_first_existing(base, candidates) {
        Some(path) => SpecialPool::load(&path, data),
        None => {
            warn!(
                "no {} pool file under input path; {} substitutions will be skipped",
                label, label
            );
            Ok(SpecialPool::default())
        }
    }
}

/// Target roster size for a boss or rival battle. Scaling keeps the story's
/// difficulty curve: the first two gyms stay at four, the first rival fight
/// is the lone starter and the second a partial team.
fn boss_target_size(settings: &RandomiserSettings, trainer_id: usize) -> usize {
    let base = settings.boss_team_size.clamp(1, 6) as usize;
    if !settings.scale_boss_teams {
        return base;
    }

    match trainer_id {
        20 | 21 => base.min(4), // Falkner, Bugsy
        112 => 1,               // first rival battle: just the starter
        113 => base.min(4),     // second rival battle
        _ => base,
    }
}

/// The theme applied to every trainer defending a themed gym, keyed by
/// trainer id. The roster's leader (last entry) decides the gym's type via
/// the dynamic assignment, falling back to the leader's static type.
fn gym_theme_map(
    rosters: &HashMap<&'static str, Vec<(&'static str, usize)>>,
    assignment: Option<&TypeAssignment>,
) -> HashMap<usize, Type> {
    let mut themes = HashMap::new();

    for entries in rosters.values() {
        let leader_id = match entries.last() {
            Some(&(_, id)) => id,
            None => continue,
        };
        let theme = match bosses::effective_type(assignment, leader_id) {
            Some(theme) => theme,
            None => continue,
        };

        for &(_, id) in entries {
            themes.insert(id, theme);
        }
    }

    themes
}

fn plan_for(
    record: &TrainerRecord,
    settings: &RandomiserSettings,
    assignment: Option<&TypeAssignment>,
    gym_themes: &HashMap<usize, Type>,
) -> TrainerPlan {
    if bosses::is_boss(record.id) {
        // Boss rosters are curated: only the themed role swaps touch them,
        // never the regular randomisation pass.
        return TrainerPlan {
            mimic: settings.use_mimics,
            pivot: settings.use_pivots,
            fulcrum: settings.use_fulcrums,
            theme: bosses::effective_type(assignment, record.id),
            regular: None,
        };
    }

    if settings.randomize_trainers {
        let mode = match gym_themes.get(&record.id) {
            Some(&theme) => RegularMode::Themed(theme),
            None if settings.use_bst => RegularMode::StatBand,
            None => RegularMode::FullyRandom,
        };
        return TrainerPlan {
            regular: Some(mode),
            ..Default::default()
        };
    }

    TrainerPlan::default()
}

pub fn run(settings: RandomiserSettings) -> Result<()> {
    if !settings.input_path.exists() {
        return Err(RandomiserError::Config(format!(
            "Input path does not exist: {}",
            settings.input_path.display()
        )));
    }

    // Per-seed output folder so multiple runs never collide and a later
    // pipeline stage can find this run's gym type assignment.
    let out_root = settings
        .output_path
        .join(format!("Cherrygrove_{}", settings.seed));
    fs::create_dir_all(&out_root)?;

    let mut party_store = DirStore::open(&settings.input_path.join(PARTY_DIR))?;
    let mut meta_store = DirStore::open(&settings.input_path.join(METADATA_DIR))?;
    let mondata_store = DirStore::open(&settings.input_path.join(MONDATA_DIR))?;

    let species_names_path = find_first_existing(&settings.input_path, SPECIES_NAME_CANDIDATES)
        .ok_or_else(|| {
            RandomiserError::Config(
                "Could not find the species name table under the input path".to_string(),
            )
        })?;
    let species_names = species::read_species_names(&species_names_path)?;

    let moves = match DirStore::open(&settings.input_path.join(MOVES_DIR)) {
        Ok(store) => StaticData::load_moves(&store),
        Err(_) => {
            warn!("no move data under input path; move lookups will be absent");
            Vec::new()
        }
    };
    let data = StaticData::new(
        StaticData::load_species(&mondata_store, &species_names),
        moves,
    );

    let trainer_names = match find_first_existing(&settings.input_path, TRAINER_NAME_CANDIDATES) {
        Some(path) => directory::read_trainer_names(&path)?,
        None => {
            warn!("no trainer name table under input path");
            Default::default()
        }
    };

    // A gym roster name that cannot be resolved would desynchronise every
    // later "which gym is this" decision, so this aborts the whole run.
    let gym_rosters = if settings.theme_gyms {
        Some(directory::resolve_gym_trainers(&trainer_names)?)
    } else {
        None
    };

    let gym_types_path = out_root.join(GYM_TYPES_FILE);
    let assignment = if settings.randomize_gym_types {
        let mut gym_rng = StdRng::seed_from_u64(settings.seed ^ 0x4759_4D54_u64);
        let assignment = TypeAssignment::generate(settings.seed, &mut gym_rng);
        assignment.save(&gym_types_path)?;
        Some(assignment)
    } else {
        // An earlier pipeline stage may have written an assignment for this
        // seed; absent or malformed files fall back to the static table.
        TypeAssignment::load(&gym_types_path)
    };

    let mimic_pool = load_pool(&settings.input_path, MIMIC_POOL_CANDIDATES, &data, "mimic")?;
    let pivot_pool = load_pool(&settings.input_path, PIVOT_POOL_CANDIDATES, &data, "pivot")?;
    let fulcrum_pool = load_pool(&settings.input_path, FULCRUM_POOL_CANDIDATES, &data, "fulcrum")?;

    let replacement_pool = data.replacement_pool();
    let ctx = MutationContext {
        data: &data,
        pools: RolePools {
            mimic: &mimic_pool,
            pivot: &pivot_pool,
            fulcrum: &fulcrum_pool,
        },
        replacement_pool: &replacement_pool,
    };

    let gym_themes = gym_rosters
        .as_ref()
        .map(|rosters| gym_theme_map(rosters, assignment.as_ref()))
        .unwrap_or_default();

    let mut records = directory::load_all(&party_store, &meta_store, &trainer_names);

    let mut report = format!("Cherrygrove seed: {}\n", settings.seed);
    report.push_str(&format!(
        "{:<4} {:<24} {:<2} {:<8} {:<12} {:<4} --> {:<12} {:<4} {:<6}\n",
        "ID", "Trainer", "#", "Pass", "Original", "BST", "Replacement", "BST", "Diff%",
    ));
    report.push_str(&"-".repeat(96));
    report.push('\n');

    let mut rng = StdRng::seed_from_u64(settings.seed ^ 0x5452_4E52_u64);
    let mut modified_count = 0usize;

    for record in &mut records {
        let id = record.id;
        let mut changed = false;

        if settings.adjust_boss_teams && (bosses::is_boss(id) || bosses::is_rival_battle(id)) {
            let target = boss_target_size(&settings, id);
            let theme = bosses::effective_type(assignment.as_ref(), id);
            changed |= mutator::set_team_size(
                record,
                target,
                settings.use_bst,
                theme,
                &ctx,
                &mut rng,
                &mut report,
            );
        }

        let plan = plan_for(record, &settings, assignment.as_ref(), &gym_themes);
        if plan.wants_roles() || plan.regular.is_some() {
            if mutate_one(record, &plan, &ctx, &mut rng, &mut report) == Outcome::Modified {
                changed = true;
            }
        }

        if changed {
            mutator::resync_trainer(&mut party_store, &mut meta_store, record);
            modified_count += 1;
        }
    }

    report.push_str(&format!("\nmodified trainers: {}\n", modified_count));
    info!("modified {} of {} trainers", modified_count, records.len());

    // The dump-level save happens only after every trainer was attempted.
    party_store.save_to(&out_root.join(PARTY_DIR))?;
    meta_store.save_to(&out_root.join(METADATA_DIR))?;

    if settings.debug {
        fs::write(out_root.join(SPOILER_LOG_FILE), report)?;
    }

    Ok(())
}

/// One trainer's mutation, isolated so a misbehaving record cannot take the
/// rest of the run down with it: a panic is logged against the trainer id
/// and the record is treated as untouched.
fn mutate_one(
    record: &mut TrainerRecord,
    plan: &TrainerPlan,
    ctx: &MutationContext,
    rng: &mut StdRng,
    report: &mut String,
) -> Outcome {
    let id = record.id;
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        mutator::mutate_trainer(record, plan, ctx, rng, report)
    }));

    match result {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!("trainer {}: mutation failed, keeping original data", id);
            Outcome::Unmodified
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::{run, RandomiserSettings};
    use crate::metadata;
    use crate::party::{decode, encode, PokemonSlot};
    use crate::store::{BlobStore, DirStore};

    fn species_record(stats: [u8; 6], type1: u8, type2: u8) -> Vec<u8> {
        let mut rec = stats.to_vec();
        rec.push(type1);
        rec.push(type2);
        rec.extend_from_slice(&[0u8; 20]);
        rec
    }

    fn meta_record(party_size: u8) -> Vec<u8> {
        let mut rec = vec![0u8, 0, 0, party_size];
        rec.extend_from_slice(&[0u8; 16]);
        rec
    }

    fn write_dump(root: &PathBuf) {
        let party_dir = root.join("trainer_party");
        let meta_dir = root.join("trainer_data");
        let mondata_dir = root.join("mondata");
        for dir in [&party_dir, &meta_dir, &mondata_dir] {
            fs::create_dir_all(dir).unwrap();
        }

        // Species 0 is the placeholder; 1..=4 are usable Normal types with
        // BSTs close enough for band-mode substitution.
        let names = ["-----", "Alpha", "Beta", "Gamma", "Delta"];
        fs::write(root.join("pokemon_names.txt"), names.join("\n")).unwrap();
        for (id, _) in names.iter().enumerate() {
            let rec = if id == 0 {
                species_record([0; 6], 0, 0)
            } else {
                species_record([50, 50, 50, 50, 50, 50 + id as u8], 0, 0)
            };
            fs::write(mondata_dir.join(format!("{:04}.bin", id)), rec).unwrap();
        }

        // Trainer 0: empty party. Trainer 20 (Falkner): two Pokemon, with
        // the metadata byte deliberately desynced (claims 3).
        fs::write(party_dir.join("0000.bin"), Vec::new()).unwrap();
        let party = vec![PokemonSlot::new(1, 10), PokemonSlot::new(2, 12)];
        fs::write(party_dir.join("0020.bin"), encode(&party, false)).unwrap();

        fs::write(meta_dir.join("0000.bin"), meta_record(0)).unwrap();
        fs::write(meta_dir.join("0020.bin"), meta_record(3)).unwrap();

        fs::write(
            root.join("trainers.s"),
            "trainerdata 0, \"-\"\ntrainerdata 20, \"Falkner\"\n",
        )
        .unwrap();
    }

    #[test]
    fn run_grows_a_boss_team_and_restores_the_size_invariant() {
        let root = std::env::temp_dir().join(format!("cherrygrove-run-{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        let input = root.join("input");
        let output = root.join("output");
        write_dump(&input);

        let settings = RandomiserSettings {
            seed: 1234,
            adjust_boss_teams: true,
            boss_team_size: 4,
            scale_boss_teams: false,
            use_bst: false,
            randomize_trainers: false,
            use_mimics: false,
            use_pivots: false,
            use_fulcrums: false,
            randomize_gym_types: false,
            theme_gyms: false,
            debug: true,
            input_path: input,
            output_path: output.clone(),
        };

        run(settings).unwrap();

        let out_root = output.join("Cherrygrove_1234");
        let party_store = DirStore::open(&out_root.join("trainer_party")).unwrap();
        let meta_store = DirStore::open(&out_root.join("trainer_data")).unwrap();

        // Falkner grew from two to four, so the desynced metadata byte must
        // now match the actual decoded count.
        let (slots, has_moves) = decode(party_store.get(20).unwrap(), None);
        assert_eq!(slots.len(), 4);
        assert!(!has_moves);
        assert_eq!(metadata::read_party_size(&meta_store, 20), 4);

        // The two originals keep their lead slots; additions avoid the
        // placeholder species and duplicate picks.
        assert_eq!(slots[0].species, 1);
        assert_eq!(slots[1].species, 2);
        assert!(slots[2..].iter().all(|s| (3..=4).contains(&s.species)));
        assert_ne!(slots[2].species, slots[3].species);

        assert!(out_root.join("spoiler_log.txt").exists());

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn run_rejects_a_missing_input_path() {
        let settings = RandomiserSettings {
            seed: 1,
            adjust_boss_teams: false,
            boss_team_size: 6,
            scale_boss_teams: false,
            use_bst: false,
            randomize_trainers: false,
            use_mimics: false,
            use_pivots: false,
            use_fulcrums: false,
            randomize_gym_types: false,
            theme_gyms: false,
            debug: false,
            input_path: PathBuf::from("/nonexistent/cherrygrove"),
            output_path: std::env::temp_dir(),
        };

        assert!(run(settings).is_err());
    }
}
