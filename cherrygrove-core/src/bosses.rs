use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::warn;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::species::{Type, ALL_TYPES};
use crate::Result;

#[derive(Copy, Clone, Debug)]
pub struct BossTrainer {
    pub id: usize,
    pub name: &'static str,
    pub preferred_type: Type,
}

/// Gym leaders and Elite Four, with the type their vanilla roster is themed
/// around. Rematch battles (ids 701-727) are intentionally absent.
pub const BOSS_TRAINERS: &[BossTrainer] = &[
    // Johto gym leaders
    BossTrainer { id: 20, name: "Falkner", preferred_type: Type::Flying },
    BossTrainer { id: 21, name: "Bugsy", preferred_type: Type::Bug },
    BossTrainer { id: 30, name: "Whitney", preferred_type: Type::Normal },
    BossTrainer { id: 31, name: "Morty", preferred_type: Type::Ghost },
    BossTrainer { id: 34, name: "Chuck", preferred_type: Type::Fighting },
    BossTrainer { id: 33, name: "Jasmine", preferred_type: Type::Steel },
    BossTrainer { id: 32, name: "Pryce", preferred_type: Type::Ice },
    BossTrainer { id: 35, name: "Clair", preferred_type: Type::Dragon },
    // Kanto gym leaders
    BossTrainer { id: 253, name: "Brock", preferred_type: Type::Rock },
    BossTrainer { id: 254, name: "Misty", preferred_type: Type::Water },
    BossTrainer { id: 255, name: "Lt. Surge", preferred_type: Type::Electric },
    BossTrainer { id: 256, name: "Erika", preferred_type: Type::Grass },
    BossTrainer { id: 257, name: "Janine", preferred_type: Type::Poison },
    BossTrainer { id: 258, name: "Sabrina", preferred_type: Type::Psychic },
    BossTrainer { id: 259, name: "Blaine", preferred_type: Type::Fire },
    BossTrainer { id: 261, name: "Blue", preferred_type: Type::Normal },
    // Elite Four and Champion
    BossTrainer { id: 245, name: "Will", preferred_type: Type::Psychic },
    BossTrainer { id: 247, name: "Koga", preferred_type: Type::Poison },
    BossTrainer { id: 418, name: "Bruno", preferred_type: Type::Fighting },
    BossTrainer { id: 246, name: "Karen", preferred_type: Type::Dark },
    BossTrainer { id: 244, name: "Lance", preferred_type: Type::Dragon },
];

/// Successive rival battles, in story order. The first is the lone starter
/// fight; scaled team sizing treats the first two specially.
pub const RIVAL_BATTLES: &[usize] = &[112, 113, 114, 115, 116, 117, 118, 119];

pub fn boss_by_id(id: usize) -> Option<&'static BossTrainer> {
    BOSS_TRAINERS.iter().find(|b| b.id == id)
}

pub fn is_boss(id: usize) -> bool {
    boss_by_id(id).is_some()
}

pub fn is_rival_battle(id: usize) -> bool {
    RIVAL_BATTLES.contains(&id)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignedGymType {
    pub trainer_name: String,
    pub assigned_type: String,
}

/// The per-run gym type assignment: one battle type per boss trainer,
/// written to disk so that independently invoked pipeline stages all agree
/// on which gym is themed around what.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TypeAssignment {
    pub seed: u64,
    pub gym_types: BTreeMap<usize, AssignedGymType>,
}

impl TypeAssignment {
    /// Draw one random type per boss trainer. Types are drawn without
    /// replacement until the pool runs dry, then the pool refills minus the
    /// three most recent picks, so neighbouring gyms rarely share a theme.
    pub fn generate(seed: u64, rng: &mut StdRng) -> TypeAssignment {
        let mut available: Vec<Type> = ALL_TYPES.to_vec();
        let mut recent: Vec<Type> = Vec::new();
        let mut gym_types = BTreeMap::new();

        for boss in BOSS_TRAINERS {
            if available.is_empty() {
                let tail: Vec<Type> = recent.iter().rev().take(3).copied().collect();
                available = ALL_TYPES
                    .iter()
                    .copied()
                    .filter(|t| !tail.contains(t))
                    .collect();
            }

            let &picked = available
                .choose(rng)
                .expect("type pool refill always leaves candidates");
            available.retain(|&t| t != picked);
            recent.push(picked);

            gym_types.insert(
                boss.id,
                AssignedGymType {
                    trainer_name: boss.name.to_string(),
                    assigned_type: picked.name().to_string(),
                },
            );
        }

        TypeAssignment { seed, gym_types }
    }

    pub fn type_for(&self, trainer_id: usize) -> Option<Type> {
        let entry = self.gym_types.get(&trainer_id)?;
        let ty = Type::from_name(&entry.assigned_type);
        if ty.is_none() {
            warn!(
                "gym type file names unknown type {:?} for trainer {}",
                entry.assigned_type, trainer_id
            );
        }
        ty
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| crate::RandomiserError::Config(format!("gym type encode: {}", e)))?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn parse(text: &str) -> Option<TypeAssignment> {
        match serde_json::from_str(text) {
            Ok(assignment) => Some(assignment),
            Err(e) => {
                warn!("malformed gym type file ({}), using static boss types", e);
                None
            }
        }
    }

    /// Tolerant load: an absent or malformed file falls back to the static
    /// boss types (with a warning) instead of failing the run.
    pub fn load(path: &Path) -> Option<TypeAssignment> {
        match fs::read_to_string(path) {
            Ok(text) => TypeAssignment::parse(&text),
            Err(_) => {
                warn!(
                    "no gym type assignment at {}, using static boss types",
                    path.display()
                );
                None
            }
        }
    }
}

/// The theme type to use for a boss: the per-run assignment when one exists
/// and parses, otherwise the static table's preferred type.
pub fn effective_type(assignment: Option<&TypeAssignment>, trainer_id: usize) -> Option<Type> {
    assignment
        .and_then(|a| a.type_for(trainer_id))
        .or_else(|| boss_by_id(trainer_id).map(|b| b.preferred_type))
}
