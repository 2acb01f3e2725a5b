use std::fs;
use std::path::Path;

use log::warn;

use crate::store::BlobStore;
use crate::Result;

/// Battle types, in the order the ROM's type bytes use.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Type {
    Normal,
    Fighting,
    Flying,
    Poison,
    Ground,
    Rock,
    Bug,
    Ghost,
    Steel,
    Fire,
    Water,
    Grass,
    Electric,
    Psychic,
    Ice,
    Dragon,
    Dark,
    Fairy,
}

pub const ALL_TYPES: &[Type] = &[
    Type::Normal,
    Type::Fighting,
    Type::Flying,
    Type::Poison,
    Type::Ground,
    Type::Rock,
    Type::Bug,
    Type::Ghost,
    Type::Steel,
    Type::Fire,
    Type::Water,
    Type::Grass,
    Type::Electric,
    Type::Psychic,
    Type::Ice,
    Type::Dragon,
    Type::Dark,
    Type::Fairy,
];

impl Type {
    pub fn from_id(id: u8) -> Option<Type> {
        ALL_TYPES.get(id as usize).copied()
    }

    pub fn id(self) -> u8 {
        ALL_TYPES.iter().position(|&t| t == self).unwrap_or(0) as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Type::Normal => "Normal",
            Type::Fighting => "Fighting",
            Type::Flying => "Flying",
            Type::Poison => "Poison",
            Type::Ground => "Ground",
            Type::Rock => "Rock",
            Type::Bug => "Bug",
            Type::Ghost => "Ghost",
            Type::Steel => "Steel",
            Type::Fire => "Fire",
            Type::Water => "Water",
            Type::Grass => "Grass",
            Type::Electric => "Electric",
            Type::Psychic => "Psychic",
            Type::Ice => "Ice",
            Type::Dragon => "Dragon",
            Type::Dark => "Dark",
            Type::Fairy => "Fairy",
        }
    }

    pub fn from_name(name: &str) -> Option<Type> {
        let wanted = normalize_name(name);
        ALL_TYPES
            .iter()
            .copied()
            .find(|t| normalize_name(t.name()) == wanted)
    }
}

/// Lowercased, alphanumeric-only form used for all fuzzy name comparisons
/// ("Lt. Surge" == "LtSurge", "NIDORAN_F" == "nidoranf").
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[derive(Debug, Clone)]
pub struct SpeciesStats {
    pub name: String,
    pub bst: u16,
    pub type1: Type,
    pub type2: Option<Type>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MoveCategory {
    Physical,
    Special,
    Status,
}

#[derive(Debug, Clone)]
pub struct MoveStats {
    pub power: u8,
    pub move_type: Option<Type>,
    pub category: MoveCategory,
    pub accuracy: u8,
}

/// Species that must never be randomised in or out of a team: legendaries
/// and event Pokémon whose placement is curated by hand elsewhere.
pub const REPLACEMENT_BLACKLIST: &[u16] = &[
    150, 151, // Mewtwo, Mew
    243, 244, 245, // Raikou, Entei, Suicune
    249, 250, 251, // Lugia, Ho-Oh, Celebi
    377, 378, 379, 380, 381, 382, 383, 384, 385, 386, // Hoenn legendaries
    480, 481, 482, 483, 484, 485, 486, 487, 488, 489, 490, 491, 492, 493,
    494, // Sinnoh legendaries
];

pub fn is_blacklisted(species: u16) -> bool {
    REPLACEMENT_BLACKLIST.contains(&species)
}

// Per-species record: six base stat bytes, then the two type bytes.
const STAT_COUNT: usize = 6;
const TYPE1_OFFSET: usize = 6;
const TYPE2_OFFSET: usize = 7;
const MIN_SPECIES_RECORD: usize = 8;

// Per-move record: effect u16, category u8, power u8, type u8, accuracy u8.
const MOVE_CATEGORY_OFFSET: usize = 2;
const MOVE_POWER_OFFSET: usize = 3;
const MOVE_TYPE_OFFSET: usize = 4;
const MOVE_ACCURACY_OFFSET: usize = 5;
const MIN_MOVE_RECORD: usize = 6;

/// Read-only species/move lookup tables. Built once by the orchestrator and
/// passed by reference to every component that needs lookups.
#[derive(Debug, Default)]
pub struct StaticData {
    species: Vec<Option<SpeciesStats>>,
    moves: Vec<Option<MoveStats>>,
}

impl StaticData {
    pub fn new(species: Vec<Option<SpeciesStats>>, moves: Vec<Option<MoveStats>>) -> Self {
        Self { species, moves }
    }

    /// Parse the species table out of a blob store, attaching names from the
    /// parallel name list. Short records and placeholder names (`-----`)
    /// become absent entries rather than errors.
    pub fn load_species(store: &dyn BlobStore, names: &[String]) -> Vec<Option<SpeciesStats>> {
        let mut species = Vec::with_capacity(store.len());

        for id in 0..store.len() {
            let data = match store.get(id) {
                Some(d) => d,
                None => {
                    species.push(None);
                    continue;
                }
            };

            if data.len() < MIN_SPECIES_RECORD {
                warn!("species {}: record too short ({} bytes), skipped", id, data.len());
                species.push(None);
                continue;
            }

            let name = names.get(id).cloned().unwrap_or_default();
            if name.is_empty() || name == "-----" {
                species.push(None);
                continue;
            }

            let bst: u16 = data[..STAT_COUNT].iter().map(|&b| b as u16).sum();
            let type1 = match Type::from_id(data[TYPE1_OFFSET]) {
                Some(t) => t,
                None => {
                    warn!("species {}: unknown type id {}", id, data[TYPE1_OFFSET]);
                    species.push(None);
                    continue;
                }
            };
            // Monotype species repeat the primary type in the second byte.
            let type2 = Type::from_id(data[TYPE2_OFFSET]).filter(|&t| t != type1);

            species.push(Some(SpeciesStats {
                name,
                bst,
                type1,
                type2,
            }));
        }

        species
    }

    pub fn load_moves(store: &dyn BlobStore) -> Vec<Option<MoveStats>> {
        let mut moves = Vec::with_capacity(store.len());

        for id in 0..store.len() {
            let data = match store.get(id) {
                Some(d) if d.len() >= MIN_MOVE_RECORD => d,
                _ => {
                    moves.push(None);
                    continue;
                }
            };

            let category = match data[MOVE_CATEGORY_OFFSET] {
                0 => MoveCategory::Physical,
                1 => MoveCategory::Special,
                _ => MoveCategory::Status,
            };

            moves.push(Some(MoveStats {
                power: data[MOVE_POWER_OFFSET],
                move_type: Type::from_id(data[MOVE_TYPE_OFFSET]),
                category,
                accuracy: data[MOVE_ACCURACY_OFFSET],
            }));
        }

        moves
    }

    pub fn species_stats(&self, id: u16) -> Option<&SpeciesStats> {
        self.species.get(id as usize).and_then(|s| s.as_ref())
    }

    pub fn move_stats(&self, id: u16) -> Option<&MoveStats> {
        self.moves.get(id as usize).and_then(|m| m.as_ref())
    }

    pub fn bst(&self, id: u16) -> Option<u16> {
        self.species_stats(id).map(|s| s.bst)
    }

    pub fn species_count(&self) -> usize {
        self.species.len()
    }

    pub fn species_name(&self, id: u16) -> &str {
        self.species_stats(id).map(|s| s.name.as_str()).unwrap_or("?")
    }

    pub fn find_species_by_name(&self, name: &str) -> Option<u16> {
        let wanted = normalize_name(name);
        self.species.iter().enumerate().find_map(|(id, entry)| {
            entry
                .as_ref()
                .filter(|s| normalize_name(&s.name) == wanted)
                .map(|_| id as u16)
        })
    }

    /// Every usable species id: present in the table and not blacklisted.
    /// This is the candidate pool for regular randomisation.
    pub fn replacement_pool(&self) -> Vec<u16> {
        self.species
            .iter()
            .enumerate()
            .filter_map(|(id, entry)| entry.as_ref().map(|_| id as u16))
            .filter(|&id| id != 0 && !is_blacklisted(id))
            .collect()
    }

    /// All usable species whose primary (or, when `include_secondary`,
    /// secondary) type matches.
    pub fn species_of_type(&self, wanted: Type, include_secondary: bool) -> Vec<u16> {
        self.species
            .iter()
            .enumerate()
            .filter_map(|(id, entry)| {
                let stats = entry.as_ref()?;
                let matches = stats.type1 == wanted
                    || (include_secondary && stats.type2 == Some(wanted));
                if matches && id != 0 && !is_blacklisted(id as u16) {
                    Some(id as u16)
                } else {
                    None
                }
            })
            .collect()
    }
}

/// One species name per line, indexed by species id.
pub fn read_species_names(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)?;
    Ok(text.lines().map(|l| l.trim().to_string()).collect())
}
