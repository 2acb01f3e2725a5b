use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use log::warn;

use crate::metadata;
use crate::party::{self, PokemonSlot};
use crate::species::normalize_name;
use crate::store::BlobStore;
use crate::{RandomiserError, Result};

/// A trainer's metadata entry and decoded party, unified under one id.
///
/// `slots.len()` is the authoritative party size everywhere; the party-size
/// byte cached in the metadata record is only ever read as a decode hint and
/// overwritten on save.
#[derive(Debug, Clone)]
pub struct TrainerRecord {
    pub id: usize,
    pub name: Option<String>,
    pub slots: Vec<PokemonSlot>,
    pub has_moves: bool,
}

impl TrainerRecord {
    pub fn party_size(&self) -> usize {
        self.slots.len()
    }

    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("Trainer {}", self.id),
        }
    }
}

/// Parse the `trainerdata N, "Name"` lines of the trainer assembly listing.
/// Lines that don't match are ignored; the file being absent yields an empty
/// table (records then fall back to id-based display names).
pub fn read_trainer_names(path: &Path) -> Result<BTreeMap<usize, String>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("trainer name table not found: {}", path.display());
            return Ok(BTreeMap::new());
        }
        Err(e) => return Err(e.into()),
    };

    Ok(parse_trainer_names(&text))
}

pub fn parse_trainer_names(text: &str) -> BTreeMap<usize, String> {
    let mut names = BTreeMap::new();

    for line in text.lines() {
        let rest = match line.trim().strip_prefix("trainerdata") {
            Some(rest) => rest,
            None => continue,
        };

        let mut parts = rest.splitn(2, ',');
        let id: usize = match parts.next().map(str::trim).map(str::parse) {
            Some(Ok(id)) => id,
            _ => continue,
        };
        let name = match parts.next().and_then(|p| p.split('"').nth(1)) {
            Some(name) => name,
            None => continue,
        };

        names.insert(id, name.to_string());
    }

    names
}

/// Decode every trainer in the metadata store's id range into records. The
/// cached metadata party size serves only as the decode hint for corrupt
/// blob lengths; disagreements with the decoded count are logged and the
/// decoded count wins.
pub fn load_all(
    party_store: &dyn BlobStore,
    meta_store: &dyn BlobStore,
    names: &BTreeMap<usize, String>,
) -> Vec<TrainerRecord> {
    let count = meta_store.len().max(party_store.len());
    let mut records = Vec::with_capacity(count);

    for id in 0..count {
        let cached_size = metadata::read_party_size(meta_store, id);
        let hint = if cached_size > 0 {
            Some(cached_size as usize)
        } else {
            None
        };

        let blob = party_store.get(id).unwrap_or(&[]);
        let (slots, has_moves) = party::decode(blob, hint);

        if cached_size > 0 && cached_size as usize != slots.len() {
            warn!(
                "trainer {}: metadata says {} Pokemon but party blob holds {}; using {}",
                id,
                cached_size,
                slots.len(),
                slots.len(),
            );
        }

        records.push(TrainerRecord {
            id,
            name: names.get(&id).cloned(),
            slots,
            has_moves,
        });
    }

    records
}

pub struct GymRoster {
    pub location: &'static str,
    pub trainers: &'static [&'static str],
}

/// Trainers grouped by the gym (or league room) they defend, leader last.
pub const GYM_ROSTERS: &[GymRoster] = &[
    GymRoster { location: "Violet City", trainers: &["Abe", "Rod", "Falkner"] },
    GymRoster { location: "Azalea Town", trainers: &["Al", "Benny", "Amy & Mimi", "Bugsy"] },
    GymRoster { location: "Goldenrod City", trainers: &["Victoria", "Samantha", "Carrie", "Cathy", "Whitney"] },
    GymRoster { location: "Ecruteak City", trainers: &["Georgina", "Grace", "Edith", "Martha", "Morty"] },
    GymRoster { location: "Cianwood City", trainers: &["Yoshi", "Lao", "Lung", "Nob", "Chuck"] },
    GymRoster { location: "Olivine City", trainers: &["Jasmine"] },
    GymRoster { location: "Mahogany Town", trainers: &["Diana", "Patton", "Deandre", "Jill", "Gerardo", "Pryce"] },
    GymRoster { location: "Blackthorn City", trainers: &["Paulo", "Lola", "Cody", "Fran", "Mike", "Clair"] },
    GymRoster { location: "Pewter City", trainers: &["Jerry", "Edwin", "Brock"] },
    GymRoster { location: "Cerulean City", trainers: &["Parker", "Eddie", "Diana", "Joy", "Briana", "Misty"] },
    GymRoster { location: "Vermilion City", trainers: &["Horton", "Vincent", "Gregory", "Lt. Surge"] },
    GymRoster { location: "Celadon City", trainers: &["Jo & Zoe", "Michelle", "Tanya", "Julia", "Erika"] },
    GymRoster { location: "Fuchsia City", trainers: &["Cindy", "Barry", "Alice", "Linda", "Janine"] },
    GymRoster { location: "Saffron City", trainers: &["Rebecca", "Jared", "Darcy", "Franklin", "Sabrina"] },
    GymRoster { location: "Seafoam Islands", trainers: &["Lowell", "Daniel", "Cary", "Linden", "Waldo", "Merle", "Blaine"] },
    GymRoster { location: "Viridian City", trainers: &["Arabella", "Salma", "Bonita", "Elan & Ida", "Blue"] },
    GymRoster { location: "Elite Four", trainers: &["Will", "Koga", "Bruno", "Karen", "Lance"] },
];

pub struct GymOverride {
    pub location: &'static str,
    pub trainer: &'static str,
    pub id: usize,
}

/// Manual id pins for trainer names that appear in more than one gym. Every
/// duplicated name must be pinned for each of its locations; resolution
/// refuses to guess.
pub const GYM_TRAINER_OVERRIDES: &[GymOverride] = &[
    GymOverride { location: "Mahogany Town", trainer: "Diana", id: 480 },
    GymOverride { location: "Cerulean City", trainer: "Diana", id: 297 },
];

fn override_for(location: &str, trainer: &str) -> Option<usize> {
    GYM_TRAINER_OVERRIDES
        .iter()
        .find(|o| o.location == location && o.trainer == trainer)
        .map(|o| o.id)
}

fn match_name(name_to_id: &BTreeMap<String, usize>, wanted: &str) -> Option<usize> {
    if let Some(&id) = name_to_id.get(wanted) {
        return Some(id);
    }

    if let Some((_, &id)) = name_to_id
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
    {
        return Some(id);
    }

    // "Lt. Surge" vs "LtSurge": compare alphanumeric-only forms, allowing
    // containment either way.
    let wanted_norm = normalize_name(wanted);
    name_to_id
        .iter()
        .find(|(name, _)| {
            let norm = normalize_name(name);
            norm == wanted_norm || norm.contains(&wanted_norm) || wanted_norm.contains(&norm)
        })
        .map(|(_, &id)| id)
}

/// Resolve every gym roster name to a trainer id.
///
/// Fails loudly: a gym trainer that cannot be resolved, or a duplicated
/// name without a complete set of overrides, desynchronises every downstream
/// "who is this leader" assumption and is treated as a configuration error,
/// not something to degrade through.
pub fn resolve_gym_trainers(
    names: &BTreeMap<usize, String>,
) -> Result<HashMap<&'static str, Vec<(&'static str, usize)>>> {
    // Reverse map; on shared names the higher id wins, overrides cover the
    // cases where that matters.
    let mut name_to_id: BTreeMap<String, usize> = BTreeMap::new();
    for (&id, name) in names {
        name_to_id.insert(name.clone(), id);
    }

    let mut locations_by_name: HashMap<&'static str, Vec<&'static str>> = HashMap::new();
    for roster in GYM_ROSTERS {
        for &trainer in roster.trainers {
            locations_by_name.entry(trainer).or_default().push(roster.location);
        }
    }

    let mut unhandled: Vec<String> = locations_by_name
        .iter()
        .filter(|(_, locations)| locations.len() > 1)
        .filter(|(name, locations)| {
            !locations
                .iter()
                .all(|loc| override_for(loc, name).is_some())
        })
        .map(|(name, locations)| format!("{} appears in: {}", name, locations.join(", ")))
        .collect();
    unhandled.sort();

    if !unhandled.is_empty() {
        return Err(RandomiserError::NameResolution(format!(
            "duplicate gym trainer names without overrides: {}",
            unhandled.join("; ")
        )));
    }

    let mut resolved: HashMap<&'static str, Vec<(&'static str, usize)>> = HashMap::new();
    let mut missing: Vec<String> = Vec::new();

    for roster in GYM_ROSTERS {
        let mut entries = Vec::with_capacity(roster.trainers.len());
        for &trainer in roster.trainers {
            let id = override_for(roster.location, trainer)
                .or_else(|| match_name(&name_to_id, trainer));

            match id {
                Some(id) => entries.push((trainer, id)),
                None => missing.push(format!("{} (in {})", trainer, roster.location)),
            }
        }
        resolved.insert(roster.location, entries);
    }

    if !missing.is_empty() {
        return Err(RandomiserError::NameResolution(format!(
            "gym trainers not present in the name table: {}",
            missing.join(", ")
        )));
    }

    Ok(resolved)
}
