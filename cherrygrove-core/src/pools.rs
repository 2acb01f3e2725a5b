use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use log::warn;

use crate::species::{StaticData, Type};
use crate::Result;

/// One named special-role pool (mimic, pivot or fulcrum): an ordered list of
/// candidate species per battle type, loaded once from a sectioned text file
/// and immutable afterwards.
///
/// File format:
///
/// ```text
/// # comment
/// [WATER]            (or [TYPE_WATER])
/// SPECIES_LAPRAS     (or a bare species name)
/// SPECIES_QUAGSIRE
/// ```
#[derive(Debug, Default)]
pub struct SpecialPool {
    by_type: HashMap<Type, Vec<u16>>,
}

impl SpecialPool {
    pub fn parse(text: &str, data: &StaticData) -> SpecialPool {
        let mut by_type: HashMap<Type, Vec<u16>> = HashMap::new();
        let mut current: Option<Type> = None;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                let name = header.strip_prefix("TYPE_").unwrap_or(header);
                current = Type::from_name(name);
                if let Some(ty) = current {
                    by_type.entry(ty).or_default();
                } else {
                    warn!("special pool: unknown type section [{}], entries skipped", header);
                }
                continue;
            }

            let ty = match current {
                Some(ty) => ty,
                None => continue,
            };

            let species_name = line.strip_prefix("SPECIES_").unwrap_or(line);
            match data.find_species_by_name(species_name) {
                Some(id) => by_type.entry(ty).or_default().push(id),
                None => warn!("special pool: unknown species {:?}, skipped", species_name),
            }
        }

        SpecialPool { by_type }
    }

    /// Load a pool file. A missing file is tolerated (empty pool with a
    /// warning, matching the rest of the pipeline); any other I/O failure
    /// propagates.
    pub fn load(path: &Path, data: &StaticData) -> Result<SpecialPool> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(SpecialPool::parse(&text, data)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("special pool file not found: {}", path.display());
                Ok(SpecialPool::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn candidates(&self, ty: Type) -> Option<&[u16]> {
        self.by_type.get(&ty).map(|v| v.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.values().all(|v| v.is_empty())
    }
}
