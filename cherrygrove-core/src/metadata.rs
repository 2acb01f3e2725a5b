use log::warn;

use crate::store::BlobStore;

/// Byte offset of the cached party-size field inside a trainer metadata
/// record. The rest of the record (class, items, AI flags) is opaque here.
pub const PARTY_SIZE_OFFSET: usize = 3;

/// The cached party-size byte of a trainer's metadata record, or 0 when the
/// trainer has no record (or one too short to hold the field).
///
/// The byte is a cache of the real count (the decoded party blob's slot
/// count) and is never used as a source of truth, only as a disambiguation
/// hint for corrupt party blob lengths.
pub fn read_party_size(store: &dyn BlobStore, id: usize) -> u8 {
    match store.get(id) {
        Some(data) if data.len() > PARTY_SIZE_OFFSET => data[PARTY_SIZE_OFFSET],
        _ => 0,
    }
}

/// Overwrite the cached party-size byte in place, leaving every other byte
/// of the record untouched. Returns false (and writes nothing) when the
/// record is absent or too short.
pub fn write_party_size(store: &mut dyn BlobStore, id: usize, new_size: u8) -> bool {
    let mut data = match store.get(id) {
        Some(data) if data.len() > PARTY_SIZE_OFFSET => data.to_vec(),
        _ => {
            warn!("trainer {}: no metadata record to update party size in", id);
            return false;
        }
    };

    data[PARTY_SIZE_OFFSET] = new_size;
    store.set(id, data);
    true
}
