use log::warn;

/// Slot width without the held-item/move block.
pub const PLAIN_SLOT_SIZE: usize = 8;
/// Slot width with held item and four moves.
pub const MOVES_SLOT_SIZE: usize = 18;

/// Held item + moves, present only in the wide slot variant. A whole party
/// is either all-wide or all-narrow; the variants are never mixed.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Moveset {
    pub item: u16,
    pub moves: [u16; 4],
}

/// One party member as stored in a trainer's party blob.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct PokemonSlot {
    pub ivs: u8,
    pub ability_slot: u8,
    pub level: u16,
    pub species: u16,
    pub ball_seal: u16,
    pub moveset: Option<Moveset>,
}

impl PokemonSlot {
    pub fn new(species: u16, level: u16) -> Self {
        Self {
            species,
            level,
            ..Default::default()
        }
    }
}

fn read_u16(data: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([data[off], data[off + 1]])
}

fn parse_slot(data: &[u8], has_moves: bool) -> PokemonSlot {
    let moveset = if has_moves {
        Some(Moveset {
            item: read_u16(data, 6),
            moves: [
                read_u16(data, 8),
                read_u16(data, 10),
                read_u16(data, 12),
                read_u16(data, 14),
            ],
        })
    } else {
        None
    };

    let ball_seal_off = if has_moves { 16 } else { 6 };

    PokemonSlot {
        ivs: data[0],
        ability_slot: data[1],
        level: read_u16(data, 2),
        species: read_u16(data, 4),
        ball_seal: read_u16(data, ball_seal_off),
        moveset,
    }
}

/// Pick a slot width for a blob whose length divides evenly by neither
/// width. When the trainer-metadata party count is known, an exact
/// `count * width` match wins, then whichever width implies a count closer
/// to it (ties go to the wide variant, whose record the engine prefers).
/// With no hint the narrow variant is assumed.
fn resolve_ambiguous_width(len: usize, expected: Option<usize>) -> bool {
    let expected = match expected {
        Some(n) if n > 0 => n,
        _ => return false,
    };

    if len == expected * MOVES_SLOT_SIZE {
        return true;
    }
    if len == expected * PLAIN_SLOT_SIZE {
        return false;
    }

    let diff_moves = len.abs_diff(expected * MOVES_SLOT_SIZE);
    let diff_plain = len.abs_diff(expected * PLAIN_SLOT_SIZE);
    diff_moves <= diff_plain
}

/// Decode a party blob into slots, detecting the slot variant from the blob
/// length. `expected` is the party count cached in the trainer metadata,
/// used only to break ties for corrupt lengths.
///
/// The length heuristic is inherent to the format: nothing in the blob says
/// which variant it uses. A length divisible by 18 is taken as the wide
/// variant even when it is also divisible by 8 (the lcm, 72 bytes, is a
/// four-Pokémon wide party in every dump observed so far). This never fails;
/// ambiguous lengths are logged and decoded with the resolved width, dropping
/// any trailing fragment.
pub fn decode(blob: &[u8], expected: Option<usize>) -> (Vec<PokemonSlot>, bool) {
    if blob.is_empty() {
        return (Vec::new(), false);
    }

    let has_moves = if blob.len() % MOVES_SLOT_SIZE == 0 {
        true
    } else if blob.len() % PLAIN_SLOT_SIZE == 0 {
        false
    } else {
        let wide = resolve_ambiguous_width(blob.len(), expected);
        warn!(
            "party blob length {} divides by neither {} nor {}; decoding as {} variant",
            blob.len(),
            PLAIN_SLOT_SIZE,
            MOVES_SLOT_SIZE,
            if wide { "wide" } else { "narrow" },
        );
        wide
    };

    let slot_size = if has_moves { MOVES_SLOT_SIZE } else { PLAIN_SLOT_SIZE };
    let count = blob.len() / slot_size;

    let mut slots = Vec::with_capacity(count);
    for i in 0..count {
        let off = i * slot_size;
        slots.push(parse_slot(&blob[off..off + slot_size], has_moves));
    }

    (slots, has_moves)
}

/// Serialise slots back into a party blob. Output length is always
/// `slots.len()` times the selected width; a slot without a moveset encodes
/// zeroed item/move fields when the wide variant is requested.
pub fn encode(slots: &[PokemonSlot], has_moves: bool) -> Vec<u8> {
    let slot_size = if has_moves { MOVES_SLOT_SIZE } else { PLAIN_SLOT_SIZE };
    let mut out = Vec::with_capacity(slots.len() * slot_size);

    for slot in slots {
        out.push(slot.ivs);
        out.push(slot.ability_slot);
        out.extend_from_slice(&slot.level.to_le_bytes());
        out.extend_from_slice(&slot.species.to_le_bytes());

        if has_moves {
            let default = Moveset::default();
            let moveset = slot.moveset.as_ref().unwrap_or(&default);
            out.extend_from_slice(&moveset.item.to_le_bytes());
            for mv in moveset.moves {
                out.extend_from_slice(&mv.to_le_bytes());
            }
        }

        out.extend_from_slice(&slot.ball_seal.to_le_bytes());
    }

    out
}
