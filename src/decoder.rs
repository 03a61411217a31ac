//! Module decoder: turns the on-disk RAD layout into a [`Song`].

use alloc::boxed::Box;
use alloc::vec::Vec;
use arrayvec::ArrayVec;
use log::{debug, trace};

use crate::consts::*;
use crate::errors::{Error, Malformed};
use crate::reader::Reader;
use crate::song::{Instrument, Pattern, Song, Timer};

/// Decode a complete module. Either the whole song is returned or nothing is.
pub(crate) fn decode(data: &[u8]) -> Result<Song, Error> {
    if data.len() < HEADER_LENGTH {
        return Err(Malformed::HeaderTooShort { len: data.len() }.into());
    }

    let mut reader = Reader::new(data);

    reader.seek(HEADER_OFFSET);
    let flags = reader.read_byte();
    let timer = Timer::from_flags(flags);
    let initial_speed = flags & SPEED_MASK;

    let description = if flags & FLAG_DESCRIPTION != 0 {
        read_description(&mut reader)?
    } else {
        Vec::new()
    };

    let instruments = read_instruments(&mut reader)?;
    let orders = read_orders(&mut reader)?;
    let offsets = read_pattern_offsets(&mut reader)?;

    let mut patterns: [Option<Box<Pattern>>; NUM_PATTERNS] = Default::default();
    for (slot, &offset) in offsets.iter().enumerate() {
        if offset == 0 {
            continue;
        }
        if usize::from(offset) >= reader.len() {
            return Err(Malformed::PatternOffset { slot, offset }.into());
        }

        patterns[slot] = Some(Box::new(read_pattern(&mut reader, offset)?));
        trace!("Pattern {} decoded from 0x{:04x}", slot, offset);
    }

    // Every order must resolve to a pattern before playback may start
    for (position, &slot) in orders.iter().enumerate() {
        if patterns[usize::from(slot) % NUM_PATTERNS].is_none() {
            return Err(Malformed::UnloadedPattern { position, slot }.into());
        }
    }

    debug!(
        "Decoded RAD module: {:?} timer, speed {}, {} instruments, {} orders, {} patterns",
        timer,
        initial_speed,
        instruments.iter().filter(|i| i.is_some()).count(),
        orders.len(),
        patterns.iter().filter(|p| p.is_some()).count(),
    );

    Ok(Song {
        timer,
        initial_speed,
        description,
        instruments,
        orders,
        patterns,
    })
}

/// Fail if any read so far ran off the end of the data, blaming the structure at `start`.
fn ensure_not_eof(reader: &Reader, start: usize) -> Result<(), Error> {
    if reader.is_eof() {
        Err(Error::TruncatedInput { offset: start })
    } else {
        Ok(())
    }
}

/// Description text runs up to and including a zero byte.
fn read_description(reader: &mut Reader) -> Result<Vec<u8>, Error> {
    let start = reader.position();
    let mut description = Vec::new();
    loop {
        let byte = reader.read_byte();
        ensure_not_eof(reader, start)?;
        if byte == 0 {
            return Ok(description);
        }
        description.push(byte);
    }
}

fn read_instruments(reader: &mut Reader) -> Result<[Option<Instrument>; NUM_INSTRUMENTS], Error> {
    let mut instruments = [None; NUM_INSTRUMENTS];

    loop {
        let start = reader.position();
        let slot = reader.read_byte();
        ensure_not_eof(reader, start)?;
        if slot == 0 {
            return Ok(instruments);
        }
        if usize::from(slot) > NUM_INSTRUMENTS {
            return Err(Malformed::InstrumentSlot { slot }.into());
        }

        let mut bytes = [0; INSTRUMENT_LENGTH];
        for byte in bytes.iter_mut() {
            *byte = reader.read_byte();
        }
        ensure_not_eof(reader, start)?;

        instruments[usize::from(slot) - 1] = Some(Instrument::from_bytes(bytes));
    }
}

fn read_orders(reader: &mut Reader) -> Result<ArrayVec<u8, 255>, Error> {
    let start = reader.position();
    let length = reader.read_byte();
    let orders = (0..length).map(|_| reader.read_byte()).collect();
    ensure_not_eof(reader, start)?;

    Ok(orders)
}

fn read_pattern_offsets(reader: &mut Reader) -> Result<[u16; NUM_PATTERNS], Error> {
    let start = reader.position();
    let mut offsets = [0; NUM_PATTERNS];
    for offset in offsets.iter_mut() {
        *offset = reader.read_word();
    }
    ensure_not_eof(reader, start)?;

    Ok(offsets)
}

/// Decode the line/channel stream of a single pattern.
fn read_pattern(reader: &mut Reader, offset: u16) -> Result<Pattern, Error> {
    let mut pattern = Pattern::new(offset);
    reader.seek(usize::from(offset));

    loop {
        let start = reader.position();
        let line = reader.read_byte();
        let row = usize::from(line & ROW_MASK);

        loop {
            let channel = reader.read_byte();
            let cell = pattern.cell_mut(row, usize::from(channel & CHANNEL_MASK));

            let data = reader.read_byte();
            cell.instrument = (data & 0x80) >> 3;
            cell.octave = (data & 0x70) >> 4;
            cell.note = data & 0x0f;

            let data = reader.read_byte();
            cell.instrument += (data & 0xf0) >> 4;
            cell.effect = data & 0x0f;
            cell.parameter = if cell.effect != 0 {
                reader.read_byte()
            } else {
                0
            };

            // A zero-filled tail would never set an end marker
            ensure_not_eof(reader, start)?;

            if channel & END_MARKER != 0 {
                break;
            }
        }

        if line & END_MARKER != 0 {
            return Ok(pattern);
        }
    }
}
