use alloc::boxed::Box;
use alloc::vec::Vec;
use arrayvec::ArrayVec;
use core::time::Duration;

use crate::consts::*;
use crate::decoder;
use crate::errors::Error;

/// A `Song` holds up to 31 `Instrument`s, up to 32 `Pattern`s and the order list that
/// arranges the patterns. It is immutable once loaded.
#[derive(Debug)]
pub struct Song {
    pub(crate) timer: Timer,
    pub(crate) initial_speed: u8,
    pub(crate) description: Vec<u8>,
    pub(crate) instruments: [Option<Instrument>; NUM_INSTRUMENTS],
    pub(crate) orders: ArrayVec<u8, 255>,
    pub(crate) patterns: [Option<Box<Pattern>>; NUM_PATTERNS],
}

/// Playback rate selected by the slow-timer header flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    /// 50 Hz
    Normal,
    /// 18.2 Hz
    Slow,
}

/// Two-operator FM voice, kept exactly as stored in the module.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Instrument {
    pub carrier: Operator,
    pub modulator: Operator,
    /// Feedback and connection (algorithm) bits.
    pub channel_props: u8,
}

/// Register values for one operator.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Operator {
    /// Tremolo, vibrato, sustain, KSR and frequency multiplier.
    pub props: u8,
    /// Key scale level and output level.
    pub level: u8,
    pub attack_decay: u8,
    pub sustain_release: u8,
    pub waveform: u8,
}

/// One (row, channel) intersection of a pattern.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// Instrument slot, `0` for no instrument change.
    pub instrument: u8,
    pub octave: u8,
    /// `0` empty, `1..=14` pitch, `15` key off.
    pub note: u8,
    /// Effect id, `0` for none. Stored but not executed.
    pub effect: u8,
    /// Effect parameter, only read from the file when `effect != 0`.
    pub parameter: u8,
}

/// Interpretation of a cell's note field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Note {
    Empty,
    Pitch(u8),
    Off,
}

/// A 64 row by 9 channel grid of cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub(crate) offset: u16,
    pub(crate) rows: [[Cell; NUM_CHANNELS]; NUM_ROWS],
}

impl Timer {
    pub(crate) fn from_flags(flags: u8) -> Self {
        if flags & FLAG_SLOW_TIMER != 0 {
            Timer::Slow
        } else {
            Timer::Normal
        }
    }

    /// Nominal time between two ticks.
    pub fn tick_duration(self) -> Duration {
        match self {
            Timer::Normal => Duration::from_millis(NORMAL_TICK_MS),
            Timer::Slow => Duration::from_millis(SLOW_TICK_MS),
        }
    }
}

impl Instrument {
    /// The instrument in module byte order.
    pub fn to_bytes(&self) -> [u8; INSTRUMENT_LENGTH] {
        [
            self.carrier.props,
            self.modulator.props,
            self.carrier.level,
            self.modulator.level,
            self.carrier.attack_decay,
            self.modulator.attack_decay,
            self.carrier.sustain_release,
            self.modulator.sustain_release,
            self.channel_props,
            self.carrier.waveform,
            self.modulator.waveform,
        ]
    }

    pub(crate) fn from_bytes(b: [u8; INSTRUMENT_LENGTH]) -> Self {
        Instrument {
            carrier: Operator {
                props: b[0],
                level: b[2],
                attack_decay: b[4],
                sustain_release: b[6],
                waveform: b[9],
            },
            modulator: Operator {
                props: b[1],
                level: b[3],
                attack_decay: b[5],
                sustain_release: b[7],
                waveform: b[10],
            },
            channel_props: b[8],
        }
    }
}

impl Cell {
    pub fn note(&self) -> Note {
        match self.note {
            0 => Note::Empty,
            NOTE_OFF => Note::Off,
            pitch => Note::Pitch(pitch),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Cell::default()
    }
}

impl Pattern {
    pub(crate) fn new(offset: u16) -> Self {
        Pattern {
            offset,
            rows: [[Cell::default(); NUM_CHANNELS]; NUM_ROWS],
        }
    }

    /// File offset the pattern was decoded from.
    pub fn offset(&self) -> u16 {
        self.offset
    }

    /// Row and channel wrap around the pattern bounds.
    pub fn cell(&self, row: usize, channel: usize) -> &Cell {
        &self.rows[row % NUM_ROWS][channel % NUM_CHANNELS]
    }

    pub(crate) fn cell_mut(&mut self, row: usize, channel: usize) -> &mut Cell {
        &mut self.rows[row % NUM_ROWS][channel % NUM_CHANNELS]
    }

    /// All cells of a row, one per channel.
    pub fn row(&self, row: usize) -> &[Cell; NUM_CHANNELS] {
        &self.rows[row % NUM_ROWS]
    }
}

impl Song {
    /// Create a new `Song` from a byte slice.
    ///
    /// ```ignore
    /// # use radtracker::Song;
    /// let song = Song::from_slice(include_bytes!("/some/file.rad")).unwrap();
    /// ```
    pub fn from_slice(slice: &[u8]) -> Result<Song, Error> {
        decoder::decode(slice)
    }

    /// Create a new `Song` from a seekable reader. The whole stream is read from the start.
    #[cfg(feature = "std")]
    pub fn from_reader<R>(mut reader: R) -> Result<Song, Error>
    where
        R: std::io::Read + std::io::Seek,
    {
        reader.seek(std::io::SeekFrom::Start(0))?;
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        Self::from_slice(&data)
    }

    pub fn timer(&self) -> Timer {
        self.timer
    }

    /// Ticks per row at the start of the song, `0..=31`.
    pub fn initial_speed(&self) -> u8 {
        self.initial_speed
    }

    /// Raw description text, empty when the module has none.
    pub fn description(&self) -> &[u8] {
        &self.description
    }

    /// Look up an instrument by its 1-based slot.
    pub fn instrument(&self, slot: u8) -> Option<&Instrument> {
        let index = usize::from(slot).checked_sub(1)?;
        self.instruments.get(index)?.as_ref()
    }

    /// Defined instruments with their 1-based slots.
    pub fn instruments(&self) -> impl Iterator<Item = (u8, &Instrument)> {
        self.instruments
            .iter()
            .enumerate()
            .filter_map(|(i, inst)| inst.as_ref().map(|inst| (i as u8 + 1, inst)))
    }

    /// Pattern slot indices in playback order.
    pub fn orders(&self) -> &[u8] {
        &self.orders
    }

    /// Pattern in the given slot; the slot wraps around the 32 slot table.
    pub fn pattern(&self, slot: u8) -> Option<&Pattern> {
        self.patterns[usize::from(slot) % NUM_PATTERNS].as_deref()
    }

    /// Pattern played at the given order position.
    pub fn order_pattern(&self, position: usize) -> Option<&Pattern> {
        self.orders
            .get(position)
            .and_then(|&slot| self.pattern(slot))
    }
}
