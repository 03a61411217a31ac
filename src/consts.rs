pub(crate) const NUM_CHANNELS: usize = 9;
pub(crate) const NUM_INSTRUMENTS: usize = 31;
pub(crate) const NUM_PATTERNS: usize = 32;
pub(crate) const NUM_ROWS: usize = 64;

pub(crate) const HEADER_OFFSET: usize = 0x11;
pub(crate) const HEADER_LENGTH: usize = HEADER_OFFSET + 1;
pub(crate) const INSTRUMENT_LENGTH: usize = 11;

pub(crate) const FLAG_DESCRIPTION: u8 = 0x80;
pub(crate) const FLAG_SLOW_TIMER: u8 = 0x40;
pub(crate) const SPEED_MASK: u8 = 0x1f;

pub(crate) const END_MARKER: u8 = 0x80;
pub(crate) const ROW_MASK: u8 = 0x3f;
pub(crate) const CHANNEL_MASK: u8 = 0x0f;

pub(crate) const NOTE_OFF: u8 = 0x0f;

// Commands emitted per channel on a trigger: instrument, frequency, key on
pub(crate) const MAX_COMMANDS: usize = NUM_CHANNELS * 3;

pub(crate) const NORMAL_TICK_MS: u64 = 20;
pub(crate) const SLOW_TICK_MS: u64 = 55;
