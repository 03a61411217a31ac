//! Loader and tick sequencer for Reality AdLib Tracker (RAD) modules.
//!
//! [`Song`] decodes a module into instruments, an order list and patterns. [`Sequencer`]
//! walks a loaded song one tick at a time and emits [`Command`]s for an OPL2 synthesizer.
//! Effects are decoded and kept on each [`Cell`] but not executed.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod consts;
mod decoder;
mod errors;
mod reader;
mod sequencer;
mod song;

pub use errors::{Error, Malformed};
pub use sequencer::{Command, Commands, Looping, PlaybackConfig, Sequencer, State, Tick};
pub use song::{Cell, Instrument, Note, Operator, Pattern, Song, Timer};
