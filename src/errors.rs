//! Errors produced while loading a RAD module.

/// Possible errors.
#[derive(Debug)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum Error {
    /// A required field lies past the end of the source. `offset` is where the cut-short
    /// structure (description, instrument record, order list, offset table or pattern line)
    /// starts.
    #[cfg_attr(feature = "std", error("Truncated input at offset 0x{offset:04x}"))]
    TruncatedInput { offset: usize },

    /// The module layout is inconsistent.
    #[cfg_attr(feature = "std", error("Malformed module"))]
    MalformedModule(#[cfg_attr(feature = "std", source)] Malformed),

    /// Reserved for effect ids the decoder would reject.
    ///
    /// No effect id is rejected at the moment; unknown effects are kept as data.
    #[cfg_attr(feature = "std", error("Unsupported effect {effect:#x}"))]
    UnsupportedFeature { effect: u8 },

    /// Reading the source failed.
    #[cfg(feature = "std")]
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

/// Ways in which a module can be malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum Malformed {
    /// The file ends before the header flags byte.
    #[cfg_attr(feature = "std", error("File is {len} bytes, shorter than the header"))]
    HeaderTooShort { len: usize },

    /// An instrument record names a slot above 31.
    #[cfg_attr(feature = "std", error("Instrument slot {slot} is out of range"))]
    InstrumentSlot { slot: u8 },

    /// A pattern offset is not inside the file.
    #[cfg_attr(
        feature = "std",
        error("Pattern {slot} offset 0x{offset:04x} points outside the file")
    )]
    PatternOffset { slot: usize, offset: u16 },

    /// An order entry resolves to a pattern slot with no pattern data.
    #[cfg_attr(
        feature = "std",
        error("Order {position} references unloaded pattern {slot}")
    )]
    UnloadedPattern { position: usize, slot: u8 },
}

impl From<Malformed> for Error {
    fn from(e: Malformed) -> Self {
        Error::MalformedModule(e)
    }
}
