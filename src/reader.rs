use byteorder::{ByteOrder, LittleEndian};

/// Sequential byte reader with absolute seeking.
///
/// Reading past the end never fails: it yields `0` and latches the end-of-stream flag,
/// leaving length checks to the caller.
#[derive(Debug)]
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    eof: bool,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Reader {
            data,
            pos: 0,
            eof: false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    /// True once any read has run past the end of the data.
    pub(crate) fn is_eof(&self) -> bool {
        self.eof
    }

    /// Move to an absolute offset. Seeking past the end is allowed; the next read hits EOF.
    pub(crate) fn seek(&mut self, offset: usize) {
        self.pos = offset;
    }

    pub(crate) fn read_byte(&mut self) -> u8 {
        match self.data.get(self.pos) {
            Some(&byte) => {
                self.pos += 1;
                byte
            }
            None => {
                self.eof = true;
                0
            }
        }
    }

    /// Little-endian word: low byte first.
    pub(crate) fn read_word(&mut self) -> u16 {
        let bytes = [self.read_byte(), self.read_byte()];
        LittleEndian::read_u16(&bytes)
    }
}
