//! In-place entry reader over the configuration buffer.
//!
//! The reader walks a mutable byte slice, overwriting each delimiter with a
//! [`TERMINATOR`] as it passes it. Entries are disjoint borrowed views into the
//! buffer; nothing is copied or allocated. The bytes written by the reader are
//! put back by [`ConfigBuffer::restore`](super::ConfigBuffer::restore) using the
//! final [`EntryReader::cursor`].

/// Byte written over each consumed delimiter.
pub const TERMINATOR: u8 = 0;

/// A single entry of the configuration string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry<'a> {
    bytes: &'a [u8],
}

impl<'a> Entry<'a> {
    /// Wrap a byte view.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Raw bytes of the entry, without the terminator.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the entry is empty. An empty entry ends the configuration.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Byte at `index`, or [`TERMINATOR`] past the end.
    pub fn at(&self, index: usize) -> u8 {
        self.bytes.get(index).copied().unwrap_or(TERMINATOR)
    }

    /// The tag byte selecting the entry kind.
    pub fn tag(&self) -> u8 {
        self.at(0)
    }

    /// Whether the entry starts with `prefix`.
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.bytes.starts_with(prefix)
    }

    /// Everything after the tag, with spaces between tag and payload skipped.
    pub fn payload(&self) -> &'a [u8] {
        let rest = self.bytes.get(1..).unwrap_or(&[]);
        let skip = rest.iter().take_while(|&&b| b == b' ').count();
        &rest[skip..]
    }
}

/// Destructive, non-restartable reader of delimiter-separated entries.
#[derive(Debug)]
pub struct EntryReader<'a> {
    rest: &'a mut [u8],
    cursor: usize,
    delimiter: u8,
}

impl<'a> EntryReader<'a> {
    /// Start reading `buf` from its first byte.
    pub fn new(buf: &'a mut [u8], delimiter: u8) -> Self {
        Self {
            rest: buf,
            cursor: 0,
            delimiter,
        }
    }

    /// Number of bytes consumed so far, consumed delimiters included.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Whether the cursor reached the end of the buffer.
    pub fn is_exhausted(&self) -> bool {
        self.rest.is_empty()
    }

    /// Take the next entry.
    ///
    /// Once the cursor sits at the end of the buffer every call returns an
    /// empty entry.
    pub fn next_entry(&mut self) -> Entry<'a> {
        let rest = core::mem::take(&mut self.rest);
        let end = rest
            .iter()
            .position(|&b| b == self.delimiter)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at_mut(end);
        self.cursor += end;
        self.rest = match tail.split_first_mut() {
            Some((delimiter, remaining)) => {
                *delimiter = TERMINATOR;
                self.cursor += 1;
                remaining
            }
            None => &mut [],
        };
        Entry::new(head)
    }
}

impl<'a> Iterator for EntryReader<'a> {
    type Item = Entry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_exhausted() {
            None
        } else {
            Some(self.next_entry())
        }
    }
}
