//! Line sources and the input cursor
//!
//! The engine only ever asks for "the next line" and "is there one"; it never
//! seeks. [`LineCursor`] adds a one-line lookahead on top of any source so the
//! segment assembler can peek before deciding whether a line is a child.

use std::io::{self, BufRead};

/// Ordered supply of physical lines, pulled on demand
pub trait LineSource {
    /// Next line without its terminator, or `None` at end of input
    fn next_line(&mut self) -> io::Result<Option<String>>;
}

/// Lines from any iterator of strings
pub struct IterSource<I>(I);

impl<I> IterSource<I> {
    pub fn new(lines: I) -> Self {
        Self(lines)
    }
}

impl<I, T> LineSource for IterSource<I>
where
    I: Iterator<Item = T>,
    T: Into<String>,
{
    fn next_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.0.next().map(Into::into))
    }
}

/// Lines from a buffered reader; `\n` and `\r\n` terminators are stripped
pub struct ReaderSource<R> {
    reader: R,
    buffer: String,
}

impl<R: BufRead> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: String::new(),
        }
    }
}

impl<R: BufRead> LineSource for ReaderSource<R> {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        self.buffer.clear();
        if self.reader.read_line(&mut self.buffer)? == 0 {
            return Ok(None);
        }
        if self.buffer.ends_with('\n') {
            self.buffer.pop();
            if self.buffer.ends_with('\r') {
                self.buffer.pop();
            }
        }
        Ok(Some(self.buffer.clone()))
    }
}

/// A line pulled from the cursor with its 1-based position in the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedLine {
    pub number: usize,
    pub text: String,
}

/// Peekable cursor over a line source
pub struct LineCursor<S> {
    source: S,
    peeked: Option<NumberedLine>,
    pulled: usize,
    consumed: usize,
    skip_blank: bool,
}

impl<S: LineSource> LineCursor<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            peeked: None,
            pulled: 0,
            consumed: 0,
            skip_blank: true,
        }
    }

    /// Whether empty lines are dropped before anyone sees them. Lines holding
    /// only spaces are kept; they can be a fixed-width record of blank fields.
    pub fn with_skip_blank(mut self, skip_blank: bool) -> Self {
        self.skip_blank = skip_blank;
        self
    }

    /// Look at the next line without consuming it
    pub fn peek(&mut self) -> io::Result<Option<&NumberedLine>> {
        if self.peeked.is_none() {
            self.peeked = self.pull()?;
        }
        Ok(self.peeked.as_ref())
    }

    /// Consume the next line
    pub fn next_line(&mut self) -> io::Result<Option<NumberedLine>> {
        let line = match self.peeked.take() {
            Some(line) => Some(line),
            None => self.pull()?,
        };
        self.consumed = match &line {
            Some(line) => line.number,
            None => self.pulled,
        };
        Ok(line)
    }

    /// Number of physical lines consumed so far, skipped empty lines
    /// included. A peeked line is not counted until it is consumed.
    pub fn lines_read(&self) -> usize {
        self.consumed
    }

    fn pull(&mut self) -> io::Result<Option<NumberedLine>> {
        loop {
            let Some(text) = self.source.next_line()? else {
                return Ok(None);
            };
            self.pulled += 1;
            if self.skip_blank && text.is_empty() {
                continue;
            }
            return Ok(Some(NumberedLine {
                number: self.pulled,
                text,
            }));
        }
    }
}

impl<I, T> LineCursor<IterSource<I>>
where
    I: Iterator<Item = T>,
    T: Into<String>,
{
    /// Cursor over in-memory lines
    pub fn from_lines<L>(lines: L) -> Self
    where
        L: IntoIterator<IntoIter = I>,
    {
        Self::new(IterSource::new(lines.into_iter()))
    }
}

impl<R: BufRead> LineCursor<ReaderSource<R>> {
    /// Cursor over a buffered reader
    pub fn from_reader(reader: R) -> Self {
        Self::new(ReaderSource::new(reader))
    }
}
