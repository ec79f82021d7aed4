//! Line sinks: where formatted lines are pushed, in emission order

use encoding_rs::{Encoding, UTF_8};
use std::io::{self, Write};

/// Ordered consumer of formatted lines
pub trait LineSink {
    fn push_line(&mut self, line: &str) -> io::Result<()>;
}

impl LineSink for Vec<String> {
    fn push_line(&mut self, line: &str) -> io::Result<()> {
        self.push(line.to_string());
        Ok(())
    }
}

/// Sink writing each line followed by a record separator, encoded as bytes
/// of the configured character encoding
pub struct WriterSink<W> {
    writer: W,
    separator: String,
    encoding: &'static Encoding,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            separator: "\n".to_string(),
            encoding: UTF_8,
        }
    }

    /// Encode output with `encoding`. Characters it cannot represent fail
    /// the line with `InvalidData`.
    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding.output_encoding();
        self
    }


    pub fn with_separator(mut self, separator: &str) -> Self {
        self.separator = separator.to_string();
        self
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> LineSink for WriterSink<W> {
    fn push_line(&mut self, line: &str) -> io::Result<()> {
        write_encoded(&mut self.writer, self.encoding, line)?;
        write_encoded(&mut self.writer, self.encoding, &self.separator)
    }
}

fn write_encoded<W: Write>(writer: &mut W, encoding: &'static Encoding, text: &str) -> io::Result<()> {
    if encoding == UTF_8 {
        return writer.write_all(text.as_bytes());
    }
    let (bytes, _, unmappable) = encoding.encode(text);
    if unmappable {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("'{}' cannot be encoded as {}", text, encoding.name()),
        ));
    }
    writer.write_all(&bytes)
}
