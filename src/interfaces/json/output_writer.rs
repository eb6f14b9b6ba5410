use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// Writes provider results as pretty-printed JSON documents.
pub struct OutputWriter<W: Write> {
    writer: W,
}

impl<W: Write> OutputWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write<T: Serialize>(&mut self, value: &T) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, value)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}
