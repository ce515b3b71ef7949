//! Output sinks that filter stages write into.

use crate::error::{PdfError, Result};

/// Append-only byte sink.
///
/// `write` returns how many bytes were accepted. A sink that accepts fewer
/// bytes than offered has failed; the filter engine reports that as
/// [`PdfError::ShortWrite`] instead of retrying.
pub trait OutputSink {
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Make previously written bytes durable. Called once at the end of a
    /// successful session.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl OutputSink for Vec<u8> {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.extend_from_slice(data);
        Ok(data.len())
    }
}

impl<T: OutputSink + ?Sized> OutputSink for &mut T {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        (**self).write(data)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

impl<T: OutputSink + ?Sized> OutputSink for Box<T> {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        (**self).write(data)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Adapts any [`std::io::Write`] into an [`OutputSink`].
#[derive(Debug)]
pub struct WriteSink<W>(pub W);

impl<W: std::io::Write> WriteSink<W> {
    pub fn new(inner: W) -> Self {
        Self(inner)
    }

    pub fn into_inner(self) -> W {
        self.0
    }
}

impl<W: std::io::Write> OutputSink for WriteSink<W> {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.0.write_all(data)?;
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<()> {
        self.0.flush()?;
        Ok(())
    }
}

/// Write all of `data` to `sink`, failing on a partial write.
pub(crate) fn put(sink: &mut dyn OutputSink, data: &[u8]) -> Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    let written = sink.write(data)?;
    if written != data.len() {
        return Err(PdfError::ShortWrite {
            expected: data.len(),
            written,
        });
    }
    Ok(())
}
