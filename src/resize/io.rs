//! Blocking `Read`/`Write` adapters between the async pipeline and the codecs.

use bytes::{Bytes, BytesMut};
use std::io::{self, Read, Seek, SeekFrom, Write};
use tokio::sync::mpsc::Sender;

/// Bytes of the source kept around so decoders can sniff and rewind.
pub const PREFIX_WINDOW: usize = 64 * 1024;

/// Size of the chunks handed to the writer.
pub const OUTPUT_CHUNK_SIZE: usize = 64 * 1024;

/// A forward only reader that still satisfies decoders asking for `Seek`.
///
/// The first `window` bytes are retained, seeking back inside them is served
/// from memory, seeking forward skips input. Anything else is `Unsupported`.
#[derive(Debug)]
pub struct SourceReader<R> {
    inner: R,
    prefix: Vec<u8>,
    window: usize,
    pos: u64,
    consumed: u64,
}

impl<R: Read> SourceReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_window(inner, PREFIX_WINDOW)
    }

    pub const fn with_window(inner: R, window: usize) -> Self {
        Self {
            inner,
            prefix: Vec::new(),
            window,
            pos: 0,
            consumed: 0,
        }
    }

    /// Total bytes pulled from the inner reader
    pub const fn consumed(&self) -> u64 {
        self.consumed
    }

    fn pull(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        let room = self.window.saturating_sub(self.prefix.len());
        if room > 0 {
            self.prefix.extend(buf.iter().take(n.min(room)).copied());
        }
        self.consumed += n as u64;
        Ok(n)
    }

    fn skip_to_pos(&mut self) -> io::Result<()> {
        let mut scratch = vec![0u8; 8 * 1024];
        while self.consumed < self.pos {
            let want = usize::try_from(self.pos - self.consumed)
                .unwrap_or(usize::MAX)
                .min(scratch.len());
            let n = match scratch.get_mut(..want) {
                Some(chunk) => self.pull(chunk)?,
                None => 0,
            };
            if n == 0 {
                break;
            }
        }
        Ok(())
    }
}

impl<R: Read> Read for SourceReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        // served from the retained prefix
        if let Some(retained) = usize::try_from(self.pos)
            .ok()
            .and_then(|pos| self.prefix.get(pos..))
            .filter(|retained| !retained.is_empty())
        {
            let n = retained.len().min(buf.len());
            for (dst, src) in buf.iter_mut().zip(retained.iter().take(n)) {
                *dst = *src;
            }
            self.pos += n as u64;
            return Ok(n);
        }

        if self.pos < self.consumed {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("read at {} is past the retained window", self.pos),
            ));
        }

        if self.pos > self.consumed {
            self.skip_to_pos()?;
            if self.pos > self.consumed {
                return Ok(0);
            }
        }

        let n = self.pull(buf)?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<R: Read> Seek for SourceReader<R> {
    fn seek(&mut self, from: SeekFrom) -> io::Result<u64> {
        let target = match from {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
            SeekFrom::End(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "source stream length is unknown",
                ));
            }
        }
        .ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of stream")
        })?;

        // bytes between the window and what was read are gone
        if target < self.consumed && target >= self.prefix.len() as u64 && target != self.pos {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!(
                    "cannot seek back to {target}, only the first {} bytes are retained",
                    self.prefix.len()
                ),
            ));
        }

        self.pos = target;
        Ok(target)
    }
}

/// Collects encoder output into fixed size chunks and hands them to the writer.
///
/// `blocking_send` parks the encoder while the channel is full, a dropped
/// receiver shows up as `BrokenPipe`.
#[derive(Debug)]
pub struct ChunkWriter {
    tx: Sender<io::Result<Bytes>>,
    buf: BytesMut,
    chunk_size: usize,
    written: u64,
}

impl ChunkWriter {
    #[must_use]
    pub fn new(tx: Sender<io::Result<Bytes>>) -> Self {
        Self::with_chunk_size(tx, OUTPUT_CHUNK_SIZE)
    }

    #[must_use]
    pub fn with_chunk_size(tx: Sender<io::Result<Bytes>>, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            tx,
            buf: BytesMut::with_capacity(chunk_size),
            chunk_size,
            written: 0,
        }
    }

    /// The receiving side is gone, nothing written from now on is read
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, chunk: Bytes) -> io::Result<()> {
        self.tx
            .blocking_send(Ok(chunk))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "output receiver dropped"))
    }

    /// Send whatever is buffered and close the stream
    ///
    /// # Errors
    ///
    /// Will return `BrokenPipe` if the receiver is gone
    pub fn finish(mut self) -> io::Result<u64> {
        self.flush()?;
        Ok(self.written)
    }

    /// Terminate the stream with an error so the writer never commits a partial object
    pub fn fail(self, err: io::Error) {
        // receiver gone means nobody is left to tell
        let _ = self.tx.blocking_send(Err(err));
    }
}

impl Write for ChunkWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let room = self.chunk_size - self.buf.len();
        let n = data.len().min(room);
        self.buf.extend_from_slice(data.get(..n).unwrap_or_default());
        self.written += n as u64;

        if self.buf.len() >= self.chunk_size {
            let chunk = self.buf.split().freeze();
            self.send(chunk)?;
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            let chunk = self.buf.split().freeze();
            self.send(chunk)?;
        }
        Ok(())
    }
}

/// Fails reads with `BrokenPipe` once the output receiver is dropped.
///
/// Wraps the source of a transform so an abandoned request releases its
/// source stream without decoding the rest of it.
#[derive(Debug)]
pub struct UntilClosed<R> {
    inner: R,
    output: Sender<io::Result<Bytes>>,
}

impl<R: Read> UntilClosed<R> {
    pub const fn new(inner: R, output: Sender<io::Result<Bytes>>) -> Self {
        Self { inner, output }
    }
}

impl<R: Read> Read for UntilClosed<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.output.is_closed() {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "output receiver dropped",
            ));
        }
        self.inner.read(buf)
    }
}
