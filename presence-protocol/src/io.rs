//! Buffered I/O streams for the presence IPC wire format.
//!
//! This module provides efficient buffered reading and writing for the IPC
//! protocol, with type-safe methods for reading/writing primitive types in
//! the wire's little-endian byte order.
//!
//! # Examples
//!
//! ```no_run
//! use presence_protocol::io::{IpcInStream, IpcOutStream};
//! use presence_protocol::UnixSocket;
//!
//! # async fn example() -> std::io::Result<()> {
//! let socket = UnixSocket::connect("/tmp/discord-ipc-0").await?;
//! let (reader, writer) = tokio::io::split(socket);
//!
//! // Reading the packet header
//! let mut input = IpcInStream::new(reader);
//! let opcode = input.read_u32_le().await?;
//! let length = input.read_u32_le().await?;
//!
//! // Writing a packet header
//! let mut output = IpcOutStream::new(writer);
//! output.write_u32_le(0); // opcode
//! output.write_u32_le(16); // payload length
//! output.flush().await?;
//! # Ok(())
//! # }
//! ```

use bytes::{Buf, BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Buffered input stream for reading IPC protocol data.
///
/// The stream maintains an internal buffer (default 8KB) that is filled
/// on-demand. Bytes pulled in beyond what the current decode needs stay
/// buffered for the next call, so reading one packet never consumes data
/// belonging to the packet after it.
pub struct IpcInStream<R> {
    reader: R,
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> IpcInStream<R> {
    /// Create a new input stream with default buffer size (8KB).
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, 8192)
    }

    /// Create a new input stream with specified buffer capacity.
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Ensure at least `n` bytes are available in the buffer.
    ///
    /// Reads from the underlying reader until the buffer contains at least
    /// `n` bytes. Returns an error if EOF is reached before `n` bytes are
    /// available; already-buffered bytes are left in place so callers can
    /// distinguish a clean close from a mid-frame truncation.
    async fn ensure_bytes(&mut self, n: usize) -> std::io::Result<()> {
        while self.buffer.len() < n {
            let bytes_read = self.reader.read_buf(&mut self.buffer).await?;
            if bytes_read == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("expected {} bytes, got {}", n, self.buffer.len()),
                ));
            }
        }
        Ok(())
    }

    /// Read a 32-bit unsigned integer in wire byte order (little-endian).
    ///
    /// # Errors
    ///
    /// Returns an error if EOF is reached or an I/O error occurs.
    pub async fn read_u32_le(&mut self) -> std::io::Result<u32> {
        self.ensure_bytes(4).await?;
        Ok(self.buffer.get_u32_le())
    }

    /// Read exactly `buf.len()` bytes into the provided buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if EOF is reached before the buffer is filled,
    /// or if an I/O error occurs.
    pub async fn read_bytes(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        self.ensure_bytes(buf.len()).await?;
        self.buffer.copy_to_slice(buf);
        Ok(())
    }

    /// Get the number of bytes currently available in the buffer.
    ///
    /// This indicates how many bytes can be read without performing I/O.
    pub fn available(&self) -> usize {
        self.buffer.len()
    }

    /// Get a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Get a mutable reference to the underlying reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Consume the stream and return the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Buffered output stream for writing IPC protocol data.
///
/// Data is buffered internally and only written when
/// [`flush()`](Self::flush) is called. You **must** call `flush()` to
/// ensure buffered data is actually sent over the socket.
pub struct IpcOutStream<W> {
    writer: W,
    buffer: BytesMut,
}

impl<W: AsyncWrite + Unpin> IpcOutStream<W> {
    /// Create a new output stream with default buffer size (8KB).
    pub fn new(writer: W) -> Self {
        Self::with_capacity(writer, 8192)
    }

    /// Create a new output stream with specified buffer capacity.
    pub fn with_capacity(writer: W, capacity: usize) -> Self {
        Self {
            writer,
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Write a 32-bit unsigned integer in wire byte order (little-endian).
    ///
    /// The bytes are buffered and not sent until [`flush()`](Self::flush)
    /// is called.
    pub fn write_u32_le(&mut self, value: u32) {
        self.buffer.put_u32_le(value);
    }

    /// Write a byte slice to the buffer.
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Flush all buffered data to the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails or if the underlying writer's
    /// `flush()` method returns an error.
    pub async fn flush(&mut self) -> std::io::Result<()> {
        if !self.buffer.is_empty() {
            self.writer.write_all(&self.buffer).await?;
            self.buffer.clear();
        }
        self.writer.flush().await
    }

    /// Get the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Get a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Get a mutable reference to the underlying writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Consume the stream and return the underlying writer.
    ///
    /// **Warning:** Any buffered data will be lost. Call
    /// [`flush()`](Self::flush) first if you need to send buffered data.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_read_u32_le() {
        let data = vec![0x78, 0x56, 0x34, 0x12, 0x01, 0x00, 0x00, 0x00];
        let mut stream = IpcInStream::new(Cursor::new(data));

        assert_eq!(stream.read_u32_le().await.unwrap(), 0x12345678);
        assert_eq!(stream.read_u32_le().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_read_bytes() {
        let data = vec![1, 2, 3, 4, 5];
        let mut stream = IpcInStream::new(Cursor::new(data));

        let mut buf = [0u8; 3];
        stream.read_bytes(&mut buf).await.unwrap();
        assert_eq!(buf, [1, 2, 3]);

        let mut buf = [0u8; 2];
        stream.read_bytes(&mut buf).await.unwrap();
        assert_eq!(buf, [4, 5]);
    }

    #[tokio::test]
    async fn test_read_past_eof() {
        let data = vec![1, 2];
        let mut stream = IpcInStream::new(Cursor::new(data));

        let err = stream.read_u32_le().await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
        // The partial bytes stay buffered so callers can tell a truncated
        // frame from a clean close.
        assert_eq!(stream.available(), 2);
    }

    #[tokio::test]
    async fn test_available_after_buffered_read() {
        // One read may pull in more than requested; the surplus stays
        // available for the next call.
        let data = vec![0x01, 0x00, 0x00, 0x00, 0xAA, 0xBB];
        let mut stream = IpcInStream::new(Cursor::new(data));

        assert_eq!(stream.read_u32_le().await.unwrap(), 1);
        assert_eq!(stream.available(), 2);

        let mut buf = [0u8; 2];
        stream.read_bytes(&mut buf).await.unwrap();
        assert_eq!(buf, [0xAA, 0xBB]);
        assert_eq!(stream.available(), 0);
    }

    #[tokio::test]
    async fn test_write_and_flush() {
        let mut stream = IpcOutStream::new(Vec::new());

        stream.write_u32_le(0x12345678);
        stream.write_bytes(b"abc");
        assert_eq!(stream.buffered(), 7);

        stream.flush().await.unwrap();
        assert_eq!(stream.buffered(), 0);
        assert_eq!(stream.get_ref(), &[0x78, 0x56, 0x34, 0x12, b'a', b'b', b'c']);
    }

    #[tokio::test]
    async fn test_flush_empty_buffer() {
        let mut stream = IpcOutStream::new(Vec::new());
        stream.flush().await.unwrap();
        assert!(stream.get_ref().is_empty());
    }
}
