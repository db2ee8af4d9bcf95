// ABOUTME: TCP transport for SMPP sessions, split into an owned reader and writer
// ABOUTME: The reader feeds a restartable PduDecoder; the writer encodes and flushes one frame at a time

use crate::codec::{CodecError, Encodable, Frame, PduDecoder};
use bytes::BytesMut;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::trace;

/// An SMPP link over TCP.
///
/// Used whole by tests and the mock SMSC; sessions split it so that reads
/// run on their own task while writes stay with the caller.
#[derive(Debug)]
pub struct Connection {
    reader: ConnectionReader,
    writer: ConnectionWriter,
}

impl Connection {
    pub fn new(socket: TcpStream) -> Self {
        let (read_half, write_half) = socket.into_split();
        Self {
            reader: ConnectionReader::new(read_half),
            writer: ConnectionWriter::new(write_half),
        }
    }

    /// Open a TCP connection to `host:port`, giving up after `connect_timeout`
    pub async fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
    ) -> Result<Self, ConnectionError> {
        let socket = tokio::time::timeout(connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| ConnectionError::ConnectTimeout(connect_timeout))??;
        socket.set_nodelay(true)?;
        Ok(Self::new(socket))
    }

    pub async fn read_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        self.reader.read_frame().await
    }

    pub async fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        self.writer.write_frame(frame).await
    }

    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.writer.shutdown().await
    }

    /// Split the connection into read and write halves for concurrent use
    pub fn into_split(self) -> (ConnectionReader, ConnectionWriter) {
        (self.reader, self.writer)
    }
}

/// Read half of a split connection
#[derive(Debug)]
pub struct ConnectionReader {
    stream: OwnedReadHalf,
    decoder: PduDecoder,
}

impl ConnectionReader {
    fn new(stream: OwnedReadHalf) -> Self {
        Self {
            stream,
            decoder: PduDecoder::new(),
        }
    }

    /// Read a single frame from the connection.
    ///
    /// Returns `Ok(None)` when the peer closed the connection cleanly between
    /// frames. A recoverable `ConnectionError::Codec` leaves the stream
    /// aligned, so the caller may keep reading.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        loop {
            if let Some(frame) = self.decoder.decode_next()? {
                return Ok(Some(frame));
            }

            if 0 == self.stream.read_buf(self.decoder.buffer_mut()).await? {
                return if self.decoder.buffered() == 0 {
                    Ok(None)
                } else {
                    Err(ConnectionError::IncompleteFrame)
                };
            }
        }
    }
}

/// Write half of a split connection
#[derive(Debug)]
pub struct ConnectionWriter {
    stream: BufWriter<OwnedWriteHalf>,
    shut_down: bool,
}

impl ConnectionWriter {
    fn new(stream: OwnedWriteHalf) -> Self {
        Self {
            stream: BufWriter::new(stream),
            shut_down: false,
        }
    }

    /// Encode, write and flush one frame
    pub async fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        let mut buf = BytesMut::with_capacity(frame.encoded_size());
        frame
            .encode(&mut buf)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        self.stream.write_all(&buf).await?;
        self.stream.flush().await?;
        trace!(
            command_id = ?frame.command_id(),
            sequence_number = frame.sequence_number(),
            "wrote frame"
        );
        Ok(())
    }

    /// Flush and shut down the write direction. Calling it again is a no-op.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;
        self.stream.shutdown().await
    }
}

/// Connection-level errors
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("Connection closed with incomplete frame")]
    IncompleteFrame,
}

impl ConnectionError {
    /// Whether reading can continue after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ConnectionError::Codec(e) if e.is_recoverable())
    }
}
