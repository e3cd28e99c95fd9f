//! # TCP Stream
//!
//! Networked realization of the duplex contract. Frames are cut by a
//! [`LengthDelimitedCodec`]: a 4-byte big-endian length followed by a
//! bincode-encoded [`Message`].
//!
//! The codec is only handed complete frames, so the read buffer grows with
//! the bytes that arrive rather than with the length a header announces.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use snap_types::Message;
use std::io;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::{
    Decoder, Encoder, FramedRead, FramedWrite, LengthDelimitedCodec, LengthDelimitedCodecError,
};
use tracing::{debug, warn};

use crate::duplex::{DuplexStream, MessageSink, MessageSource, StreamError};
use crate::DEFAULT_MAX_FRAME_SIZE;

/// Length of the frame header.
const HEADER_LEN: usize = 4;

/// Length-delimited frames with a size limit.
struct FrameCodec {
    inner: LengthDelimitedCodec,
    max_frame_size: usize,
}

impl FrameCodec {
    fn new(max_frame_size: usize) -> Self {
        Self {
            inner: LengthDelimitedCodec::builder()
                .length_field_length(HEADER_LEN)
                .big_endian()
                .max_frame_length(max_frame_size)
                .new_codec(),
            max_frame_size,
        }
    }
}

impl Decoder for FrameCodec {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>, io::Error> {
        if src.len() >= HEADER_LEN {
            let announced = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
            // Oversized headers fall through so the codec rejects them.
            if announced <= self.max_frame_size && src.len() < HEADER_LEN + announced {
                return Ok(None);
            }
        }
        self.inner.decode(src)
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, frame: Bytes, dst: &mut BytesMut) -> Result<(), io::Error> {
        self.inner.encode(frame, dst)
    }
}

/// Codec failures surface as `io::Error`; an oversized frame is reported
/// as its own variant.
fn frame_error(e: io::Error, max: usize) -> StreamError {
    let too_large = e
        .get_ref()
        .map_or(false, |inner| inner.is::<LengthDelimitedCodecError>());
    if too_large {
        StreamError::FrameTooLarge { max }
    } else {
        StreamError::Io(e)
    }
}

/// A framed message stream over one TCP connection.
pub struct TcpMessageStream {
    stream: TcpStream,
    max_frame_size: usize,
}

impl TcpMessageStream {
    /// Wrap an established connection.
    #[must_use]
    pub fn new(stream: TcpStream, max_frame_size: usize) -> Self {
        Self {
            stream,
            max_frame_size,
        }
    }

    /// Dial a peer with the default frame limit.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, StreamError> {
        Self::connect_with_limit(addr, DEFAULT_MAX_FRAME_SIZE).await
    }

    /// Dial a peer with an explicit frame limit.
    pub async fn connect_with_limit(
        addr: impl ToSocketAddrs,
        max_frame_size: usize,
    ) -> Result<Self, StreamError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        debug!(peer = ?stream.peer_addr().ok(), "connected to peer");
        Ok(Self::new(stream, max_frame_size))
    }
}

impl DuplexStream for TcpMessageStream {
    fn split(self) -> (Box<dyn MessageSink>, Box<dyn MessageSource>) {
        let (read, write) = self.stream.into_split();
        let max_frame_size = self.max_frame_size;
        (
            Box::new(TcpSink {
                writer: Some(FramedWrite::new(write, FrameCodec::new(max_frame_size))),
                max_frame_size,
            }),
            Box::new(TcpSource {
                reader: FramedRead::new(read, FrameCodec::new(max_frame_size)),
                max_frame_size,
            }),
        )
    }
}

/// Write half of a TCP stream.
pub struct TcpSink {
    writer: Option<FramedWrite<OwnedWriteHalf, FrameCodec>>,
    max_frame_size: usize,
}

#[async_trait]
impl MessageSink for TcpSink {
    async fn send(&mut self, msg: Message) -> Result<(), StreamError> {
        let writer = self.writer.as_mut().ok_or(StreamError::Closed)?;
        let body = msg.to_bytes()?;
        if body.len() > self.max_frame_size {
            return Err(StreamError::FrameTooLarge {
                max: self.max_frame_size,
            });
        }
        writer
            .send(Bytes::from(body))
            .await
            .map_err(|e| frame_error(e, self.max_frame_size))
    }

    async fn close_send(&mut self) -> Result<(), StreamError> {
        if let Some(mut writer) = self.writer.take() {
            writer.close().await?;
            debug!("tcp stream write side closed");
        }
        Ok(())
    }
}

/// Read half of a TCP stream.
pub struct TcpSource {
    reader: FramedRead<OwnedReadHalf, FrameCodec>,
    max_frame_size: usize,
}

#[async_trait]
impl MessageSource for TcpSource {
    async fn recv(&mut self) -> Result<Option<Message>, StreamError> {
        match self.reader.next().await {
            None => Ok(None),
            Some(Ok(frame)) => Ok(Some(Message::from_bytes(&frame)?)),
            Some(Err(e)) => {
                let err = frame_error(e, self.max_frame_size);
                warn!(error = %err, "failed to read frame");
                Err(err)
            }
        }
    }
}
