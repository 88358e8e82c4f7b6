//! Buffered blocking stream carrying the wire protocol.

use std::io::{BufReader, BufWriter, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{Error, Result};

/// A buffered TCP connection to the backend.
///
/// Reads and writes are buffered independently; `frame` holds the payload
/// of the most recently read backend message. The buffers live exactly as
/// long as the stream: dropping the stream releases them and the socket.
pub(crate) struct Stream {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    /// Payload of the last frame read (without tag and length).
    pub(crate) frame: Vec<u8>,
}

impl Stream {
    /// Connect to `host:port`, applying `deadline` as both the connect
    /// timeout and the socket read deadline. `None` disables both.
    pub(crate) fn connect(host: &str, port: u16, deadline: Option<Duration>) -> Result<Self> {
        let stream = match deadline {
            Some(timeout) => {
                let mut last_err = None;
                let addrs = (host, port).to_socket_addrs()?;
                let mut connected = None;
                for addr in addrs {
                    match TcpStream::connect_timeout(&addr, timeout) {
                        Ok(stream) => {
                            connected = Some(stream);
                            break;
                        }
                        Err(err) => last_err = Some(err),
                    }
                }
                match connected {
                    Some(stream) => stream,
                    None => {
                        return Err(Error::Io(last_err.unwrap_or_else(|| {
                            std::io::Error::new(
                                std::io::ErrorKind::NotFound,
                                "no address resolved",
                            )
                        })));
                    }
                }
            }
            None => TcpStream::connect((host, port))?,
        };
        stream.set_nodelay(true)?;
        stream.set_read_timeout(deadline)?;

        let reader = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(reader),
            writer: BufWriter::new(stream),
            frame: Vec::with_capacity(512),
        })
    }

    /// Read one backend message into `frame`, returning its type byte.
    ///
    /// A backend message is a 1-byte tag followed by a 4-byte big-endian
    /// length that includes itself but not the tag.
    pub(crate) fn read_frame(&mut self) -> Result<u8> {
        let mut head = [0u8; 5];
        self.reader.read_exact(&mut head)?;

        let tag = head[0];
        let length = i32::from_be_bytes([head[1], head[2], head[3], head[4]]);
        if length < 4 {
            return Err(Error::Protocol(format!("invalid message length: {length}")));
        }

        let payload_len = (length - 4) as usize;
        self.frame.clear();
        self.frame.resize(payload_len, 0);
        self.reader.read_exact(&mut self.frame)?;

        Ok(tag)
    }

    /// Queue bytes on the write buffer.
    pub(crate) fn send(&mut self, buf: &[u8]) -> Result<()> {
        self.writer.write_all(buf)?;
        Ok(())
    }

    /// Flush the write buffer to the socket.
    ///
    /// Called exactly at operation boundaries so the server sees complete
    /// request groups.
    pub(crate) fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
