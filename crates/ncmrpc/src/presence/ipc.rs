//! Discord local RPC over its IPC endpoint.
//!
//! Every message is a frame of `opcode: u32 LE`, `length: u32 LE` and a JSON
//! payload of `length` bytes.

use std::io::{self, Read, Write};

use serde_json::{Value, json};
use strum::FromRepr;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::presence::{Activity, PresenceClient};

/// Frames larger than this are treated as a protocol error
const MAX_FRAME_SIZE: usize = 64 * 1024;
const IPC_VERSION: u32 = 1;
/// Discord probes `discord-ipc-0` through `discord-ipc-9`
const ENDPOINT_COUNT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u32)]
pub enum Opcode {
    Handshake = 0,
    Frame = 1,
    Close = 2,
    Ping = 3,
    Pong = 4,
}

pub fn encode_frame(opcode: Opcode, payload: &Value) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(payload)?;
    let mut frame = Vec::with_capacity(8 + body.len());
    frame.extend_from_slice(&(opcode as u32).to_le_bytes());
    frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

pub fn write_frame<W: Write + ?Sized>(writer: &mut W, opcode: Opcode, payload: &Value) -> Result<()> {
    let frame = encode_frame(opcode, payload)?;
    writer.write_all(&frame).map_err(map_io_error)?;
    writer.flush().map_err(map_io_error)
}

pub fn read_frame<R: Read + ?Sized>(reader: &mut R) -> Result<(Opcode, Value)> {
    let mut header = [0u8; 8];
    reader.read_exact(&mut header).map_err(map_io_error)?;

    let raw_opcode = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let length = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
    let opcode = Opcode::from_repr(raw_opcode)
        .ok_or_else(|| Error::Presence(format!("unknown opcode {}", raw_opcode)))?;
    if length > MAX_FRAME_SIZE {
        return Err(Error::Presence(format!("frame too large: {} bytes", length)));
    }

    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).map_err(map_io_error)?;
    let payload = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)?
    };
    Ok((opcode, payload))
}

/// A closed or reset endpoint is `ChannelClosed`; anything else stays an IO error.
fn map_io_error(e: io::Error) -> Error {
    match e.kind() {
        io::ErrorKind::UnexpectedEof
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected => Error::ChannelClosed,
        _ => Error::Io(e),
    }
}

/// Byte stream to the Discord client
pub trait Transport: Read + Write {}

impl<T: Read + Write> Transport for T {}

pub type Connector = Box<dyn FnMut() -> Result<Box<dyn Transport>>>;

/// Open the first Discord IPC endpoint that accepts a connection.
pub fn open_transport() -> Result<Box<dyn Transport>> {
    for path in endpoint_paths() {
        match open_endpoint(&path) {
            Ok(transport) => {
                debug!("Connected to IPC endpoint {}", path.display());
                return Ok(transport);
            }
            Err(e) => trace!("IPC endpoint {} unavailable: {}", path.display(), e),
        }
    }
    Err(Error::PresenceUnavailable(
        "no Discord IPC endpoint found, is Discord running?".to_string(),
    ))
}

#[cfg(windows)]
fn endpoint_paths() -> Vec<std::path::PathBuf> {
    (0..ENDPOINT_COUNT)
        .map(|i| std::path::PathBuf::from(format!(r"\\?\pipe\discord-ipc-{}", i)))
        .collect()
}

#[cfg(windows)]
fn open_endpoint(path: &std::path::Path) -> io::Result<Box<dyn Transport>> {
    let pipe = std::fs::OpenOptions::new().read(true).write(true).open(path)?;
    Ok(Box::new(pipe))
}

#[cfg(unix)]
fn endpoint_paths() -> Vec<std::path::PathBuf> {
    let dirs: Vec<std::path::PathBuf> = ["XDG_RUNTIME_DIR", "TMPDIR", "TMP", "TEMP"]
        .iter()
        .filter_map(std::env::var_os)
        .map(std::path::PathBuf::from)
        .chain(std::iter::once(std::path::PathBuf::from("/tmp")))
        .collect();
    dirs.iter()
        .flat_map(|dir| (0..ENDPOINT_COUNT).map(move |i| dir.join(format!("discord-ipc-{}", i))))
        .collect()
}

#[cfg(unix)]
fn open_endpoint(path: &std::path::Path) -> io::Result<Box<dyn Transport>> {
    let stream = std::os::unix::net::UnixStream::connect(path)?;
    stream.set_read_timeout(Some(std::time::Duration::from_secs(5)))?;
    Ok(Box::new(stream))
}

#[cfg(not(any(windows, unix)))]
fn endpoint_paths() -> Vec<std::path::PathBuf> {
    Vec::new()
}

#[cfg(not(any(windows, unix)))]
fn open_endpoint(_path: &std::path::Path) -> io::Result<Box<dyn Transport>> {
    Err(io::Error::from(io::ErrorKind::Unsupported))
}

pub struct DiscordIpcClient {
    client_id: String,
    connector: Connector,
    stream: Option<Box<dyn Transport>>,
    nonce: u64,
}

impl DiscordIpcClient {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self::with_connector(client_id, Box::new(open_transport))
    }

    pub fn with_connector(client_id: impl Into<String>, connector: Connector) -> Self {
        Self {
            client_id: client_id.into(),
            connector,
            stream: None,
            nonce: 0,
        }
    }

    fn stream(&mut self) -> Result<&mut Box<dyn Transport>> {
        self.stream.as_mut().ok_or(Error::ChannelClosed)
    }

    /// Read until a non-ping frame arrives, answering pings on the way.
    fn read_reply(&mut self) -> Result<Value> {
        loop {
            let stream = self.stream()?;
            let (opcode, payload) = read_frame(stream.as_mut())?;
            match opcode {
                Opcode::Frame => return Ok(payload),
                Opcode::Ping => write_frame(stream.as_mut(), Opcode::Pong, &payload)?,
                Opcode::Pong => {}
                Opcode::Close => {
                    debug!("IPC endpoint closed the connection: {}", payload);
                    self.stream = None;
                    return Err(Error::ChannelClosed);
                }
                Opcode::Handshake => {
                    return Err(Error::Presence("unexpected handshake frame".to_string()));
                }
            }
        }
    }

    fn command(&mut self, command: &str, args: Value) -> Result<Value> {
        self.nonce += 1;
        let payload = json!({
            "cmd": command,
            "args": args,
            "nonce": self.nonce.to_string(),
        });
        let sent = write_frame(self.stream()?.as_mut(), Opcode::Frame, &payload);
        let result = sent.and_then(|_| self.read_reply());

        let reply = match result {
            Ok(reply) => reply,
            Err(Error::ChannelClosed) => {
                self.stream = None;
                return Err(Error::ChannelClosed);
            }
            Err(e) => return Err(e),
        };

        if reply["evt"] == "ERROR" {
            let message = reply["data"]["message"].as_str().unwrap_or("unknown error");
            return Err(Error::Presence(format!("{} rejected: {}", command, message)));
        }
        Ok(reply)
    }
}

impl PresenceClient for DiscordIpcClient {
    fn connect(&mut self) -> Result<()> {
        let mut stream = (self.connector)()?;
        let handshake = json!({ "v": IPC_VERSION, "client_id": self.client_id });
        write_frame(stream.as_mut(), Opcode::Handshake, &handshake)?;
        self.stream = Some(stream);

        let ready = match self.read_reply() {
            Ok(reply) => reply,
            Err(Error::ChannelClosed) => {
                self.stream = None;
                return Err(Error::PresenceUnavailable(
                    "Discord refused the handshake".to_string(),
                ));
            }
            Err(e) => {
                self.stream = None;
                return Err(e);
            }
        };
        if ready["evt"] != "READY" {
            self.stream = None;
            return Err(Error::Presence(format!("unexpected handshake reply: {}", ready)));
        }

        debug!(
            "Presence handshake complete (user: {})",
            ready["data"]["user"]["username"].as_str().unwrap_or("?")
        );
        Ok(())
    }

    fn set_activity(&mut self, pid: u32, activity: &Activity) -> Result<()> {
        let activity = serde_json::to_value(activity)?;
        self.command("SET_ACTIVITY", json!({ "pid": pid, "activity": activity }))?;
        Ok(())
    }

    fn clear(&mut self, pid: u32) -> Result<()> {
        self.command("SET_ACTIVITY", json!({ "pid": pid, "activity": null }))?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            write_frame(stream.as_mut(), Opcode::Close, &json!({}))?;
        }
        Ok(())
    }
}
