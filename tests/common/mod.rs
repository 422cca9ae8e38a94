//! A stub Redis server backed by a `MemoryStore`, speaking just enough RESP for the
//! `redis` crate to talk to it.

use std::{
    io::Cursor,
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use bytes::{Buf, Bytes, BytesMut};
use redload::{Error, MemoryStore, Reply, Store};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

/// A frame in the Redis serialization protocol
#[derive(Debug, PartialEq)]
pub enum Frame {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(Bytes),
    Array(Vec<Frame>),
    Null,
}

#[derive(Debug, PartialEq)]
pub enum FrameError {
    Incomplete,
    BadEncoding,
}

impl Frame {
    /// Parse a frame from the reader, `Incomplete` means more bytes are needed.
    pub fn parse(reader: &mut Cursor<&[u8]>) -> Result<Self, FrameError> {
        if !reader.has_remaining() {
            return Err(FrameError::Incomplete);
        }
        match reader.get_u8() {
            b'+' => Ok(Frame::SimpleString(get_string(reader)?)),
            b'-' => Ok(Frame::Error(get_string(reader)?)),
            b':' => Ok(Frame::Integer(get_integer(reader)?)),
            b'$' => {
                let len = get_integer(reader)?;
                if len == -1 {
                    return Ok(Frame::Null);
                }
                let len = usize::try_from(len).map_err(|_| FrameError::BadEncoding)?;
                if reader.remaining() < len + 2 {
                    return Err(FrameError::Incomplete);
                }
                let bytes = reader.copy_to_bytes(len);
                reader.advance(2);
                Ok(Frame::BulkString(bytes))
            }
            b'*' => {
                let len = get_integer(reader)?;
                let len = usize::try_from(len).map_err(|_| FrameError::BadEncoding)?;
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(Frame::parse(reader)?);
                }
                Ok(Frame::Array(items))
            }
            _ => Err(FrameError::BadEncoding),
        }
    }

    /// Append the wire representation of the frame to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            Frame::SimpleString(s) => buf.extend_from_slice(format!("+{}\r\n", s).as_bytes()),
            Frame::Error(e) => buf.extend_from_slice(format!("-{}\r\n", e).as_bytes()),
            Frame::Integer(n) => buf.extend_from_slice(format!(":{}\r\n", n).as_bytes()),
            Frame::BulkString(b) => {
                buf.extend_from_slice(format!("${}\r\n", b.len()).as_bytes());
                buf.extend_from_slice(b);
                buf.extend_from_slice(b"\r\n");
            }
            Frame::Array(items) => {
                buf.extend_from_slice(format!("*{}\r\n", items.len()).as_bytes());
                for item in items {
                    item.encode(buf);
                }
            }
            Frame::Null => buf.extend_from_slice(b"$-1\r\n"),
        }
    }
}

impl From<Reply> for Frame {
    fn from(reply: Reply) -> Self {
        match reply {
            Reply::Nil => Frame::Null,
            Reply::Integer(n) => Frame::Integer(n),
            Reply::Bulk(b) => Frame::BulkString(b),
            Reply::Status(s) => Frame::SimpleString(s),
            Reply::Double(d) => Frame::BulkString(d.to_string().into()),
            Reply::Boolean(b) => Frame::Integer(b as i64),
            Reply::Sequence(items) => Frame::Array(items.into_iter().map(Frame::from).collect()),
            // RESP2 has no maps, pairs are flattened into an array
            Reply::Mapping(pairs) => Frame::Array(
                pairs
                    .into_iter()
                    .flat_map(|(k, v)| [Frame::from(k), Frame::from(v)])
                    .collect(),
            ),
            Reply::Other(s) => Frame::Error(format!("ERR unsupported reply {}", s)),
        }
    }
}

fn get_line<'a>(reader: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], FrameError> {
    let start = reader.position() as usize;
    let buf: &'a [u8] = reader.get_ref();
    match buf[start..].windows(2).position(|w| w == b"\r\n") {
        Some(n) => {
            reader.set_position((start + n + 2) as u64);
            Ok(&buf[start..start + n])
        }
        None => Err(FrameError::Incomplete),
    }
}

fn get_string(reader: &mut Cursor<&[u8]>) -> Result<String, FrameError> {
    let line = get_line(reader)?;
    String::from_utf8(line.to_vec()).map_err(|_| FrameError::BadEncoding)
}

fn get_integer(reader: &mut Cursor<&[u8]>) -> Result<i64, FrameError> {
    get_string(reader)?
        .parse()
        .map_err(|_| FrameError::BadEncoding)
}

/// Handle to a running stub server.
pub struct StubServer {
    addr: SocketAddr,
    store: MemoryStore,
    connections: Arc<AtomicUsize>,
    commands: Arc<Mutex<Vec<Vec<String>>>>,
    sessions: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl StubServer {
    /// Bind to an ephemeral local port and start accepting connections.
    pub async fn start() -> Self {
        Self::start_on("127.0.0.1:0").await
    }

    /// Bind to `addr` and start accepting connections.
    pub async fn start_on(addr: &str) -> Self {
        let listener = TcpListener::bind(addr).await.unwrap();
        let server = Self {
            addr: listener.local_addr().unwrap(),
            store: MemoryStore::default(),
            connections: Arc::default(),
            commands: Arc::default(),
            sessions: Arc::default(),
        };

        let store = server.store.clone();
        let connections = Arc::clone(&server.connections);
        let commands = Arc::clone(&server.commands);
        let sessions = Arc::clone(&server.sessions);
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                connections.fetch_add(1, Ordering::SeqCst);
                let session = tokio::spawn(serve(socket, store.clone(), Arc::clone(&commands)));
                sessions.lock().unwrap().push(session);
            }
        });
        server
    }

    /// Close every open client connection while the server keeps listening.
    pub fn disconnect_all(&self) {
        for session in self.sessions.lock().unwrap().drain(..) {
            session.abort();
        }
    }

    /// The `host:port` address the server listens on.
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// The store that commands are applied to.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Number of connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Every command received so far, with its arguments.
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.commands.lock().unwrap().clone()
    }

    /// Number of received commands named `name`.
    pub fn count(&self, name: &str) -> usize {
        self.commands()
            .iter()
            .filter(|c| c[0].eq_ignore_ascii_case(name))
            .count()
    }
}

async fn serve(mut socket: TcpStream, store: MemoryStore, commands: Arc<Mutex<Vec<Vec<String>>>>) {
    let mut buffer = BytesMut::with_capacity(4 * 1024);
    loop {
        let frame = {
            let mut cursor = Cursor::new(&buffer[..]);
            match Frame::parse(&mut cursor) {
                Ok(frame) => {
                    let len = cursor.position() as usize;
                    Some((frame, len))
                }
                Err(FrameError::Incomplete) => None,
                Err(FrameError::BadEncoding) => return,
            }
        };

        let (frame, len) = match frame {
            Some(parsed) => parsed,
            None => match socket.read_buf(&mut buffer).await {
                Ok(0) | Err(_) => return,
                Ok(_) => continue,
            },
        };
        buffer.advance(len);

        let response = match command_of(frame) {
            Some(args) => {
                commands.lock().unwrap().push(args.clone());
                let argv: Vec<&str> = args[1..].iter().map(String::as_str).collect();
                match store.exec(&args[0], &argv).await {
                    Ok(reply) => Frame::from(reply),
                    Err(Error::CommandFailed(msg)) => Frame::Error(msg),
                    Err(err) => Frame::Error(format!("ERR {}", err)),
                }
            }
            None => Frame::Error("ERR protocol error".to_string()),
        };

        let mut out = Vec::new();
        response.encode(&mut out);
        if socket.write_all(&out).await.is_err() {
            return;
        }
    }
}

fn command_of(frame: Frame) -> Option<Vec<String>> {
    match frame {
        Frame::Array(items) if !items.is_empty() => items
            .into_iter()
            .map(|item| match item {
                Frame::BulkString(b) => String::from_utf8(b.to_vec()).ok(),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

#[tokio::test]
async fn frames_roundtrip_through_the_codec() {
    let frames = vec![
        Frame::SimpleString("OK".to_string()),
        Frame::Error("ERR unknown command 'foobar'".to_string()),
        Frame::Integer(-42),
        Frame::BulkString("hello\r\nworld".into()),
        Frame::Null,
        Frame::Array(vec![Frame::BulkString("foo".into()), Frame::Null, Frame::Integer(1)]),
    ];
    for frame in frames {
        let mut buf = Vec::new();
        frame.encode(&mut buf);
        let parsed = Frame::parse(&mut Cursor::new(&buf[..])).unwrap();
        assert_eq!(parsed, frame);

        // every strict prefix is incomplete
        for end in 0..buf.len() {
            assert_eq!(
                Frame::parse(&mut Cursor::new(&buf[..end])),
                Err(FrameError::Incomplete)
            );
        }
    }
}
