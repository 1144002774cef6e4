#![allow(dead_code)]

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use queue_exporter::config::Config;
use queue_exporter::scan::KeyPatternSet;
use queue_exporter::snapshot::MergePolicy;
use queue_exporter::store::{DatabaseIndex, MemoryStore};
use queue_exporter::ExporterEngine;

pub const HELP_LINE: &str = "# HELP redis_queue_length Length of Redis queue";
pub const TYPE_LINE: &str = "# TYPE redis_queue_length gauge";

// ========================================
// FIXTURES
// ========================================

/// db0: list `jobs` (5) + string `config`; db2: list `emails` (0).
pub fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.set_list(0, "jobs", 5);
    store.set_string(0, "config", "{\"workers\":4}");
    store.set_list(2, "emails", 0);
    store
}

pub fn config_with(policy: MergePolicy, patterns: &str) -> Config {
    let mut config = Config::default();
    config.scan.merge_policy = policy;
    config.scan.key_patterns = KeyPatternSet::parse(patterns).expect("valid patterns");
    config.store.timeout_ms = 500;
    config
}

pub fn engine_with(store: &MemoryStore, policy: MergePolicy, patterns: &str) -> ExporterEngine {
    ExporterEngine::with_store(config_with(policy, patterns), Arc::new(store.clone()))
}

/// Data lines of a render, without the header comments.
pub fn data_lines(rendered: &str) -> BTreeSet<String> {
    rendered
        .lines()
        .filter(|line| !line.starts_with('#') && !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn line(db: DatabaseIndex, queue: &str, len: u64) -> String {
    format!("redis_queue_length{{db=\"{}\",queue=\"{}\"}} {}", db, queue, len)
}

pub fn lines(expected: &[(DatabaseIndex, &str, u64)]) -> BTreeSet<String> {
    expected.iter().map(|(db, q, len)| line(*db, q, *len)).collect()
}

// ========================================
// FAKE REDIS SERVER
// ========================================

/// Deviations from a well-behaved server.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Quirk {
    #[default]
    None,
    /// Closes the connection, without replying, when this command arrives.
    DropOn(&'static str),
    /// Answers `list` to every TYPE, so LLEN on other types hits WRONGTYPE.
    EverythingIsAList,
}

pub struct FakeRedis {
    pub addr: SocketAddr,
    commands: Arc<Mutex<Vec<String>>>,
}

impl FakeRedis {
    /// Command names received so far, upper-cased, across all connections.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }
}

/// Serves PING / SELECT / INFO / KEYS / TYPE / LLEN / QUIT from `store` on an ephemeral port.
pub async fn spawn_fake_redis(store: MemoryStore) -> SocketAddr {
    spawn_fake_redis_with(store, Quirk::None).await.addr
}

pub async fn spawn_fake_redis_with(store: MemoryStore, quirk: Quirk) -> FakeRedis {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let commands = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&commands);
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            let store = store.clone();
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                let _ = serve_connection(socket, store, quirk, log).await;
            });
        }
    });
    FakeRedis { addr, commands }
}

/// Accepts connections and never answers.
pub async fn spawn_silent_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

type ServeResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

async fn serve_connection(
    socket: TcpStream,
    store: MemoryStore,
    quirk: Quirk,
    log: Arc<Mutex<Vec<String>>>,
) -> ServeResult {
    let (read, mut write) = socket.into_split();
    let mut reader = BufReader::new(read);
    let mut db: DatabaseIndex = 0;

    while let Some(args) = read_command(&mut reader).await? {
        let Some(name) = args.first().map(|c| String::from_utf8_lossy(c).to_ascii_uppercase()) else {
            continue;
        };
        log.lock().push(name.clone());
        if matches!(quirk, Quirk::DropOn(cmd) if cmd == name) {
            return Ok(());
        }
        let arg = |i: usize| args.get(i).map(Vec::as_slice).unwrap_or_default();

        let mut reply = Vec::new();
        match name.as_str() {
            "PING" => simple(&mut reply, "PONG"),
            "CLIENT" => simple(&mut reply, "OK"),
            "SELECT" => match String::from_utf8_lossy(arg(1)).parse() {
                Ok(n) => {
                    db = n;
                    simple(&mut reply, "OK");
                }
                Err(_) => error(&mut reply, "ERR value is not an integer or out of range"),
            },
            "INFO" => bulk(&mut reply, store.info_keyspace().as_bytes()),
            "KEYS" => {
                let keys = store.keys(db, arg(1));
                reply.extend_from_slice(format!("*{}\r\n", keys.len()).as_bytes());
                for key in keys {
                    bulk(&mut reply, &key);
                }
            }
            "TYPE" => match quirk {
                Quirk::EverythingIsAList if store.type_of(db, arg(1)) != "none" => simple(&mut reply, "list"),
                _ => simple(&mut reply, store.type_of(db, arg(1))),
            },
            "LLEN" => match store.llen(db, arg(1)) {
                Ok(n) => reply.extend_from_slice(format!(":{}\r\n", n).as_bytes()),
                Err(_) => error(
                    &mut reply,
                    "WRONGTYPE Operation against a key holding the wrong kind of value",
                ),
            },
            "QUIT" => {
                simple(&mut reply, "OK");
                write.write_all(&reply).await?;
                return Ok(());
            }
            other => error(&mut reply, &format!("ERR unknown command '{}'", other)),
        }
        write.write_all(&reply).await?;
    }
    Ok(())
}

/// One command as sent by clients: an array of bulk strings. `None` at end of stream.
async fn read_command<R>(reader: &mut R) -> std::io::Result<Option<Vec<Vec<u8>>>>
where
    R: AsyncBufRead + Unpin,
{
    let mut header = String::new();
    if reader.read_line(&mut header).await? == 0 {
        return Ok(None);
    }
    let count = parse_prefixed(&header, '*')?;

    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let mut len_line = String::new();
        reader.read_line(&mut len_line).await?;
        let len = parse_prefixed(&len_line, '$')?;
        let mut buf = vec![0u8; len + 2];
        reader.read_exact(&mut buf).await?;
        buf.truncate(len);
        args.push(buf);
    }
    Ok(Some(args))
}

fn parse_prefixed(line: &str, prefix: char) -> std::io::Result<usize> {
    line.trim_end()
        .strip_prefix(prefix)
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidData, format!("bad line {:?}", line)))
}

fn simple(out: &mut Vec<u8>, text: &str) {
    out.extend_from_slice(format!("+{}\r\n", text).as_bytes());
}

fn error(out: &mut Vec<u8>, text: &str) {
    out.extend_from_slice(format!("-{}\r\n", text).as_bytes());
}

fn bulk(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(format!("${}\r\n", data.len()).as_bytes());
    out.extend_from_slice(data);
    out.extend_from_slice(b"\r\n");
}

pub fn short_timeout() -> Duration {
    Duration::from_millis(300)
}
