//! Stateful in-process MPD endpoint for integration tests.
//!
//! Speaks just enough of the protocol for the daemon: greeting, status with
//! a live `playlistlength`, queue mutation, stored playlist listing and
//! scripted partition join behavior. `idle` never answers, which pins a
//! client in the wait state exactly like a quiet server would.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

#[derive(Default)]
pub struct ServerState {
    /// Base status fields (`state`, `song`, `random`, ...); the server adds
    /// `playlistlength` from the live queue.
    pub status: HashMap<String, String>,
    pub queue: Vec<String>,
    /// `(name, last-modified, tracks)` per stored playlist.
    pub playlists: Vec<(String, String, Vec<String>)>,
    /// Scripted ACK codes for `partition` commands, then `select_default`.
    /// `None` entries mean success.
    pub select_acks: VecDeque<Option<u32>>,
    pub select_default: Option<u32>,
    /// Same for `newpartition`.
    pub create_acks: VecDeque<Option<u32>>,
    pub create_default: Option<u32>,
    pub selects: usize,
    pub creates: usize,
    pub deletes: usize,
    pub clears: usize,
}

impl ServerState {
    pub fn shared() -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self::default()))
    }
}

pub async fn spawn(state: Arc<Mutex<ServerState>>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(handle(stream, Arc::clone(&state)));
        }
    });
    addr
}

pub async fn connect(addr: SocketAddr) -> mdqmpd::MpdClient {
    mdqmpd::MpdClient::connect(&addr.ip().to_string(), addr.port())
        .await
        .unwrap()
}

async fn handle(stream: TcpStream, state: Arc<Mutex<ServerState>>) {
    let (read, mut write) = stream.into_split();
    if write.write_all(b"OK MPD 0.24.0\n").await.is_err() {
        return;
    }
    let mut lines = BufReader::new(read).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line == "close" {
            return;
        }
        let reply = {
            let mut state = state.lock().await;
            respond(&mut state, &line)
        };
        // `None` means "stay silent": the client is now idling.
        let Some(reply) = reply else { continue };
        if write.write_all(reply.as_bytes()).await.is_err() {
            return;
        }
    }
}

fn respond(state: &mut ServerState, line: &str) -> Option<String> {
    if line == "status" {
        let mut out = String::new();
        for (key, value) in &state.status {
            out.push_str(&format!("{key}: {value}\n"));
        }
        out.push_str(&format!("playlistlength: {}\n", state.queue.len()));
        out.push_str("OK\n");
        return Some(out);
    }
    if let Some(argument) = line.strip_prefix("add ") {
        state.queue.push(unquote(argument));
        return Some("OK\n".to_string());
    }
    if let Some(range) = line.strip_prefix("delete ") {
        let (start, end) = range.split_once(':').unwrap();
        let (start, end): (usize, usize) = (start.parse().unwrap(), end.parse().unwrap());
        state.queue.drain(start..end);
        state.deletes += 1;
        return Some("OK\n".to_string());
    }
    if line == "clear" {
        state.queue.clear();
        state.clears += 1;
        return Some("OK\n".to_string());
    }
    if line == "listplaylists" {
        let mut out = String::new();
        for (name, last_modified, _) in &state.playlists {
            out.push_str(&format!("playlist: {name}\nLast-Modified: {last_modified}\n"));
        }
        out.push_str("OK\n");
        return Some(out);
    }
    if let Some(argument) = line.strip_prefix("listplaylist ") {
        let name = unquote(argument);
        return Some(
            match state.playlists.iter().find(|(known, _, _)| *known == name) {
                Some((_, _, tracks)) => {
                    let mut out = String::new();
                    for track in tracks {
                        out.push_str(&format!("file: {track}\n"));
                    }
                    out.push_str("OK\n");
                    out
                }
                None => "ACK [50@0] {listplaylist} No such playlist\n".to_string(),
            },
        );
    }
    if line.starts_with("partition ") {
        state.selects += 1;
        let ack = state.select_acks.pop_front().unwrap_or(state.select_default);
        return Some(match ack {
            Some(code) => format!("ACK [{code}@0] {{partition}} scripted failure\n"),
            None => "OK\n".to_string(),
        });
    }
    if line.starts_with("newpartition ") {
        state.creates += 1;
        let ack = state.create_acks.pop_front().unwrap_or(state.create_default);
        return Some(match ack {
            Some(code) => format!("ACK [{code}@0] {{newpartition}} scripted failure\n"),
            None => "OK\n".to_string(),
        });
    }
    if line.starts_with("idle") {
        return None;
    }
    if line == "noidle" {
        return Some("OK\n".to_string());
    }
    Some("ACK [5@0] {unknown} unknown command\n".to_string())
}

fn unquote(argument: &str) -> String {
    let argument = argument.trim();
    let argument = argument.strip_prefix('"').unwrap_or(argument);
    let argument = argument.strip_suffix('"').unwrap_or(argument);
    argument.replace("\\\"", "\"").replace("\\\\", "\\")
}
