use std::collections::HashMap;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use crate::Result;
use crate::errors::MpdError;

/// One stored playlist as reported by `listplaylists`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistSummary {
    pub name: String,
    /// Opaque version token; compared, never interpreted.
    pub last_modified: String,
}

/// An MPD protocol session over TCP.
///
/// Dropping the client closes the session. The server tears down any state
/// scoped to it (partition selection, pending idle) with the connection.
#[derive(Debug)]
pub struct MpdClient {
    stream: BufReader<TcpStream>,
    server: String,
}

impl MpdClient {
    /// Opens a session and validates the `OK MPD <version>` greeting.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        let mut client = Self {
            stream: BufReader::new(stream),
            server: format!("{host}:{port}"),
        };
        let banner = client.read_line().await?;
        if !banner.starts_with("OK MPD ") {
            return Err(MpdError::Protocol(format!(
                "unexpected greeting from {}: {banner}",
                client.server
            )));
        }
        debug!(server = %client.server, %banner, "MPD session established");
        Ok(client)
    }

    /// Player and queue state for the session's partition. Keys may be
    /// absent depending on the player state; callers must tolerate that.
    pub async fn status(&mut self) -> Result<HashMap<String, String>> {
        Ok(self.exec("status").await?.into_iter().collect())
    }

    pub async fn list_playlists(&mut self) -> Result<Vec<PlaylistSummary>> {
        let mut playlists: Vec<PlaylistSummary> = Vec::new();
        for (key, value) in self.exec("listplaylists").await? {
            match key.as_str() {
                "playlist" => playlists.push(PlaylistSummary {
                    name: value,
                    last_modified: String::new(),
                }),
                "Last-Modified" => {
                    if let Some(current) = playlists.last_mut() {
                        current.last_modified = value;
                    }
                }
                _ => {}
            }
        }
        Ok(playlists)
    }

    /// Track URIs of a stored playlist, in playlist order.
    pub async fn list_playlist(&mut self, name: &str) -> Result<Vec<String>> {
        Ok(self
            .exec(&format!("listplaylist {}", quote(name)))
            .await?
            .into_iter()
            .filter(|(key, _)| key == "file")
            .map(|(_, value)| value)
            .collect())
    }

    /// Appends a track to the queue of the session's partition.
    pub async fn add(&mut self, uri: &str) -> Result<()> {
        self.exec(&format!("add {}", quote(uri))).await.map(drop)
    }

    /// Deletes the queue positions `[start, end)`.
    pub async fn delete_range(&mut self, start: usize, end: usize) -> Result<()> {
        self.exec(&format!("delete {start}:{end}")).await.map(drop)
    }

    pub async fn clear(&mut self) -> Result<()> {
        self.exec("clear").await.map(drop)
    }

    /// Switches the session to the named partition.
    pub async fn partition(&mut self, name: &str) -> Result<()> {
        self.exec(&format!("partition {}", quote(name))).await.map(drop)
    }

    pub async fn new_partition(&mut self, name: &str) -> Result<()> {
        self.exec(&format!("newpartition {}", quote(name)))
            .await
            .map(drop)
    }

    /// Blocks until the server reports a change in one of the named
    /// subsystems, then returns the changed subsystem names.
    pub async fn idle(&mut self, subsystems: &[&str]) -> Result<Vec<String>> {
        let mut command = String::from("idle");
        for subsystem in subsystems {
            command.push(' ');
            command.push_str(subsystem);
        }
        Ok(self
            .exec(&command)
            .await?
            .into_iter()
            .filter(|(key, _)| key == "changed")
            .map(|(_, value)| value)
            .collect())
    }

    /// Cancels a pending `idle` so the session can be reused.
    ///
    /// A task aborted while waiting in [`MpdClient::idle`] leaves the
    /// session in idle mode; the next user calls this before sending
    /// anything else. A server that already left idle mode answers with an
    /// error, which is fine to ignore.
    pub async fn cancel_idle(&mut self) -> Result<()> {
        self.send("noidle").await?;
        match self.read_pairs().await {
            Ok(_) | Err(MpdError::Server { .. }) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Orderly session shutdown. The server closes the connection without
    /// a reply.
    pub async fn close(mut self) -> Result<()> {
        self.send("close").await
    }

    async fn exec(&mut self, command: &str) -> Result<Vec<(String, String)>> {
        debug!(server = %self.server, command, "MPD command");
        self.send(command).await?;
        self.read_pairs().await
    }

    async fn send(&mut self, command: &str) -> Result<()> {
        let stream = self.stream.get_mut();
        stream.write_all(command.as_bytes()).await?;
        stream.write_all(b"\n").await?;
        Ok(())
    }

    /// Reads `key: value` lines until the terminating `OK` or `ACK`.
    async fn read_pairs(&mut self) -> Result<Vec<(String, String)>> {
        let mut pairs = Vec::new();
        loop {
            let line = self.read_line().await?;
            if line == "OK" {
                return Ok(pairs);
            }
            if let Some(ack) = line.strip_prefix("ACK ") {
                return Err(parse_ack(ack));
            }
            match line.split_once(": ") {
                Some((key, value)) => pairs.push((key.to_string(), value.to_string())),
                None => {
                    return Err(MpdError::Protocol(format!(
                        "unparseable response line: {line}"
                    )));
                }
            }
        }
    }

    async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = self.stream.read_line(&mut line).await?;
        if read == 0 {
            return Err(MpdError::Protocol(format!(
                "connection closed by {}",
                self.server
            )));
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }
}

/// Parses the tail of an `ACK [<code>@<index>] {<command>} <message>` line.
fn parse_ack(rest: &str) -> MpdError {
    let parsed = (|| {
        let rest = rest.strip_prefix('[')?;
        let (code, rest) = rest.split_once('@')?;
        let (_, rest) = rest.split_once("] {")?;
        let (command, message) = rest.split_once('}')?;
        Some((code.parse().ok()?, command.to_string(), message.trim().to_string()))
    })();
    match parsed {
        Some((code, command, message)) => MpdError::Server {
            code,
            command,
            message,
        },
        None => MpdError::Protocol(format!("unparseable ACK response: ACK {rest}")),
    }
}

/// Quotes a command argument, escaping backslashes and double quotes.
fn quote(argument: &str) -> String {
    let mut quoted = String::with_capacity(argument.len() + 2);
    quoted.push('"');
    for c in argument.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
