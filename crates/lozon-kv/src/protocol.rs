//! Wire protocol implementation
//!
//! Text protocol, one exchange per TCP connection: the client sends one
//! newline-terminated line, the server answers and closes the connection.
//!
//! | Operation | Coordinator dialect   | Bucket dialect    | Responses            |
//! |-----------|-----------------------|-------------------|----------------------|
//! | Put       | `INSERT <key> <value>`| `PUT <key> <value>`| `OK` / `ERROR`      |
//! | Get       | `SEARCH <key>`        | `GET <key>`       | `VALUE <v>` / `NOT_FOUND` |
//! | Del       | `DELETE <key>`        | `DEL <key>`       | `OK` / `NOT_FOUND`   |
//! | Range     | `RANGE <low> <high>`  | `RANGE <low> <high>` | `<n>\n<k>\t<v>\n...` |
//!
//! Any malformed request is answered with `ERROR`.

use std::io;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

/// Longest accepted request line (including the newline)
pub const MAX_REQUEST_LINE: usize = 64 * 1024; // 64KB

/// Largest accepted response body
pub const MAX_RESPONSE_SIZE: usize = 64 * 1024 * 1024; // 64MB

/// Protocol error types
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Empty request")]
    Empty,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("Invalid key: empty key token")]
    InvalidKey,

    #[error("Message too large: {0} bytes")]
    TooLarge(usize),

    #[error("Invalid UTF-8 string")]
    InvalidUtf8,

    #[error("Malformed response: {0:?}")]
    MalformedResponse(String),
}

/// Verb set spoken on a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Client to coordinator: INSERT / SEARCH / DELETE / RANGE
    Coordinator,
    /// Coordinator to bucket: PUT / GET / DEL / RANGE
    Bucket,
}

impl Dialect {
    fn put_verb(self) -> &'static str {
        match self {
            Dialect::Coordinator => "INSERT",
            Dialect::Bucket => "PUT",
        }
    }

    fn get_verb(self) -> &'static str {
        match self {
            Dialect::Coordinator => "SEARCH",
            Dialect::Bucket => "GET",
        }
    }

    fn del_verb(self) -> &'static str {
        match self {
            Dialect::Coordinator => "DELETE",
            Dialect::Bucket => "DEL",
        }
    }
}

const RANGE_VERB: &str = "RANGE";

/// A single request, independent of dialect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Put { key: String, value: String },
    Get { key: String },
    Del { key: String },
    Range { low: String, high: String },
}

impl Request {
    /// Parse a request line
    ///
    /// The line is trimmed and split on single spaces into at most three
    /// tokens. The verb is case-insensitive. For PUT/INSERT the third token
    /// is the rest of the line, so values keep their inner spaces.
    pub fn parse(line: &str, dialect: Dialect) -> Result<Self, ProtocolError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ProtocolError::Empty);
        }

        let mut parts = line.splitn(3, ' ');
        let verb = parts.next().unwrap_or_default().to_ascii_uppercase();
        let first = parts.next();
        let rest = parts.next();

        let key = |token: Option<&str>| -> Result<String, ProtocolError> {
            match token {
                Some("") => Err(ProtocolError::InvalidKey),
                Some(k) => Ok(k.to_string()),
                None => Err(ProtocolError::MissingArgument("key")),
            }
        };

        if verb == dialect.put_verb() {
            let key = key(first)?;
            let value = rest.ok_or(ProtocolError::MissingArgument("value"))?;
            Ok(Request::Put {
                key,
                value: value.to_string(),
            })
        } else if verb == dialect.get_verb() {
            Ok(Request::Get { key: key(first)? })
        } else if verb == dialect.del_verb() {
            Ok(Request::Del { key: key(first)? })
        } else if verb == RANGE_VERB {
            let low = first.ok_or(ProtocolError::MissingArgument("low"))?;
            let high = rest.ok_or(ProtocolError::MissingArgument("high"))?;
            Ok(Request::Range {
                low: low.to_string(),
                high: high.to_string(),
            })
        } else {
            Err(ProtocolError::UnknownCommand(verb))
        }
    }

    /// Encode as a newline-terminated request line
    pub fn encode(&self, dialect: Dialect) -> String {
        match self {
            Request::Put { key, value } => format!("{} {} {}\n", dialect.put_verb(), key, value),
            Request::Get { key } => format!("{} {}\n", dialect.get_verb(), key),
            Request::Del { key } => format!("{} {}\n", dialect.del_verb(), key),
            Request::Range { low, high } => format!("{} {} {}\n", RANGE_VERB, low, high),
        }
    }

    /// Key of a point operation
    pub fn key(&self) -> Option<&str> {
        match self {
            Request::Put { key, .. } | Request::Get { key } | Request::Del { key } => Some(key),
            Request::Range { .. } => None,
        }
    }
}

/// A single response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ok,
    Value(String),
    NotFound,
    Error,
    Range(Vec<(String, String)>),
}

impl Response {
    /// Encode as response text
    pub fn encode(&self) -> String {
        match self {
            Response::Ok => "OK\n".to_string(),
            Response::Value(v) => format!("VALUE {}\n", v),
            Response::NotFound => "NOT_FOUND\n".to_string(),
            Response::Error => "ERROR\n".to_string(),
            Response::Range(pairs) => {
                let mut out = format!("{}\n", pairs.len());
                for (k, v) in pairs {
                    out.push_str(k);
                    out.push('\t');
                    out.push_str(v);
                    out.push('\n');
                }
                out
            }
        }
    }

    /// Decode the response to `request`
    pub fn decode_for(request: &Request, text: &str) -> Result<Self, ProtocolError> {
        match request {
            Request::Range { .. } => Self::decode_range(text),
            _ => Self::decode_status(text),
        }
    }

    /// Decode a single-line status response
    pub fn decode_status(text: &str) -> Result<Self, ProtocolError> {
        let line = text.trim();
        match line {
            "OK" => Ok(Response::Ok),
            "NOT_FOUND" => Ok(Response::NotFound),
            "ERROR" => Ok(Response::Error),
            _ => line
                .strip_prefix("VALUE ")
                .map(|v| Response::Value(v.to_string()))
                .ok_or_else(|| ProtocolError::MalformedResponse(line.to_string())),
        }
    }

    /// Decode a range response: a count line, then up to that many
    /// `key<TAB>value` lines (lines without a tab are skipped)
    pub fn decode_range(text: &str) -> Result<Self, ProtocolError> {
        let mut lines = text.lines();
        let header = lines.next().unwrap_or_default().trim();
        let count: usize = header
            .parse()
            .map_err(|_| ProtocolError::MalformedResponse(header.to_string()))?;

        let pairs = lines
            .take(count)
            .filter_map(|line| line.split_once('\t'))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Ok(Response::Range(pairs))
    }
}

/// Read one request line, bounded by `MAX_REQUEST_LINE`
///
/// Returns `None` if the peer closed the connection without sending data.
pub async fn read_request_line<R>(reader: &mut R) -> Result<Option<String>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut limited = BufReader::new(reader.take(MAX_REQUEST_LINE as u64 + 1));
    let n = limited.read_until(b'\n', &mut buf).await?;

    if n == 0 {
        return Ok(None);
    }
    if buf.len() > MAX_REQUEST_LINE {
        return Err(ProtocolError::TooLarge(buf.len()));
    }
    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| ProtocolError::InvalidUtf8)
}

/// Read a full response until the peer closes, bounded by `MAX_RESPONSE_SIZE`
pub async fn read_response<R>(reader: &mut R) -> Result<String, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader
        .take(MAX_RESPONSE_SIZE as u64 + 1)
        .read_to_end(&mut buf)
        .await?;

    if buf.len() > MAX_RESPONSE_SIZE {
        return Err(ProtocolError::TooLarge(buf.len()));
    }
    String::from_utf8(buf).map_err(|_| ProtocolError::InvalidUtf8)
}
