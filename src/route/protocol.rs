//! Route wire frames.
//!
//! ```text
//! INFO <server_name>\r\n
//! PING\r\n / PONG\r\n
//! RS+ <subject>\r\n          peer gained interest in subject
//! RS- <subject>\r\n          peer lost interest in subject
//! RMSG <subject> <size>\r\n<payload>\r\n
//! ```

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Upper bound on a control line, payload excluded.
const MAX_CONTROL_LINE: usize = 4096;

/// Errors produced while reading route frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("payload of {size} bytes exceeds limit of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("unexpected frame: expected {expected}, got {got}")]
    UnexpectedFrame { expected: &'static str, got: String },
}

/// A single route protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Info { server_name: String },
    Ping,
    Pong,
    Sub { subject: String },
    Unsub { subject: String },
    Msg { subject: String, payload: Vec<u8> },
}

impl Frame {
    pub fn name(&self) -> &'static str {
        match self {
            Frame::Info { .. } => "INFO",
            Frame::Ping => "PING",
            Frame::Pong => "PONG",
            Frame::Sub { .. } => "RS+",
            Frame::Unsub { .. } => "RS-",
            Frame::Msg { .. } => "RMSG",
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Frame::Info { server_name } => format!("INFO {}\r\n", server_name).into_bytes(),
            Frame::Ping => b"PING\r\n".to_vec(),
            Frame::Pong => b"PONG\r\n".to_vec(),
            Frame::Sub { subject } => format!("RS+ {}\r\n", subject).into_bytes(),
            Frame::Unsub { subject } => format!("RS- {}\r\n", subject).into_bytes(),
            Frame::Msg { subject, payload } => {
                let mut out = format!("RMSG {} {}\r\n", subject, payload.len()).into_bytes();
                out.extend_from_slice(payload);
                out.extend_from_slice(b"\r\n");
                out
            }
        }
    }
}

/// Read the next frame. `Ok(None)` means the peer closed the stream cleanly.
pub async fn read_frame<R>(reader: &mut R, max_payload: usize) -> Result<Option<Frame>, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let n = (&mut *reader)
        .take(MAX_CONTROL_LINE as u64)
        .read_line(&mut line)
        .await?;
    if n == 0 {
        return Ok(None);
    }
    if !line.ends_with('\n') {
        return Err(ProtocolError::Malformed("control line too long or truncated".into()));
    }
    let line = line.trim_end_matches(['\r', '\n']);
    let mut parts = line.split_whitespace();
    let op = parts.next().unwrap_or_default();

    let frame = match op.to_ascii_uppercase().as_str() {
        "INFO" => Frame::Info {
            server_name: required(parts.next(), "INFO server name")?,
        },
        "PING" => Frame::Ping,
        "PONG" => Frame::Pong,
        "RS+" => Frame::Sub {
            subject: required(parts.next(), "RS+ subject")?,
        },
        "RS-" => Frame::Unsub {
            subject: required(parts.next(), "RS- subject")?,
        },
        "RMSG" => {
            let subject = required(parts.next(), "RMSG subject")?;
            let size: usize = required(parts.next(), "RMSG size")?
                .parse()
                .map_err(|_| ProtocolError::Malformed(format!("invalid RMSG size in {:?}", line)))?;
            if size > max_payload {
                return Err(ProtocolError::PayloadTooLarge { size, max: max_payload });
            }
            let mut payload = vec![0u8; size + 2];
            reader.read_exact(&mut payload).await?;
            if &payload[size..] != b"\r\n" {
                return Err(ProtocolError::Malformed("RMSG payload not terminated by CRLF".into()));
            }
            payload.truncate(size);
            Frame::Msg { subject, payload }
        }
        other => return Err(ProtocolError::Malformed(format!("unknown operation {:?}", other))),
    };
    Ok(Some(frame))
}

fn required(part: Option<&str>, what: &str) -> Result<String, ProtocolError> {
    part.map(str::to_string)
        .ok_or_else(|| ProtocolError::Malformed(format!("missing {}", what)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn parse_all(input: &[u8]) -> Vec<Result<Option<Frame>, ProtocolError>> {
        let mut reader = BufReader::new(input);
        let mut out = Vec::new();
        loop {
            let res = read_frame(&mut reader, 1024).await;
            let stop = !matches!(res, Ok(Some(_)));
            out.push(res);
            if stop {
                break;
            }
        }
        out
    }

    #[tokio::test]
    async fn parses_a_session() {
        let input = b"INFO node-b\r\nRS+ orders.>\r\nRMSG orders.new 5\r\nhello\r\nPING\r\nRS- orders.>\r\n";
        let frames: Vec<Frame> = parse_all(input)
            .await
            .into_iter()
            .filter_map(|r| r.unwrap())
            .collect();
        assert_eq!(
            frames,
            vec![
                Frame::Info { server_name: "node-b".into() },
                Frame::Sub { subject: "orders.>".into() },
                Frame::Msg { subject: "orders.new".into(), payload: b"hello".to_vec() },
                Frame::Ping,
                Frame::Unsub { subject: "orders.>".into() },
            ]
        );
    }

    #[tokio::test]
    async fn payload_may_contain_crlf() {
        let frame = Frame::Msg { subject: "s".into(), payload: b"a\r\nb".to_vec() };
        let bytes = frame.encode();
        let mut reader = BufReader::new(&bytes[..]);
        assert_eq!(read_frame(&mut reader, 1024).await.unwrap(), Some(frame));
    }

    #[tokio::test]
    async fn rejects_oversized_payload() {
        let mut reader = BufReader::new(&b"RMSG s 2048\r\n"[..]);
        let err = read_frame(&mut reader, 1024).await.unwrap_err();
        assert!(matches!(err, ProtocolError::PayloadTooLarge { size: 2048, max: 1024 }));
    }

    #[tokio::test]
    async fn rejects_unknown_op() {
        let mut reader = BufReader::new(&b"HELLO\r\n"[..]);
        assert!(matches!(
            read_frame(&mut reader, 1024).await,
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn rejects_missing_terminator() {
        let mut reader = BufReader::new(&b"RMSG s 3\r\nabcXY"[..]);
        assert!(matches!(
            read_frame(&mut reader, 1024).await,
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn eof_is_clean_close() {
        let mut reader = BufReader::new(&b""[..]);
        assert!(read_frame(&mut reader, 1024).await.unwrap().is_none());
    }
}
