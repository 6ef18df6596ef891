//! Minimal request/reply client.
//!
//! Requests are single lines `job;data\n`, replies single lines. The
//! connector holds at most one outstanding request; scheduling several
//! requests is up to the caller.

use log::{debug, info};
use std::io::{self, BufRead, ErrorKind, Read, Write};
use std::net::TcpStream;

use crate::error::{Error, Result};

pub const DEFAULT_ENDPOINT: &str = "tcp://localhost:5555";
pub const SEPARATOR: char = ';';

/// Strip an optional `tcp://` scheme from an endpoint
pub fn socket_address(endpoint: &str) -> &str {
    endpoint.strip_prefix("tcp://").unwrap_or(endpoint)
}

/// Encode a request line, rejecting fields that would break the framing
pub fn encode_request(job: &str, data: &str) -> Result<String> {
    if [job, data].iter().any(|f| f.contains(SEPARATOR) || f.contains('\n')) {
        return Err(Error::InvalidMessage(format!(
            "neither job nor data must contain '{}' or a newline",
            SEPARATOR
        )));
    }
    Ok(format!("{}{}{}\n", job, SEPARATOR, data))
}

pub struct Connector {
    stream: TcpStream,
    pending: Vec<u8>,
    awaiting_reply: bool,
    running: bool,
}

impl Connector {
    pub fn connect(endpoint: &str) -> Result<Self> {
        let address = socket_address(endpoint);
        let stream = TcpStream::connect(address)?;
        stream.set_nodelay(true)?;
        info!("Connected to {}", address);
        Ok(Self {
            stream,
            pending: Vec::new(),
            awaiting_reply: false,
            running: true,
        })
    }

    /// Stop polling; later receives report `Interrupted`
    pub fn interrupt(&mut self) {
        self.running = false;
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    pub fn send_message(&mut self, job: &str, data: &str) -> Result<()> {
        if self.awaiting_reply {
            return Err(Error::RequestPending);
        }
        let request = encode_request(job, data)?;
        self.stream.write_all(request.as_bytes())?;
        self.stream.flush()?;
        self.awaiting_reply = true;
        debug!("Sent request {:?}", request.trim_end());
        Ok(())
    }

    /// Poll for the reply without blocking. `Ok(None)` means it has not arrived yet.
    pub fn receive_message(&mut self) -> Result<Option<String>> {
        if !self.running {
            return Err(Error::Interrupted);
        }
        if let Some(reply) = self.take_line() {
            return Ok(Some(reply));
        }

        self.stream.set_nonblocking(true)?;
        let result = self.fill_pending();
        self.stream.set_nonblocking(false)?;
        result?;
        Ok(self.take_line())
    }

    // Read whatever is available; a closed peer is an error
    fn fill_pending(&mut self) -> Result<()> {
        let mut buf = [0u8; 4096];
        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => return Err(Error::Disconnected),
                Ok(n) => {
                    self.pending.extend_from_slice(&buf[..n]);
                    if buf[..n].contains(&b'\n') {
                        return Ok(());
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn take_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=end).collect();
        self.awaiting_reply = false;
        Some(String::from_utf8_lossy(&line[..end]).trim_end_matches('\r').to_string())
    }
}

/// Interactive loop: `exit` quits, `poll` polls for the reply, any other line
/// is sent as a job together with `data`.
pub fn run_interactive<R: BufRead, W: Write>(connector: &mut Connector, data: &str, input: R, mut output: W) -> Result<()> {
    let mut request = 0;
    writeln!(output, "Write your request")?;
    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        match line {
            "exit" => {
                connector.interrupt();
                break;
            }
            "poll" => match connector.receive_message()? {
                Some(reply) => writeln!(output, "Received reply {} [ {} ]", request, reply)?,
                None => writeln!(output, "No reply yet")?,
            },
            "" => continue,
            job => match connector.send_message(job, data) {
                Ok(()) => {
                    request += 1;
                    writeln!(output, "Sent request {}", request)?;
                }
                Err(e @ (Error::InvalidMessage(_) | Error::RequestPending)) => writeln!(output, "{}", e)?,
                Err(e) => return Err(e),
            },
        }
    }
    Ok(())
}

/// `run_interactive` on stdin/stdout
pub fn run_console(endpoint: &str, data: &str) -> Result<()> {
    let mut connector = Connector::connect(endpoint)?;
    let stdin = io::stdin();
    run_interactive(&mut connector, data, stdin.lock(), io::stdout())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_request() {
        assert_eq!(encode_request("run", "C:/images").unwrap(), "run;C:/images\n");
        assert!(matches!(encode_request("a;b", ""), Err(Error::InvalidMessage(_))));
        assert!(matches!(encode_request("a", "x\ny"), Err(Error::InvalidMessage(_))));
    }

    #[test]
    fn test_socket_address() {
        assert_eq!(socket_address("tcp://localhost:5555"), "localhost:5555");
        assert_eq!(socket_address("127.0.0.1:9"), "127.0.0.1:9");
    }
}
