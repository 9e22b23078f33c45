//! The bidirectional line stream a [`crate::session::Session`] runs the
//! GRBL protocol over.
//!
//! The session needs only a blocking line-oriented byte stream with flush
//! and a way to send a single realtime byte — opening a tty and configuring
//! 115200 8N1 raw mode is a thin platform wrapper over that, provided here
//! by [`SerialTransport`] but not required for the protocol logic to run
//! (tests use [`MockTransport`]).

use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Write};
use std::time::Duration;

/// A blocking, line-oriented connection to a GRBL controller.
pub trait LineTransport {
    /// Write one command line, CR/LF-terminated, and flush.
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Block until a full line is available, or return `Ok(None)` on EOF.
    /// Trailing CR is stripped; trailing LF is not included.
    fn read_line(&mut self) -> io::Result<Option<String>>;

    /// Send a single realtime byte (`?` for status, `0x18` for soft reset)
    /// with no line terminator.
    fn send_realtime_byte(&mut self, byte: u8) -> io::Result<()>;
}

/// An in-memory transport for tests: a queue of canned response lines and a
/// log of every line written to it.
#[derive(Debug, Default)]
pub struct MockTransport {
    pub incoming: VecDeque<String>,
    pub written: Vec<String>,
    pub realtime_bytes: Vec<u8>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(lines: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut t = Self::new();
        t.push_lines(lines);
        t
    }

    pub fn push_lines(&mut self, lines: impl IntoIterator<Item = impl Into<String>>) {
        self.incoming.extend(lines.into_iter().map(Into::into));
    }
}

impl LineTransport for MockTransport {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.written.push(line.to_string());
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.incoming.pop_front())
    }

    fn send_realtime_byte(&mut self, byte: u8) -> io::Result<()> {
        self.realtime_bytes.push(byte);
        Ok(())
    }
}

/// A real serial port, opened 115200 8N1 raw, wrapped for line-oriented
/// blocking reads.
pub struct SerialTransport {
    reader: BufReader<Box<dyn serialport::SerialPort>>,
}

impl SerialTransport {
    pub fn open(port_name: &str) -> serialport::Result<Self> {
        let port = serialport::new(port_name, 115_200)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None)
            .timeout(Duration::from_secs(60))
            .open()?;
        Ok(SerialTransport {
            reader: BufReader::new(port),
        })
    }
}

impl LineTransport for SerialTransport {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let port = self.reader.get_mut();
        write!(port, "{line}\n")?;
        port.flush()
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = String::new();
        let n = self.reader.read_line(&mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        while buf.ends_with('\n') || buf.ends_with('\r') {
            buf.pop();
        }
        Ok(Some(buf))
    }

    fn send_realtime_byte(&mut self, byte: u8) -> io::Result<()> {
        let port = self.reader.get_mut();
        port.write_all(&[byte])?;
        port.flush()
    }
}
