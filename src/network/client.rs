//! Blocking client
//!
//! A minimal RESP client used by the CLI and the integration tests.

use std::io::{BufReader, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};

use crate::error::Result;
use crate::protocol::{encode_command, read_reply, write_command, Command, Reply};

/// One connection to a kvbench server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Send one request and wait for its reply
    pub fn call<A: AsRef<[u8]>>(&mut self, args: &[A]) -> Result<Reply> {
        write_command(&mut self.writer, &Command::from_args(args))?;
        read_reply(&mut self.reader)
    }

    /// Send every request in one write, then read one reply per request
    pub fn pipeline(&mut self, commands: &[Command]) -> Result<Vec<Reply>> {
        let mut out = Vec::new();
        for command in commands {
            encode_command(command, &mut out);
        }
        self.writer.write_all(&out)?;
        self.writer.flush()?;

        commands
            .iter()
            .map(|_| read_reply(&mut self.reader))
            .collect()
    }
}
