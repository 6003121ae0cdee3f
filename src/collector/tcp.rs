// src/collector/tcp.rs
//
// Worker for the live sensor stream: fixed-length binary messages over
// a TCP connection. Transport errors (including a mid-message close)
// end this worker; already-buffered data stays browsable.

use super::decoder::{self, DecodeError};
use super::{Gate, SampleSender};
use anyhow::{Context, Result};
use std::net::TcpStream;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, info};

pub struct TcpCollector {
    host: String,
    port: u16,
}

impl TcpCollector {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn spawn(self, gate: Arc<Gate>, sink: SampleSender) -> Result<JoinHandle<Result<()>>> {
        let handle = thread::Builder::new()
            .name("tcp-collector".to_string())
            .spawn(move || self.run(&gate, &sink))
            .context("spawning tcp collector thread")?;
        Ok(handle)
    }

    fn run(&self, gate: &Gate, sink: &SampleSender) -> Result<()> {
        let mut stream = TcpStream::connect((self.host.as_str(), self.port))
            .with_context(|| format!("connecting to {}:{}", self.host, self.port))?;
        info!(host = %self.host, port = self.port, "connected to data stream");

        loop {
            gate.wait_until_open();

            match decoder::read_message(&mut stream) {
                Ok(Some(sample)) => {
                    if sink.send(sample).is_err() {
                        info!("sample channel closed, stopping tcp collector");
                        return Ok(());
                    }
                }
                Ok(None) => {
                    info!("server closed the connection");
                    return Ok(());
                }
                Err(e @ DecodeError::TruncatedMessage { .. }) => {
                    error!("connection dropped mid-message: {e}");
                    return Err(e.into());
                }
                Err(e) => {
                    error!("tcp read failed: {e}");
                    return Err(e.into());
                }
            }
        }
    }
}
