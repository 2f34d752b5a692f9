//! Mock serial hardware
//!
//! In-memory serial devices for exercising sessions, the registry and the
//! bridge without a board attached. Every device opened by a
//! [`MockPortOpener`] shares one [`MockPortState`], so a test can queue
//! incoming bytes, inspect what was written and count open handles.

#![allow(dead_code)]

use sketchbrew::errors::SerialError;
use sketchbrew::serial::{PortOpener, SerialDevice};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A write as the device saw it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub bytes: Vec<u8>,
    pub baud_rate: u32,
}

#[derive(Debug, Default)]
struct MockPortInner {
    incoming: VecDeque<Vec<u8>>,
    writes: Vec<RecordedWrite>,
    baud_changes: Vec<u32>,
    opens: usize,
    closes: usize,
    open_handles: usize,
    max_open_handles: usize,
    read_error: Option<io::ErrorKind>,
    write_error: Option<io::ErrorKind>,
    baud_error: bool,
    refuse_open: Option<String>,
}

/// Shared state of one simulated port
#[derive(Debug, Clone, Default)]
pub struct MockPortState {
    inner: Arc<Mutex<MockPortInner>>,
}

impl MockPortState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a chunk; each chunk is returned by exactly one read
    pub fn push_incoming(&self, chunk: &[u8]) {
        self.inner.lock().unwrap().incoming.push_back(chunk.to_vec());
    }

    /// Chunks queued but not yet read
    pub fn pending_incoming(&self) -> usize {
        self.inner.lock().unwrap().incoming.len()
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.inner.lock().unwrap().writes.clone()
    }

    pub fn written_bytes(&self) -> Vec<u8> {
        self.writes().into_iter().flat_map(|w| w.bytes).collect()
    }

    pub fn baud_changes(&self) -> Vec<u32> {
        self.inner.lock().unwrap().baud_changes.clone()
    }

    pub fn opens(&self) -> usize {
        self.inner.lock().unwrap().opens
    }

    pub fn closes(&self) -> usize {
        self.inner.lock().unwrap().closes
    }

    pub fn open_handles(&self) -> usize {
        self.inner.lock().unwrap().open_handles
    }

    pub fn max_open_handles(&self) -> usize {
        self.inner.lock().unwrap().max_open_handles
    }

    /// Fail the next read with `kind`
    pub fn fail_reads(&self, kind: io::ErrorKind) {
        self.inner.lock().unwrap().read_error = Some(kind);
    }

    /// Fail every write with `kind`
    pub fn fail_writes(&self, kind: io::ErrorKind) {
        self.inner.lock().unwrap().write_error = Some(kind);
    }

    /// Reject every baud change
    pub fn fail_baud_changes(&self) {
        self.inner.lock().unwrap().baud_error = true;
    }

    /// Make open fail as if the device were held by another process
    pub fn refuse_open(&self, reason: &str) {
        self.inner.lock().unwrap().refuse_open = Some(reason.to_string());
    }
}

/// One open handle on a [`MockPortState`]
pub struct MockSerialDevice {
    state: MockPortState,
    baud_rate: u32,
}

impl SerialDevice for MockSerialDevice {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inner = self.state.inner.lock().unwrap();
        if let Some(kind) = inner.read_error.take() {
            return Err(io::Error::new(kind, "mock read failure"));
        }

        let Some(mut chunk) = inner.incoming.pop_front() else {
            return Ok(0);
        };
        if chunk.len() > buf.len() {
            let rest = chunk.split_off(buf.len());
            inner.incoming.push_front(rest);
        }
        buf[..chunk.len()].copy_from_slice(&chunk);
        Ok(chunk.len())
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut inner = self.state.inner.lock().unwrap();
        if let Some(kind) = inner.write_error {
            return Err(io::Error::new(kind, "mock write failure"));
        }
        inner.writes.push(RecordedWrite {
            bytes: bytes.to_vec(),
            baud_rate: self.baud_rate,
        });
        Ok(())
    }

    fn set_baud_rate(&mut self, rate: u32) -> io::Result<()> {
        let mut inner = self.state.inner.lock().unwrap();
        if inner.baud_error {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "unsupported baud rate"));
        }
        inner.baud_changes.push(rate);
        self.baud_rate = rate;
        Ok(())
    }

    fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}

impl Drop for MockSerialDevice {
    fn drop(&mut self) {
        let mut inner = self.state.inner.lock().unwrap();
        inner.closes += 1;
        inner.open_handles -= 1;
    }
}

/// Opens [`MockSerialDevice`]s, all backed by the same state
#[derive(Debug, Clone, Default)]
pub struct MockPortOpener {
    pub state: MockPortState,
}

impl MockPortOpener {
    pub fn new(state: MockPortState) -> Self {
        Self { state }
    }
}

impl PortOpener for MockPortOpener {
    fn open(&self, path: &str, baud_rate: u32) -> Result<Box<dyn SerialDevice>, SerialError> {
        let mut inner = self.state.inner.lock().unwrap();
        if let Some(reason) = &inner.refuse_open {
            return Err(SerialError::PortUnavailable {
                port: path.to_string(),
                reason: reason.clone(),
            });
        }

        inner.opens += 1;
        inner.open_handles += 1;
        inner.max_open_handles = inner.max_open_handles.max(inner.open_handles);

        Ok(Box::new(MockSerialDevice {
            state: self.state.clone(),
            baud_rate,
        }))
    }
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
