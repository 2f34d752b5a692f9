//! Serial port sessions
//!
//! A session owns one open device on a dedicated blocking thread. Reads,
//! writes and baud changes all run there, so the handle is never touched
//! from two places at once, a baud change is ordered against in-flight
//! reads, and a slow drain or read never holds an async runtime worker.
//!
//! The thread waits up to `poll_interval` for a command, then drains
//! whatever bytes are pending, frames them into lines and emits one
//! [`SessionEvent::LineReceived`] per terminator. An OS-level read or write
//! error ends the loop with a single [`SessionEvent::Failed`]. Closing
//! discards any unterminated fragment.

use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, mpsc as std_mpsc};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::errors::SerialError;
use crate::models::SessionEvent;
use crate::serial::device::{PortOpener, SerialDevice};
use crate::serial::line_buffer::{DEFAULT_MAX_LINE_LEN, LineBuffer};

const READ_CHUNK: usize = 4096;

/// Tuning for session read loops
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Longest wait for a command before pending bytes are drained
    pub poll_interval: Duration,
    /// Longest unterminated line kept before it is discarded
    pub max_line_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(20),
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

enum SessionCommand {
    Write {
        payload: Vec<u8>,
        reply: oneshot::Sender<Result<(), SerialError>>,
    },
    SetBaud {
        rate: u32,
        reply: oneshot::Sender<Result<(), SerialError>>,
    },
    Close,
}

struct SessionInner {
    id: Uuid,
    port: String,
    baud_rate: AtomicU32,
    opened_at: DateTime<Local>,
    commands: std_mpsc::Sender<SessionCommand>,
    running: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to a live serial session. Clones share the same session.
#[derive(Clone)]
pub struct SerialSession {
    inner: Arc<SessionInner>,
}

/// Receiving end of a session's line events
pub struct SessionEvents {
    rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionEvents {
    /// Next event in read order. `None` once the session has ended.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }
}

impl std::fmt::Debug for SerialSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialSession")
            .field("id", &self.inner.id)
            .field("port", &self.inner.port)
            .field("baud_rate", &self.baud_rate())
            .finish()
    }
}

impl SerialSession {
    /// Open `port` and start its read loop
    pub async fn open(
        opener: Arc<dyn PortOpener>,
        port: &str,
        baud_rate: u32,
        config: &SessionConfig,
    ) -> Result<(SerialSession, SessionEvents), SerialError> {
        // Opening a tty can block on the driver
        let path = port.to_string();
        let device = tokio::task::spawn_blocking(move || opener.open(&path, baud_rate))
            .await
            .map_err(|e| SerialError::PortUnavailable {
                port: port.to_string(),
                reason: format!("open task failed: {}", e),
            })??;

        let (command_tx, command_rx) = std_mpsc::channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let running = Arc::new(AtomicBool::new(true));

        let loop_port = port.to_string();
        let loop_config = config.clone();
        let loop_running = running.clone();
        let task = tokio::task::spawn_blocking(move || {
            run_session(device, &loop_port, &loop_config, command_rx, event_tx);
            loop_running.store(false, Ordering::SeqCst);
        });

        let session = SerialSession {
            inner: Arc::new(SessionInner {
                id: Uuid::new_v4(),
                port: port.to_string(),
                baud_rate: AtomicU32::new(baud_rate),
                opened_at: Local::now(),
                commands: command_tx,
                running,
                task: Mutex::new(Some(task)),
            }),
        };

        Ok((session, SessionEvents { rx: event_rx }))
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn port(&self) -> &str {
        &self.inner.port
    }

    pub fn baud_rate(&self) -> u32 {
        self.inner.baud_rate.load(Ordering::SeqCst)
    }

    pub fn opened_at(&self) -> DateTime<Local> {
        self.inner.opened_at
    }

    /// True once the read loop has stopped
    pub fn is_closed(&self) -> bool {
        !self.inner.running.load(Ordering::SeqCst)
    }

    /// Write `payload` followed by `\n`. A failed write ends the session.
    pub async fn write(&self, payload: &[u8]) -> Result<(), SerialError> {
        let mut framed = Vec::with_capacity(payload.len() + 1);
        framed.extend_from_slice(payload);
        framed.push(b'\n');

        let (reply, response) = oneshot::channel();
        self.send_command(SessionCommand::Write {
            payload: framed,
            reply,
        })?;
        response.await.map_err(|_| self.closed_error())?
    }

    /// Change the baud rate. Any buffered partial line is discarded.
    pub async fn set_baud_rate(&self, rate: u32) -> Result<(), SerialError> {
        let (reply, response) = oneshot::channel();
        self.send_command(SessionCommand::SetBaud { rate, reply })?;
        response.await.map_err(|_| self.closed_error())??;

        self.inner.baud_rate.store(rate, Ordering::SeqCst);
        Ok(())
    }

    /// Stop the read loop and release the OS handle. Safe to call repeatedly.
    pub async fn close(&self) {
        let _ = self.inner.commands.send(SessionCommand::Close);

        let task = self.inner.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                log::warn!("Serial session task on {} ended abnormally: {}", self.port(), e);
            }
            log::info!(
                "Closed serial session {} on {} (open since {})",
                self.id(),
                self.port(),
                self.opened_at().format("%H:%M:%S")
            );
        }
    }

    fn send_command(&self, command: SessionCommand) -> Result<(), SerialError> {
        if self.is_closed() {
            return Err(self.closed_error());
        }
        self.inner
            .commands
            .send(command)
            .map_err(|_| self.closed_error())
    }

    fn closed_error(&self) -> SerialError {
        SerialError::SessionClosed {
            port: self.inner.port.clone(),
        }
    }
}

fn run_session(
    mut device: Box<dyn SerialDevice>,
    port: &str,
    config: &SessionConfig,
    commands: std_mpsc::Receiver<SessionCommand>,
    events: mpsc::UnboundedSender<SessionEvent>,
) {
    let mut framer = LineBuffer::new(config.max_line_len);
    let mut buf = vec![0u8; READ_CHUNK];

    log::debug!("Serial read loop started on {}", port);

    'session: loop {
        match commands.recv_timeout(config.poll_interval) {
            Ok(SessionCommand::Close) | Err(std_mpsc::RecvTimeoutError::Disconnected) => {
                break 'session;
            }
            Err(std_mpsc::RecvTimeoutError::Timeout) => {}
            Ok(SessionCommand::Write { payload, reply }) => {
                if let Err(e) = device.write_all(&payload) {
                    let err = SerialError::SessionFailure {
                        port: port.to_string(),
                        reason: format!("write failed: {}", e),
                    };
                    log::error!("{}", err);
                    let _ = reply.send(Err(err.clone()));
                    let _ = events.send(SessionEvent::Failed(err.to_string()));
                    break 'session;
                }
                let _ = reply.send(Ok(()));
            }
            Ok(SessionCommand::SetBaud { rate, reply }) => match device.set_baud_rate(rate) {
                Ok(()) => {
                    let dropped = framer.clear();
                    if dropped > 0 {
                        log::debug!(
                            "Discarded {} buffered bytes on {} after baud change",
                            dropped,
                            port
                        );
                    }
                    log::info!("Baud rate on {} set to {}", port, device.baud_rate());
                    let _ = reply.send(Ok(()));
                }
                Err(e) => {
                    // The previous rate stays in effect
                    let _ = reply.send(Err(SerialError::SessionFailure {
                        port: port.to_string(),
                        reason: format!("cannot set baud rate {}: {}", rate, e),
                    }));
                }
            },
        }

        loop {
            match device.read_available(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    for line in framer.push(&buf[..n]) {
                        let _ = events.send(SessionEvent::LineReceived(line));
                    }
                    if n < buf.len() {
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => break,
                Err(e) => {
                    let err = SerialError::SessionFailure {
                        port: port.to_string(),
                        reason: format!("read failed: {}", e),
                    };
                    log::error!("{}", err);
                    let _ = events.send(SessionEvent::Failed(err.to_string()));
                    break 'session;
                }
            }
        }
    }

    if framer.pending_len() > 0 {
        log::debug!(
            "Dropping {} unterminated bytes on {}",
            framer.pending_len(),
            port
        );
    }
    log::debug!("Serial read loop on {} stopped", port);
}
