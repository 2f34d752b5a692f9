//! Serial bridge
//!
//! Binds one client channel to one serial session for the channel's
//! lifetime. The bridge races the next client frame against the next session
//! event, so both directions stay live, and releases the session from the
//! registry however the loop ends.

use futures_util::{Stream, StreamExt};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::errors::SerialError;
use crate::models::{ClientCommand, CommandParseError, InboundFrame, OutboundMessage, SessionEvent};
use crate::serial::registry::SessionRegistry;
use crate::serial::session::SerialSession;

/// Why a bridge stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeExit {
    /// Client closed the channel
    ClientDisconnected,
    /// Outbound side went away before the client closed
    ClientGone,
    /// Session failed; the client received one error notice
    SessionFailed(String),
    /// A newer monitor took over the port
    Evicted,
    /// The port could not be opened
    OpenFailed(String),
}

/// Connects monitor clients to serial sessions
#[derive(Clone)]
pub struct SerialBridge {
    registry: Arc<SessionRegistry>,
}

impl SerialBridge {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Run the bridge for `port` until the client leaves or the session ends
    pub async fn run<S>(
        &self,
        port: &str,
        baud_rate: u32,
        inbound: S,
        outbound: mpsc::Sender<OutboundMessage>,
    ) -> BridgeExit
    where
        S: Stream<Item = InboundFrame> + Send,
    {
        let (session, mut events) = match self.registry.open(port, baud_rate).await {
            Ok(opened) => opened,
            Err(e) => {
                log::warn!("Monitor for {} could not start: {}", port, e);
                let _ = outbound.send(OutboundMessage::Error(e.to_string())).await;
                return BridgeExit::OpenFailed(e.to_string());
            }
        };

        let mut inbound = std::pin::pin!(inbound);

        let exit = loop {
            tokio::select! {
                frame = inbound.next() => match frame {
                    None | Some(InboundFrame::Close) => break BridgeExit::ClientDisconnected,
                    Some(InboundFrame::Text(text)) => {
                        if let ControlFlow::Break(exit) =
                            apply_frame(&session, &text, &outbound).await
                        {
                            break exit;
                        }
                    }
                },
                event = events.recv() => match event {
                    Some(SessionEvent::LineReceived(line)) => {
                        if outbound.send(OutboundMessage::Line(line)).await.is_err() {
                            break BridgeExit::ClientGone;
                        }
                    }
                    Some(SessionEvent::Failed(reason)) => {
                        let _ = outbound.send(OutboundMessage::Error(reason.clone())).await;
                        break BridgeExit::SessionFailed(reason);
                    }
                    None => break BridgeExit::Evicted,
                },
            }
        };

        self.registry.release(&session).await;
        log::info!("Monitor on {} ended: {:?}", port, exit);
        exit
    }
}

async fn apply_frame(
    session: &SerialSession,
    text: &str,
    outbound: &mpsc::Sender<OutboundMessage>,
) -> ControlFlow<BridgeExit> {
    let command = match ClientCommand::parse(text) {
        Ok(command) => command,
        Err(CommandParseError::Unrecognized) => {
            log::debug!("Ignoring client frame on {}: {:?}", session.port(), text);
            return ControlFlow::Continue(());
        }
        Err(CommandParseError::InvalidBaud(value)) => {
            return notify(
                outbound,
                OutboundMessage::Error(format!("Invalid baud rate: {}", value)),
            )
            .await;
        }
    };

    match command {
        ClientCommand::Send(payload) => match session.write(payload.as_bytes()).await {
            Ok(()) => ControlFlow::Continue(()),
            Err(e) => ControlFlow::Break(session_error(e, outbound).await),
        },
        ClientCommand::SetBaud(rate) => match session.set_baud_rate(rate).await {
            Ok(()) => notify(outbound, OutboundMessage::Notice(format!("Baud rate set to {}", rate))).await,
            // The device refused the rate; the session keeps its old one
            Err(SerialError::SessionFailure { reason, .. }) => {
                notify(outbound, OutboundMessage::Error(reason)).await
            }
            Err(e) => ControlFlow::Break(session_error(e, outbound).await),
        },
    }
}

async fn notify(
    outbound: &mpsc::Sender<OutboundMessage>,
    message: OutboundMessage,
) -> ControlFlow<BridgeExit> {
    match outbound.send(message).await {
        Ok(()) => ControlFlow::Continue(()),
        Err(_) => ControlFlow::Break(BridgeExit::ClientGone),
    }
}

async fn session_error(err: SerialError, outbound: &mpsc::Sender<OutboundMessage>) -> BridgeExit {
    match err {
        SerialError::SessionClosed { .. } => BridgeExit::Evicted,
        other => {
            let reason = other.to_string();
            let _ = outbound.send(OutboundMessage::Error(reason.clone())).await;
            BridgeExit::SessionFailed(reason)
        }
    }
}
