//! WebSocket transport.
//!
//! Each transport is a tokio task that connects, then relays frames between
//! the socket and its [`TransportLink`] until either side goes away.

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use super::session::{Connector, TransportEvent, TransportEventKind, TransportLink};

/// Connector opening real WebSocket connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl WsConnector {
    /// Create a connector.
    pub fn new() -> Self {
        Self
    }
}

impl Connector for WsConnector {
    fn connect(&self, target: Url, link: TransportLink) {
        tokio::spawn(run_transport(target, link));
    }
}

/// Drive one WebSocket connection.
async fn run_transport(target: Url, link: TransportLink) {
    let TransportLink {
        generation,
        mut outbound,
        mut shutdown,
        events,
    } = link;
    let emit = |kind: TransportEventKind| {
        let _ = events.send(TransportEvent { generation, kind });
    };

    tracing::debug!("Transport {} connecting to {}", generation, target);

    let stream = tokio::select! {
        result = connect_async(target.as_str()) => match result {
            Ok((stream, _response)) => stream,
            Err(e) => {
                emit(TransportEventKind::Failed(e.to_string()));
                return;
            }
        },
        _ = &mut shutdown => {
            tracing::debug!("Transport {} released before connecting", generation);
            return;
        }
    };

    emit(TransportEventKind::Ready);
    let (mut ws_sender, mut ws_receiver) = stream.split();

    loop {
        tokio::select! {
            incoming = ws_receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => emit(TransportEventKind::Frame(text)),
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame
                            .map(|f| f.reason.to_string())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "closed by server".to_string());
                        emit(TransportEventKind::Closed(reason));
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        emit(TransportEventKind::Failed(e.to_string()));
                        break;
                    }
                    None => {
                        emit(TransportEventKind::Closed("connection closed".to_string()));
                        break;
                    }
                }
            }

            outgoing = outbound.recv() => {
                match outgoing {
                    Some(text) => {
                        if let Err(e) = ws_sender.send(Message::Text(text)).await {
                            emit(TransportEventKind::Failed(e.to_string()));
                            break;
                        }
                    }
                    None => {
                        let _ = ws_sender.send(Message::Close(None)).await;
                        break;
                    }
                }
            }

            _ = &mut shutdown => {
                let _ = ws_sender.send(Message::Close(None)).await;
                break;
            }
        }
    }

    tracing::debug!("Transport {} finished", generation);
}
