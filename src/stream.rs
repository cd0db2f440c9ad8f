// Relay connection: connect, send request_data, forward text frames to the engine.
// The connection is owned by `StreamConnection`; close() or drop stops delivery and
// sends a close frame.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::config::StreamConfig;
use crate::models::ClientMessage;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Largest backoff exponent; keeps the shift in range for long retry budgets.
const MAX_BACKOFF_EXPONENT: u32 = 16;

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("connect to {url} timed out")]
    ConnectTimeout { url: String },
    #[error("connect to {url} failed: {source}")]
    Connect {
        url: String,
        #[source]
        source: tungstenite::Error,
    },
    #[error("encode subscription: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("send subscription: {0}")]
    Subscribe(#[source] tungstenite::Error),
}

/// Exponential backoff: `initial * 2^(attempt - 1)`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub max_attempts: u32,
    pub initial: Duration,
    pub max: Duration,
}

impl Backoff {
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        self.initial.saturating_mul(1u32 << exp).min(self.max)
    }
}

#[derive(Debug, Clone)]
pub struct StreamOptions {
    pub url: String,
    pub device_ids: Vec<String>,
    pub connect_timeout: Duration,
    /// `None`: a dropped connection is not re-established.
    pub reconnect: Option<Backoff>,
}

impl StreamOptions {
    pub fn from_config(config: &StreamConfig) -> Self {
        let reconnect = config.reconnect.enabled.then(|| Backoff {
            max_attempts: config.reconnect.max_attempts,
            initial: Duration::from_millis(config.reconnect.initial_backoff_ms),
            max: Duration::from_millis(config.reconnect.max_backoff_ms),
        });
        Self {
            url: config.url.clone(),
            device_ids: config.device_ids.clone(),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            reconnect,
        }
    }
}

/// Handle to an open, subscribed relay connection.
pub struct StreamConnection {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl StreamConnection {
    /// Connects, sends the subscription and starts forwarding text frames to `inbound`.
    /// Fails if the first connection cannot be established.
    pub async fn open(
        options: StreamOptions,
        inbound: mpsc::Sender<String>,
    ) -> Result<Self, StreamError> {
        let socket = connect_and_subscribe(&options).await?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run(socket, options, inbound, shutdown_rx));
        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    /// Like `open`, but connects inside the reader task. A failed first attempt goes
    /// through the same backoff as a dropped connection, so a relay that comes up
    /// after the dashboard is still picked up.
    pub fn spawn(options: StreamOptions, inbound: mpsc::Sender<String>) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let first = tokio::select! {
                _ = &mut shutdown_rx => return,
                result = connect_and_subscribe(&options) => result,
            };
            let socket = match first {
                Ok(socket) => socket,
                Err(e) => {
                    warn!(error = %e, url = %options.url, "telemetry relay unavailable");
                    let Some(backoff) = options.reconnect else {
                        warn!("reconnect disabled; chart will not update");
                        return;
                    };
                    match reconnect(&options, backoff, &mut shutdown_rx).await {
                        Some(socket) => socket,
                        None => return,
                    }
                }
            };
            run(socket, options, inbound, shutdown_rx).await;
        });
        Self {
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// True once the reader has stopped (closed, gave up reconnecting, or receiver gone).
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Closes the connection and waits for the reader to exit.
    pub async fn close(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for StreamConnection {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn connect_and_subscribe(options: &StreamOptions) -> Result<WsStream, StreamError> {
    let connect = connect_async(options.url.as_str());
    let (mut socket, _response) = timeout(options.connect_timeout, connect)
        .await
        .map_err(|_| StreamError::ConnectTimeout {
            url: options.url.clone(),
        })?
        .map_err(|source| StreamError::Connect {
            url: options.url.clone(),
            source,
        })?;
    let request = serde_json::to_string(&ClientMessage::subscribe(&options.device_ids))?;
    socket
        .send(Message::Text(request.into()))
        .await
        .map_err(StreamError::Subscribe)?;
    info!(
        url = %options.url,
        devices = options.device_ids.len(),
        "subscribed to telemetry relay"
    );
    Ok(socket)
}

enum PumpExit {
    Shutdown,
    ReceiverGone,
    Dropped(String),
}

async fn run(
    mut socket: WsStream,
    options: StreamOptions,
    inbound: mpsc::Sender<String>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    loop {
        match pump(&mut socket, &inbound, &mut shutdown_rx).await {
            PumpExit::Shutdown | PumpExit::ReceiverGone => {
                let _ = socket.close(None).await;
                info!(url = %options.url, "telemetry stream closed");
                return;
            }
            PumpExit::Dropped(reason) => {
                warn!(url = %options.url, reason = %reason, "telemetry stream dropped");
                let Some(backoff) = options.reconnect else {
                    warn!("reconnect disabled; chart will not update");
                    return;
                };
                match reconnect(&options, backoff, &mut shutdown_rx).await {
                    Some(fresh) => socket = fresh,
                    None => return,
                }
            }
        }
    }
}

async fn pump(
    socket: &mut WsStream,
    inbound: &mpsc::Sender<String>,
    shutdown_rx: &mut oneshot::Receiver<()>,
) -> PumpExit {
    loop {
        tokio::select! {
            _ = &mut *shutdown_rx => return PumpExit::Shutdown,
            frame = socket.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if inbound.send(text.as_str().to_owned()).await.is_err() {
                        return PumpExit::ReceiverGone;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    return PumpExit::Dropped("closed by relay".into());
                }
                Some(Ok(other)) => debug!(kind = ?other, "non-text frame ignored"),
                Some(Err(e)) => return PumpExit::Dropped(e.to_string()),
            },
        }
    }
}

/// Retries with backoff and resubscribes. `None` on shutdown or when attempts run out.
async fn reconnect(
    options: &StreamOptions,
    backoff: Backoff,
    shutdown_rx: &mut oneshot::Receiver<()>,
) -> Option<WsStream> {
    for attempt in 1..=backoff.max_attempts {
        let delay = backoff.delay(attempt);
        info!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "reconnecting to telemetry relay"
        );
        tokio::select! {
            _ = &mut *shutdown_rx => return None,
            _ = sleep(delay) => {}
        }
        tokio::select! {
            _ = &mut *shutdown_rx => return None,
            result = connect_and_subscribe(options) => match result {
                Ok(socket) => return Some(socket),
                Err(e) => warn!(error = %e, attempt, "reconnect failed"),
            },
        }
    }
    warn!(
        attempts = backoff.max_attempts,
        "giving up on telemetry relay; chart will not update"
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let b = Backoff {
            max_attempts: 10,
            initial: Duration::from_millis(500),
            max: Duration::from_secs(3),
        };
        assert_eq!(b.delay(1), Duration::from_millis(500));
        assert_eq!(b.delay(2), Duration::from_millis(1000));
        assert_eq!(b.delay(3), Duration::from_millis(2000));
        assert_eq!(b.delay(4), Duration::from_secs(3));
        assert_eq!(b.delay(60), Duration::from_secs(3));
    }
}
