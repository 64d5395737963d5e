use crate::comm::config::CommConfig;
use crate::comm::error::{Result, StartupError, TransportError};
use crate::comm::protocol::{
    HEADER_LEN, decode_header, decode_request_payload, encode_request_ack, encode_response,
    encode_response_bounded,
};
use crate::comm::types::{MsgType, ResponsePayload, UserRequest, UserResponse};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// What a repeated `(client, seq)` should get back
enum Replay {
    /// First sighting; the request must be handled
    Fresh,
    /// Still being handled
    Pending,
    /// Already answered with these bytes
    Done(Vec<u8>),
}

#[derive(Debug)]
struct Slot {
    touched: Instant,
    /// Encoded RESPONSE once the handler has answered
    response: Option<Vec<u8>>,
}

/// Remembered sequence numbers, per client
#[derive(Debug, Default)]
struct DedupTable {
    clients: HashMap<SocketAddr, HashMap<u32, Slot>>,
}

impl DedupTable {
    fn lookup(&self, client: SocketAddr, seq: u32) -> Replay {
        match self.clients.get(&client).and_then(|slots| slots.get(&seq)) {
            None => Replay::Fresh,
            Some(Slot { response: None, .. }) => Replay::Pending,
            Some(Slot {
                response: Some(bytes),
                ..
            }) => Replay::Done(bytes.clone()),
        }
    }

    /// Mark `seq` as in flight, evicting the client's oldest slot when full
    fn register(&mut self, client: SocketAddr, seq: u32, capacity: usize) {
        let slots = self.clients.entry(client).or_default();
        if slots.len() >= capacity.max(1)
            && let Some(oldest) = slots
                .iter()
                .min_by_key(|(_, slot)| slot.touched)
                .map(|(seq, _)| *seq)
        {
            slots.remove(&oldest);
            debug!(client = %client, seq = oldest, "dedup table full, evicted oldest");
        }
        slots.insert(
            seq,
            Slot {
                touched: Instant::now(),
                response: None,
            },
        );
    }

    fn complete(&mut self, client: SocketAddr, seq: u32, response: Vec<u8>) {
        if let Some(slot) = self.clients.get_mut(&client).and_then(|s| s.get_mut(&seq)) {
            slot.touched = Instant::now();
            slot.response = Some(response);
        }
    }

    /// Forget `seq` so a retransmit is handled as new
    fn forget(&mut self, client: SocketAddr, seq: u32) {
        if let Some(slots) = self.clients.get_mut(&client) {
            slots.remove(&seq);
            if slots.is_empty() {
                self.clients.remove(&client);
            }
        }
    }

    /// Drop answered slots older than `ttl`; in-flight slots stay
    fn sweep(&mut self, ttl: Duration) {
        let now = Instant::now();
        for slots in self.clients.values_mut() {
            slots.retain(|_, slot| slot.response.is_none() || now.duration_since(slot.touched) < ttl);
        }
        self.clients.retain(|_, slots| !slots.is_empty());
    }

    fn client_count(&self) -> usize {
        self.clients.len()
    }
}

/// UDP front door: decodes frames, deduplicates retries, forwards requests
/// to the daemon loop and sends back its answers
pub struct Comm {
    socket: Arc<UdpSocket>,
    config: CommConfig,
    loop_sender: mpsc::Sender<UserRequest>,
    dedup: Arc<Mutex<DedupTable>>,
}

impl Comm {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Bind the socket; the receiver yields decoded requests for the daemon loop
    pub async fn new(
        config: CommConfig,
    ) -> std::result::Result<(Comm, mpsc::Receiver<UserRequest>), StartupError> {
        let addr = config.bind_addr().map_err(StartupError::InvalidAddress)?;
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| StartupError::Bind { addr, source })?;

        if let Ok(local) = socket.local_addr() {
            info!(addr = %local, "comm listening");
        }

        let (tx, rx) = mpsc::channel(1024);
        let comm = Self {
            socket: Arc::new(socket),
            config,
            loop_sender: tx,
            dedup: Arc::new(Mutex::new(DedupTable::default())),
        };
        Ok((comm, rx))
    }

    /// Receive until the socket fails
    pub async fn run(self) -> Result<()> {
        let mut buf = vec![0u8; HEADER_LEN + self.config.max_payload_bytes + 1];
        let mut sweep = tokio::time::interval(SWEEP_INTERVAL);

        loop {
            tokio::select! {
                received = self.socket.recv_from(&mut buf) => {
                    let (len, addr) = received.map_err(|e| {
                        error!(error = %e, "recv failed");
                        TransportError::Recv(e)
                    })?;
                    if let Err(e) = self.on_frame(&buf[..len], addr).await {
                        warn!(client = %addr, error = %e, "frame dropped");
                    }
                }
                _ = sweep.tick() => {
                    let mut dedup = self.dedup.lock().await;
                    dedup.sweep(self.config.dedup_ttl());
                    debug!(clients = dedup.client_count(), "dedup table swept");
                }
            }
        }
    }

    async fn on_frame(&self, frame: &[u8], client: SocketAddr) -> Result<()> {
        let (msg_type, seq) = decode_header(frame)?;

        let payload = &frame[HEADER_LEN..];
        if payload.len() > self.config.max_payload_bytes {
            return Err(TransportError::Oversized {
                len: payload.len(),
                max: self.config.max_payload_bytes,
            });
        }

        match msg_type {
            MsgType::Request => self.on_request(payload, seq, client).await,
            other => {
                debug!(client = %client, seq, msg_type = ?other, "ignoring gate-to-client frame");
                Ok(())
            }
        }
    }

    /// A retransmitted `(client, seq)` never reaches the daemon loop twice:
    /// it gets the cached RESPONSE, or another ACK while the first is running.
    async fn on_request(&self, payload: &[u8], seq: u32, client: SocketAddr) -> Result<()> {
        let mut dedup = self.dedup.lock().await;
        match dedup.lookup(client, seq) {
            Replay::Done(bytes) => {
                drop(dedup);
                info!(client = %client, seq, "duplicate request, replaying response");
                return self.send(&bytes, client).await;
            }
            Replay::Pending => {
                drop(dedup);
                debug!(client = %client, seq, "duplicate request still running, re-ACK");
                return self.send(&encode_request_ack(seq)?, client).await;
            }
            Replay::Fresh => {}
        }

        // Decode before registering so a corrupted frame can be retried
        let request = decode_request_payload(payload)?;
        dedup.register(client, seq, self.config.dedup_capacity);
        drop(dedup);

        info!(client = %client, seq, content_len = request.content.len(), "request accepted");
        if let Err(e) = self.send(&encode_request_ack(seq)?, client).await {
            // Nothing was forwarded; a retransmit must start over
            self.dedup.lock().await.forget(client, seq);
            return Err(e);
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        let forwarded = self
            .loop_sender
            .send(UserRequest {
                content: request.content,
                reply: reply_tx,
                source_addr: client,
            })
            .await;
        if forwarded.is_err() {
            let bytes = encode_response(seq, &ResponsePayload::failure(500, "Internal server error"))?;
            self.dedup.lock().await.complete(client, seq, bytes.clone());
            self.send(&bytes, client).await?;
            return Err(TransportError::LoopClosed);
        }

        tokio::spawn(deliver(
            Arc::clone(&self.socket),
            Arc::clone(&self.dedup),
            reply_rx,
            self.config.reply_timeout(),
            client,
            seq,
        ));
        Ok(())
    }

    async fn send(&self, bytes: &[u8], addr: SocketAddr) -> Result<()> {
        self.socket
            .send_to(bytes, addr)
            .await
            .map(|_| ())
            .map_err(|source| TransportError::Send { addr, source })
    }
}

/// Wait for the daemon loop's answer off the receive path, send it, and keep
/// it for replays
async fn deliver(
    socket: Arc<UdpSocket>,
    dedup: Arc<Mutex<DedupTable>>,
    reply_rx: oneshot::Receiver<UserResponse>,
    limit: Duration,
    client: SocketAddr,
    seq: u32,
) {
    let payload = match timeout(limit, reply_rx).await {
        Ok(Ok(response)) => ResponsePayload::from(response),
        Ok(Err(_)) => {
            warn!(client = %client, seq, "handler dropped the request");
            ResponsePayload::failure(500, "No response from handler")
        }
        Err(_) => {
            warn!(client = %client, seq, limit_secs = limit.as_secs(), "handler timed out");
            ResponsePayload::failure(504, "Response timeout")
        }
    };

    let bytes = match encode_response_bounded(seq, &payload) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(client = %client, seq, error = %e, "cannot encode response");
            return;
        }
    };

    match socket.send_to(&bytes, client).await {
        Ok(_) => debug!(client = %client, seq, status = payload.status, "response sent"),
        Err(e) => warn!(client = %client, seq, error = %e, "response send failed"),
    }

    dedup.lock().await.complete(client, seq, bytes);
}
