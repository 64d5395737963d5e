use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Listener settings for the datagram transport
#[derive(Debug, Clone)]
pub struct CommConfig {
    /// IP to bind, `0.0.0.0` by default
    pub listen_addr: String,
    /// 9710 by default; 0 picks an ephemeral port
    pub listen_port: u16,
    /// Requests whose payload exceeds this are dropped
    pub max_payload_bytes: usize,
    /// Remembered sequence numbers per client
    pub dedup_capacity: usize,
    /// How long a finished reply stays replayable
    pub dedup_ttl_secs: u64,
    /// Upper bound on how long one request may take to answer
    pub reply_timeout_secs: u64,
}

impl Default for CommConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            listen_port: 9710,
            max_payload_bytes: 64 * 1024,
            dedup_capacity: 256,
            dedup_ttl_secs: 300,
            reply_timeout_secs: 300,
        }
    }
}

impl CommConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, String> {
        let ip: IpAddr = self
            .listen_addr
            .trim()
            .parse()
            .map_err(|_| format!("'{}' is not an IP address", self.listen_addr))?;
        Ok(SocketAddr::new(ip, self.listen_port))
    }

    pub fn dedup_ttl(&self) -> Duration {
        Duration::from_secs(self.dedup_ttl_secs)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_secs)
    }
}
