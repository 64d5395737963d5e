use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::sync::oneshot;

/// First byte of every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MsgType {
    /// client to gate, carries a JSON operation
    Request = 0x01,
    /// gate to client, empty; the request is being worked on
    RequestAck = 0x02,
    /// gate to client, the status and JSON body
    Response = 0x03,
}

impl TryFrom<u8> for MsgType {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(Self::Request),
            0x02 => Ok(Self::RequestAck),
            0x03 => Ok(Self::Response),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestPayload {
    /// JSON-encoded `ApiRequest`
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsePayload {
    /// HTTP-style status code
    pub status: u16,
    /// JSON body
    pub content: String,
    /// `status >= 400`
    pub is_error: bool,
}

impl ResponsePayload {
    /// Transport-level failure with a JSON error body
    pub fn failure(status: u16, message: &str) -> Self {
        Self {
            status,
            content: serde_json::json!({ "status": "error", "message": message }).to_string(),
            is_error: true,
        }
    }
}

/// A decoded request handed to the daemon loop
#[derive(Debug)]
pub struct UserRequest {
    pub content: String,
    /// Answer exactly once; dropping it yields a 500
    pub reply: oneshot::Sender<UserResponse>,
    pub source_addr: SocketAddr,
}

/// The daemon loop's answer to a [`UserRequest`]
#[derive(Debug)]
pub struct UserResponse {
    pub status: u16,
    pub content: String,
}

impl UserResponse {
    pub fn new(status: u16, content: String) -> Self {
        Self { status, content }
    }

    pub fn ok(content: String) -> Self {
        Self::new(200, content)
    }

    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

impl From<UserResponse> for ResponsePayload {
    fn from(response: UserResponse) -> Self {
        Self {
            is_error: response.is_error(),
            status: response.status,
            content: response.content,
        }
    }
}
