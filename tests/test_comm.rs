// Integration tests for Comm module
// This file should be run with cargo test --test test_comm

#[path = "../src/comm/mod.rs"]
mod comm;

#[path = "../src/policy/mod.rs"]
mod policy;

#[path = "../src/history/mod.rs"]
mod history;

#[path = "../src/executor/mod.rs"]
mod executor;

#[path = "../src/service/mod.rs"]
mod service;

use comm::protocol::{HEADER_LEN, decode_header, decode_response_payload, encode_request};
use comm::types::MsgType;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    });
}

fn test_config() -> comm::CommConfig {
    comm::CommConfig {
        listen_addr: "127.0.0.1".to_string(),
        listen_port: 0,
        ..Default::default()
    }
}

/// Bind a Comm on an ephemeral port and run it in the background
async fn start_comm(
    config: comm::CommConfig,
) -> (SocketAddr, mpsc::Receiver<comm::UserRequest>) {
    let (comm, loop_rx) = comm::Comm::new(config).await.unwrap();
    let addr = comm.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = comm.run().await;
    });
    (addr, loop_rx)
}

async fn connect(addr: SocketAddr) -> UdpSocket {
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.connect(addr).await.unwrap();
    client
}

/// Receive one packet: (type, seq, payload bytes)
async fn recv_packet(client: &UdpSocket) -> (MsgType, u32, Vec<u8>) {
    let mut buf = vec![0u8; 70_000];
    let len = tokio::time::timeout(Duration::from_secs(5), client.recv(&mut buf))
        .await
        .expect("timed out waiting for packet")
        .unwrap();
    let (msg_type, seq) = decode_header(&buf[..len]).unwrap();
    (msg_type, seq, buf[HEADER_LEN..len].to_vec())
}

/// Receive the ACK and then the RESPONSE for `seq`
async fn recv_reply(client: &UdpSocket, expected_seq: u32) -> comm::ResponsePayload {
    let (msg_type, seq, _) = recv_packet(client).await;
    assert_eq!(msg_type, MsgType::RequestAck);
    assert_eq!(seq, expected_seq);

    let (msg_type, seq, payload) = recv_packet(client).await;
    assert_eq!(msg_type, MsgType::Response);
    assert_eq!(seq, expected_seq);
    decode_response_payload(&payload).unwrap()
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    /// Normal request-response
    #[tokio::test]
    async fn test_normal_request_response() {
        init_tracing();

        let (addr, mut loop_rx) = start_comm(test_config()).await;

        tokio::spawn(async move {
            if let Some(req) = loop_rx.recv().await {
                assert_eq!(req.content, r#"{"op":"list_commands"}"#);
                req.reply
                    .send(comm::UserResponse::ok(r#"{"total":0}"#.to_string()))
                    .ok();
            }
        });

        let client = connect(addr).await;
        client
            .send(&encode_request(1, r#"{"op":"list_commands"}"#).unwrap())
            .await
            .unwrap();

        let response = recv_reply(&client, 1).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.content, r#"{"total":0}"#);
        assert!(!response.is_error);
    }

    /// Error status is carried through and flagged
    #[tokio::test]
    async fn test_error_status() {
        init_tracing();

        let (addr, mut loop_rx) = start_comm(test_config()).await;

        tokio::spawn(async move {
            if let Some(req) = loop_rx.recv().await {
                req.reply
                    .send(comm::UserResponse::new(404, "missing".to_string()))
                    .ok();
            }
        });

        let client = connect(addr).await;
        client.send(&encode_request(7, "{}").unwrap()).await.unwrap();

        let response = recv_reply(&client, 7).await;
        assert_eq!(response.status, 404);
        assert!(response.is_error);
    }

    /// Duplicate request deduplication: one request reaches the main loop,
    /// the duplicate gets the cached response
    #[tokio::test]
    async fn test_duplicate_request_dedup() {
        init_tracing();

        let (addr, mut loop_rx) = start_comm(test_config()).await;
        let (req_tx, mut req_rx) = mpsc::channel::<String>(10);

        tokio::spawn(async move {
            while let Some(req) = loop_rx.recv().await {
                let _ = req_tx.send(req.content.clone()).await;
                let _ = req.reply.send(comm::UserResponse::ok("ok".to_string()));
            }
        });

        let client = connect(addr).await;
        let packet = encode_request(1, "test").unwrap();
        client.send(&packet).await.unwrap();
        let first = recv_reply(&client, 1).await;
        assert_eq!(first.content, "ok");

        // The cached entry is written after the send; give it a moment
        tokio::time::sleep(Duration::from_millis(50)).await;
        client.send(&packet).await.unwrap();

        let (msg_type, seq, payload) = recv_packet(&client).await;
        assert_eq!(msg_type, MsgType::Response);
        assert_eq!(seq, 1);
        assert_eq!(decode_response_payload(&payload).unwrap().content, "ok");

        let mut received = Vec::new();
        while let Ok(Some(content)) =
            tokio::time::timeout(Duration::from_millis(100), req_rx.recv()).await
        {
            received.push(content);
        }
        assert_eq!(received.len(), 1, "Expected 1 request, got {:?}", received);
    }

    /// A duplicate arriving while the first is still running is only ACKed
    #[tokio::test]
    async fn test_duplicate_while_pending_gets_ack() {
        init_tracing();

        let (addr, mut loop_rx) = start_comm(test_config()).await;
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let (req_tx, mut req_rx) = mpsc::channel::<String>(10);

        tokio::spawn(async move {
            let mut release_rx = Some(release_rx);
            while let Some(req) = loop_rx.recv().await {
                let _ = req_tx.send(req.content.clone()).await;
                if let Some(rx) = release_rx.take() {
                    let _ = rx.await;
                }
                let _ = req.reply.send(comm::UserResponse::ok("done".to_string()));
            }
        });

        let client = connect(addr).await;
        let packet = encode_request(3, "slow").unwrap();
        client.send(&packet).await.unwrap();
        let (msg_type, _, _) = recv_packet(&client).await;
        assert_eq!(msg_type, MsgType::RequestAck);

        client.send(&packet).await.unwrap();
        let (msg_type, seq, _) = recv_packet(&client).await;
        assert_eq!(msg_type, MsgType::RequestAck);
        assert_eq!(seq, 3);

        release_tx.send(()).unwrap();
        let (msg_type, _, payload) = recv_packet(&client).await;
        assert_eq!(msg_type, MsgType::Response);
        assert_eq!(decode_response_payload(&payload).unwrap().content, "done");

        let mut received = 0;
        while let Ok(Some(_)) =
            tokio::time::timeout(Duration::from_millis(100), req_rx.recv()).await
        {
            received += 1;
        }
        assert_eq!(received, 1);
    }

    /// With the daemon loop gone, a retransmit replays the cached 500
    /// instead of being ACKed forever
    #[tokio::test]
    async fn test_closed_loop_failure_is_replayed() {
        init_tracing();

        let (addr, loop_rx) = start_comm(test_config()).await;
        drop(loop_rx);

        let client = connect(addr).await;
        let packet = encode_request(7, "{}").unwrap();
        client.send(&packet).await.unwrap();

        let first = recv_reply(&client, 7).await;
        assert_eq!(first.status, 500);
        assert!(first.is_error);

        for _ in 0..3 {
            client.send(&packet).await.unwrap();
            let (msg_type, seq, payload) = recv_packet(&client).await;
            assert_eq!(msg_type, MsgType::Response);
            assert_eq!(seq, 7);
            assert_eq!(decode_response_payload(&payload).unwrap().status, 500);
        }
    }

    /// Slow requests do not hold up other clients
    #[tokio::test]
    async fn test_slow_request_does_not_block() {
        init_tracing();

        let (addr, mut loop_rx) = start_comm(test_config()).await;

        tokio::spawn(async move {
            while let Some(req) = loop_rx.recv().await {
                tokio::spawn(async move {
                    if req.content == "slow" {
                        tokio::time::sleep(Duration::from_millis(500)).await;
                    }
                    let _ = req.reply.send(comm::UserResponse::ok(req.content.clone()));
                });
            }
        });

        let slow = connect(addr).await;
        let fast = connect(addr).await;
        slow.send(&encode_request(1, "slow").unwrap()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        fast.send(&encode_request(1, "fast").unwrap()).await.unwrap();

        let start = std::time::Instant::now();
        let response = recv_reply(&fast, 1).await;
        assert_eq!(response.content, "fast");
        assert!(start.elapsed() < Duration::from_millis(400));

        let response = recv_reply(&slow, 1).await;
        assert_eq!(response.content, "slow");
    }

    /// Handler that never replies yields a timeout response
    #[tokio::test]
    async fn test_reply_timeout() {
        init_tracing();

        let config = comm::CommConfig {
            reply_timeout_secs: 1,
            ..test_config()
        };
        let (addr, mut loop_rx) = start_comm(config).await;

        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Some(req) = loop_rx.recv().await {
                held.push(req);
            }
        });

        let client = connect(addr).await;
        client.send(&encode_request(5, "{}").unwrap()).await.unwrap();

        let response = recv_reply(&client, 5).await;
        assert_eq!(response.status, 504);
        assert!(response.is_error);
    }

    /// Oversized payload is dropped without a reply
    #[tokio::test]
    async fn test_payload_too_large() {
        init_tracing();

        let config = comm::CommConfig {
            max_payload_bytes: 64,
            ..test_config()
        };
        let (addr, _loop_rx) = start_comm(config).await;

        let client = connect(addr).await;
        let content = "x".repeat(200);
        client
            .send(&encode_request(1, &content).unwrap())
            .await
            .unwrap();

        let mut buf = [0u8; 1024];
        let result =
            tokio::time::timeout(Duration::from_millis(200), client.recv(&mut buf)).await;
        assert!(result.is_err());
    }

    /// Empty packet and client-sent ACK are ignored; the server keeps serving
    #[tokio::test]
    async fn test_garbage_then_valid() {
        init_tracing();

        let (addr, mut loop_rx) = start_comm(test_config()).await;

        tokio::spawn(async move {
            while let Some(req) = loop_rx.recv().await {
                let _ = req.reply.send(comm::UserResponse::ok("alive".to_string()));
            }
        });

        let client = connect(addr).await;
        let _ = client.send(&[]).await;
        let mut ack = vec![MsgType::RequestAck as u8];
        ack.extend_from_slice(&1u32.to_be_bytes());
        let _ = client.send(&ack).await;
        let _ = client.send(&[0xFF, 0, 0, 0, 1]).await;

        client.send(&encode_request(2, "{}").unwrap()).await.unwrap();
        let response = recv_reply(&client, 2).await;
        assert_eq!(response.content, "alive");
    }

    /// Daemon not running - client should timeout
    #[tokio::test]
    async fn test_client_timeout_no_daemon() {
        init_tracing();

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.connect("127.0.0.1:19999").await.unwrap();

        let packet = encode_request(1, "test").unwrap();
        let _ = client.send(&packet).await;

        let mut buf = [0u8; 1024];
        let result =
            tokio::time::timeout(Duration::from_millis(100), client.recv_from(&mut buf)).await;
        assert!(result.is_err());
    }

    /// Full path: UDP frame, service dispatch, execution, JSON reply
    #[tokio::test]
    async fn test_end_to_end_execute() {
        init_tracing();

        let executor = executor::Executor::new(
            executor::ExecutorConfig::default(),
            Arc::new(policy::CommandPolicy::default()),
            Arc::new(history::HistoryStore::default()),
        );
        let service = Arc::new(service::ShellService::new(Arc::new(executor)));

        let (addr, mut loop_rx) = start_comm(test_config()).await;
        let loop_service = Arc::clone(&service);
        tokio::spawn(async move {
            while let Some(req) = loop_rx.recv().await {
                let service = Arc::clone(&loop_service);
                tokio::spawn(async move {
                    let (status, body) = service.handle_json(&req.content).await;
                    let _ = req
                        .reply
                        .send(comm::UserResponse::new(status, body.to_string()));
                });
            }
        });

        let client = connect(addr).await;

        client
            .send(&encode_request(1, r#"{"op":"execute","command":"pwd"}"#).unwrap())
            .await
            .unwrap();
        let response = recv_reply(&client, 1).await;
        assert_eq!(response.status, 200);
        let body: serde_json::Value = serde_json::from_str(&response.content).unwrap();
        assert_eq!(body["exitCode"], 0);
        assert_eq!(body["id"], 1);

        client
            .send(&encode_request(2, r#"{"op":"execute","command":"rm -rf /"}"#).unwrap())
            .await
            .unwrap();
        let response = recv_reply(&client, 2).await;
        assert_eq!(response.status, 400);
        assert!(response.is_error);

        assert_eq!(service.executor().history().len(), 1);
    }
}
