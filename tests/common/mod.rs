//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;

use dns_gateway::config::GatewayConfig;
use dns_gateway::http::HttpServer;
use dns_gateway::lifecycle::Shutdown;
use tokio::net::{TcpListener, UdpSocket};

/// Address every answer from [`start_dns_responder`] resolves to.
pub const RESPONDER_ADDR: [u8; 4] = [192, 0, 2, 1];

/// Config for a gateway on an ephemeral loopback port running `tool`.
pub fn test_config(tool: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.lookup.tool = tool.to_string();
    config.lookup.timeout_ms = 2000;
    config
}

/// Start a gateway and return its address. Dropping the returned
/// `Shutdown` does not stop it; call `trigger`.
pub async fn start_gateway(config: GatewayConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Start a UDP DNS server on loopback that answers every A question with
/// [`RESPONDER_ADDR`].
pub async fn start_dns_responder() -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        loop {
            let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                break;
            };
            if let Some(reply) = answer_a_query(&buf[..len]) {
                let _ = socket.send_to(&reply, peer).await;
            }
        }
    });

    addr
}

fn answer_a_query(query: &[u8]) -> Option<Vec<u8>> {
    if query.len() < 12 {
        return None;
    }

    // Walk the question name to find the end of the first question.
    let mut pos = 12;
    loop {
        let label = *query.get(pos)? as usize;
        pos += 1;
        if label == 0 {
            break;
        }
        pos += label;
    }
    let question_end = pos + 4;
    let question = query.get(12..question_end)?;
    let qtype = u16::from_be_bytes([query[pos], query[pos + 1]]);
    let answers: u16 = if qtype == 1 { 1 } else { 0 };

    let mut reply = Vec::with_capacity(question_end + 16);
    reply.extend_from_slice(&query[..2]);
    reply.extend_from_slice(&[0x81, 0x80]);
    reply.extend_from_slice(&1u16.to_be_bytes());
    reply.extend_from_slice(&answers.to_be_bytes());
    reply.extend_from_slice(&[0, 0, 0, 0]);
    reply.extend_from_slice(question);

    if answers == 1 {
        reply.extend_from_slice(&[0xc0, 0x0c]);
        reply.extend_from_slice(&1u16.to_be_bytes());
        reply.extend_from_slice(&1u16.to_be_bytes());
        reply.extend_from_slice(&300u32.to_be_bytes());
        reply.extend_from_slice(&4u16.to_be_bytes());
        reply.extend_from_slice(&RESPONDER_ADDR);
    }

    Some(reply)
}

/// Write an executable shell script into `dir` for use as the lookup tool.
#[cfg(unix)]
pub fn write_tool_script(dir: &std::path::Path, body: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("lookup-tool.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
