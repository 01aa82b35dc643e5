//! The `dnsq` binary against a running gateway.

use std::process::Output;

use tokio::process::Command;

mod common;

use common::{start_gateway, test_config};

async fn dnsq(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dnsq"))
        .args(args)
        .output()
        .await
        .unwrap()
}

#[cfg(unix)]
#[tokio::test]
async fn test_successful_lookup_exits_zero() {
    let (addr, shutdown) = start_gateway(test_config("echo")).await;
    let url = format!("http://{}", addr);

    let out = dnsq(&["--url", &url, "192.0.2.53", "example.com", "--short"]).await;
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("\"success\": true"), "{}", stdout);

    let out = dnsq(&["--url", &url, "health"]).await;
    assert!(out.status.success());

    shutdown.trigger();
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_lookup_exits_nonzero() {
    let (addr, shutdown) = start_gateway(test_config("false")).await;
    let url = format!("http://{}", addr);

    let out = dnsq(&["--url", &url, "192.0.2.53", "example.com"]).await;
    assert!(!out.status.success());
    assert!(out.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("500"), "{}", stderr);

    shutdown.trigger();
}
