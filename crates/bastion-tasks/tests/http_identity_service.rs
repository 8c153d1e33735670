//! `HttpIdentityService` against a local one-shot HTTP responder.

use std::time::Duration;

use bastion_core::{BastionError, ErrorRegistry};
use bastion_tasks::{HttpIdentityService, IdentityService, RequestSigner, SignedSecretRequest};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

const KEY: &str = "pre-shared-key";

/// Accepts one connection, answers with `status` and `body`, and returns the
/// raw request it received.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        request
    });

    (format!("http://{addr}/secret"), handle)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];

    loop {
        let read = socket.read(&mut chunk).await.unwrap();
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);

        let text = String::from_utf8_lossy(&buffer).into_owned();
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buffer.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buffer).into_owned()
}

fn signed_request() -> SignedSecretRequest {
    RequestSigner::new("billing", KEY).unwrap().sign().unwrap()
}

#[tokio::test]
async fn posts_signed_request_and_decodes_material() {
    let (endpoint, server) = serve_once(
        "200 OK",
        r#"{"currentSecret":"s2","previousSecret":"s1","expires":3600000}"#,
    )
    .await;
    let service = HttpIdentityService::new(endpoint, Duration::from_secs(5)).unwrap();

    let material = service.fetch_latest_secret(&signed_request()).await.unwrap();
    assert_eq!(material.current_secret, "s2");
    assert_eq!(material.previous_secret.as_deref(), Some("s1"));
    assert_eq!(material.validity_window_ms, 3_600_000);

    let raw = server.await.unwrap();
    assert!(raw.starts_with("POST /secret "));
    let body = raw.split_once("\r\n\r\n").map(|(_, body)| body).unwrap();
    let received: SignedSecretRequest = serde_json::from_str(body).unwrap();
    assert_eq!(received.app_name, "billing");
    assert!(received.verify(KEY));
}

#[tokio::test]
async fn error_status_carries_external_detail() {
    let (endpoint, server) = serve_once(
        "403 Forbidden",
        r#"{"code":320,"message":"The request was understood, but it has been refused."}"#,
    )
    .await;
    let service = HttpIdentityService::new(endpoint, Duration::from_secs(5)).unwrap();

    let error = service
        .fetch_latest_secret(&signed_request())
        .await
        .unwrap_err();
    server.await.unwrap();

    assert!(matches!(error, BastionError::ExternalServiceFailure { .. }));
    let classification = ErrorRegistry::with_defaults().describe(&error);
    assert_eq!(classification.code, 510);
    let external = classification.external.expect("external detail");
    assert_eq!(external.code.as_deref(), Some("320"));
}

#[tokio::test]
async fn undecodable_body_is_external_failure() {
    let (endpoint, server) = serve_once("200 OK", r#"{"unexpected":true}"#).await;
    let service = HttpIdentityService::new(endpoint, Duration::from_secs(5)).unwrap();

    let error = service
        .fetch_latest_secret(&signed_request())
        .await
        .unwrap_err();
    server.await.unwrap();

    assert!(matches!(error, BastionError::ExternalServiceFailure { .. }));
}

#[tokio::test]
async fn slow_service_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}/secret", listener.local_addr().unwrap());
    let server = tokio::spawn(async move {
        let (_socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
    });
    let service = HttpIdentityService::new(endpoint, Duration::from_millis(200)).unwrap();

    let error = service
        .fetch_latest_secret(&signed_request())
        .await
        .unwrap_err();
    server.abort();

    assert!(matches!(error, BastionError::ExternalTimeout { .. }));
    assert_eq!(ErrorRegistry::with_defaults().describe(&error).code, 530);
}

#[tokio::test]
async fn endpoint_url_is_used_verbatim() {
    let (endpoint, server) = serve_once(
        "200 OK",
        r#"{"currentSecret":"s1","expires":60000}"#,
    )
    .await;
    let endpoint = endpoint.replace("/secret", "/iam/v2/rotate");
    let service = HttpIdentityService::new(endpoint, Duration::from_secs(5)).unwrap();

    service.fetch_latest_secret(&signed_request()).await.unwrap();

    let raw = server.await.unwrap();
    assert!(raw.starts_with("POST /iam/v2/rotate HTTP/1.1\r\n"));
}
