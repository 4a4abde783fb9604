use anyhow::anyhow;
use std::error::Error as StdError;
use std::io::ErrorKind;

fn error_chain_matches(err: &(dyn StdError + 'static), kind: ErrorKind, needle: &str) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io_err) = source.downcast_ref::<std::io::Error>()
            && io_err.kind() == kind
        {
            return true;
        }

        if source.to_string().to_ascii_lowercase().contains(needle) {
            return true;
        }

        current = source.source();
    }

    false
}

fn error_chain_has_connection_refused(err: &(dyn StdError + 'static)) -> bool {
    error_chain_matches(err, ErrorKind::ConnectionRefused, "connection refused")
}

fn error_chain_has_timeout(err: &(dyn StdError + 'static)) -> bool {
    error_chain_matches(err, ErrorKind::TimedOut, "timed out")
}

/// Turns a failed completion request into a message that points at the
/// config key most likely to fix it.
pub(crate) fn ai_request_error(
    err: reqwest::Error,
    api_url: &str,
    timeout_secs: u64,
) -> anyhow::Error {
    if err.is_timeout() || error_chain_has_timeout(&err) {
        return anyhow!(
            "AI request timed out after {}s while calling '{}'. \
             Increase ai.timeout_secs or check the service's responsiveness.",
            timeout_secs,
            api_url
        );
    }

    if err.is_connect() {
        if error_chain_has_connection_refused(&err) {
            return anyhow!(
                "Connection refused by AI service at '{}'. \
                 Ensure the service is running and ai.base_url is correct.",
                api_url
            );
        }

        return anyhow!(
            "Failed to connect to AI service at '{}'. \
             Check ai.base_url and network connectivity.",
            api_url
        );
    }

    anyhow!("Failed to call AI service at '{}': {}", api_url, err)
}

#[cfg(test)]
mod tests {
    use super::{ai_request_error, error_chain_has_connection_refused, error_chain_has_timeout};
    use reqwest::Client;
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    fn free_local_addr() -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        let addr = listener.local_addr().expect("address should be available");
        drop(listener);
        addr
    }

    #[tokio::test]
    async fn maps_connection_refused_errors_to_actionable_message() {
        let addr = free_local_addr();
        let api_url = format!("http://{}/v1/chat/completions", addr);
        let client = Client::builder()
            .timeout(Duration::from_millis(300))
            .build()
            .expect("client should build");

        let req_err = client
            .post(&api_url)
            .send()
            .await
            .expect_err("request should fail with connection-refused");
        let msg = format!("{:#}", ai_request_error(req_err, &api_url, 1));

        assert!(
            msg.contains("Connection refused by AI service"),
            "unexpected message: {msg}"
        );
        assert!(msg.contains("ai.base_url"), "unexpected message: {msg}");
    }

    #[tokio::test]
    async fn maps_timeout_errors_to_actionable_message() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        let addr = listener.local_addr().expect("address should be available");
        let server = thread::spawn(move || {
            let (_stream, _) = listener.accept().expect("accept should succeed");
            thread::sleep(Duration::from_secs(1));
        });

        let api_url = format!("http://{}/v1/chat/completions", addr);
        let client = Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("client should build");

        let req_err = client
            .post(&api_url)
            .send()
            .await
            .expect_err("request should fail with timeout");
        let msg = format!("{:#}", ai_request_error(req_err, &api_url, 2));

        assert!(
            msg.contains("AI request timed out after 2s"),
            "unexpected message: {msg}"
        );
        assert!(msg.contains("ai.timeout_secs"), "unexpected message: {msg}");

        server.join().expect("server thread should join");
    }

    #[test]
    fn detects_error_kinds_in_chain() {
        let timeout = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow");
        assert!(error_chain_has_timeout(&timeout));

        let refused = std::io::Error::other("Connection refused (os error 111)");
        assert!(error_chain_has_connection_refused(&refused));
        assert!(!error_chain_has_timeout(&refused));
    }
}
