//! Connectivity probe logic.
//!
//! A probing pass walks the configured endpoints in order and stops at the
//! first one that answers. Each endpoint gets one bounded HTTP `GET`; any
//! response, whatever its status code, proves the host is online.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{HOST, USER_AGENT};
use http::{Method, Request, Uri};
use http_body_util::Empty;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::{EndpointFailure, ProbeError, ProbeFailure};

const USER_AGENT_VALUE: &str = concat!("netwatch/", env!("CARGO_PKG_VERSION"));

/// Checks whether a single endpoint is reachable.
pub trait EndpointProber: Send + Sync {
    /// Perform one bounded reachability check. No retries.
    fn probe(
        &self,
        endpoint: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), ProbeError>> + Send;
}

/// Probe `endpoints` in order and return the first one that answers.
///
/// Entries are trimmed and blank entries skipped. When nothing is left to
/// probe the pass fails immediately with [`ProbeFailure::NoEndpoints`]
/// without touching the network.
pub async fn check_connectivity<P, S>(
    prober: &P,
    endpoints: &[S],
    timeout: Duration,
) -> Result<String, ProbeFailure>
where
    P: EndpointProber,
    S: AsRef<str>,
{
    let mut failures = Vec::new();

    for endpoint in endpoints.iter().map(|e| e.as_ref().trim()) {
        if endpoint.is_empty() {
            continue;
        }

        match prober.probe(endpoint, timeout).await {
            Ok(()) => return Ok(endpoint.to_string()),
            Err(error) => {
                debug!(%endpoint, %error, "endpoint unreachable");
                failures.push(EndpointFailure {
                    endpoint: endpoint.to_string(),
                    error,
                });
            }
        }
    }

    if failures.is_empty() {
        Err(ProbeFailure::NoEndpoints)
    } else {
        Err(ProbeFailure::AllFailed(failures))
    }
}

/// HTTP(S) prober. `http://` endpoints use plain TCP, `https://` endpoints
/// are wrapped in rustls with the Mozilla root store.
#[derive(Clone)]
pub struct HttpProber {
    tls: Arc<rustls::ClientConfig>,
}

impl HttpProber {
    /// Create a prober trusting the bundled webpki roots.
    pub fn new() -> Result<Self, ProbeError> {
        let mut roots = rustls::RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config = rustls::ClientConfig::builder_with_provider(
            rustls::crypto::ring::default_provider().into(),
        )
        .with_safe_default_protocol_versions()
        .map_err(|e| ProbeError::Tls(format!("protocol version error: {e}")))?
        .with_root_certificates(roots)
        .with_no_client_auth();

        Ok(Self::with_tls_config(Arc::new(config)))
    }

    /// Create a prober from a pre-built rustls client configuration.
    pub fn with_tls_config(tls: Arc<rustls::ClientConfig>) -> Self {
        Self { tls }
    }

    async fn get(&self, endpoint: &str) -> Result<(), ProbeError> {
        let uri: Uri = endpoint
            .parse()
            .map_err(|e| ProbeError::InvalidUrl(format!("{endpoint}: {e}")))?;

        let secure = match uri.scheme_str() {
            Some("https") => true,
            Some("http") => false,
            Some(other) => return Err(ProbeError::UnsupportedScheme(other.to_string())),
            None => return Err(ProbeError::InvalidUrl(format!("{endpoint}: missing scheme"))),
        };

        let (Some(host), Some(authority)) = (uri.host(), uri.authority()) else {
            return Err(ProbeError::InvalidUrl(format!("{endpoint}: missing host")));
        };
        // IPv6 literals arrive bracketed.
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let port = uri.port_u16().unwrap_or(if secure { 443 } else { 80 });
        let path = uri.path_and_query().map_or("/", |p| p.as_str());

        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| ProbeError::Connect(e.to_string()))?;

        if secure {
            let server_name = rustls::pki_types::ServerName::try_from(host.to_string())
                .map_err(|e| ProbeError::InvalidUrl(format!("{endpoint}: {e}")))?;
            let stream = tokio_rustls::TlsConnector::from(self.tls.clone())
                .connect(server_name, stream)
                .await
                .map_err(|e| ProbeError::Tls(e.to_string()))?;
            send_get(stream, authority.as_str(), path).await
        } else {
            send_get(stream, authority.as_str(), path).await
        }
    }
}

impl EndpointProber for HttpProber {
    async fn probe(&self, endpoint: &str, timeout: Duration) -> Result<(), ProbeError> {
        match tokio::time::timeout(timeout, self.get(endpoint)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout(timeout)),
        }
    }
}

/// Issue a `GET` over an established stream and wait for the response head.
async fn send_get<S>(stream: S, authority: &str, path: &str) -> Result<(), ProbeError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let io = TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(|e| ProbeError::Http(e.to_string()))?;

    // Drive the connection in the background.
    let driver = tokio::spawn(async move {
        let _ = conn.await;
    });

    let req = Request::builder()
        .method(Method::GET)
        .uri(path)
        .header(HOST, authority)
        .header(USER_AGENT, USER_AGENT_VALUE)
        .body(Empty::<Bytes>::new())
        .map_err(|e| ProbeError::Http(e.to_string()))?;

    let result = sender.send_request(req).await;
    driver.abort();

    match result {
        Ok(resp) => {
            debug!(status = %resp.status(), %authority, "probe response received");
            Ok(())
        }
        Err(e) => Err(ProbeError::Http(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Prober that answers from a fixed set of reachable endpoints and
    /// records every call.
    #[derive(Default)]
    struct FakeProber {
        reachable: HashSet<String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeProber {
        fn reaching(endpoints: &[&str]) -> Self {
            Self {
                reachable: endpoints.iter().map(|e| e.to_string()).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl EndpointProber for FakeProber {
        async fn probe(&self, endpoint: &str, _timeout: Duration) -> Result<(), ProbeError> {
            self.calls.lock().unwrap().push(endpoint.to_string());
            if self.reachable.contains(endpoint) {
                Ok(())
            } else {
                Err(ProbeError::Connect("refused".to_string()))
            }
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(30);

    #[tokio::test]
    async fn reachable_if_any_endpoint_answers() {
        let prober = FakeProber::reaching(&["b"]);

        let hit = check_connectivity(&prober, &["a", "b", "c"], TIMEOUT).await;
        assert_eq!(hit.unwrap(), "b");
        // Stops at the first success.
        assert_eq!(prober.calls(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn reachable_regardless_of_position() {
        for list in [["ok", "x", "y"], ["x", "ok", "y"], ["x", "y", "ok"]] {
            let prober = FakeProber::reaching(&["ok"]);
            assert!(check_connectivity(&prober, &list, TIMEOUT).await.is_ok());
        }
    }

    #[tokio::test]
    async fn unreachable_when_every_endpoint_fails() {
        let prober = FakeProber::reaching(&[]);

        let err = check_connectivity(&prober, &["a", "b"], TIMEOUT)
            .await
            .unwrap_err();

        let ProbeFailure::AllFailed(failures) = err else {
            panic!("expected AllFailed, got {err:?}");
        };
        let endpoints: Vec<_> = failures.iter().map(|f| f.endpoint.as_str()).collect();
        assert_eq!(endpoints, vec!["a", "b"]);
        assert_eq!(prober.calls().len(), 2);
    }

    #[tokio::test]
    async fn empty_list_fails_closed_without_probing() {
        let prober = FakeProber::reaching(&[""]);

        let empty: [&str; 0] = [];
        assert_eq!(
            check_connectivity(&prober, &empty, TIMEOUT).await,
            Err(ProbeFailure::NoEndpoints)
        );
        assert_eq!(
            check_connectivity(&prober, &["", "   ", "\t"], TIMEOUT).await,
            Err(ProbeFailure::NoEndpoints)
        );
        assert!(prober.calls().is_empty());
    }

    #[tokio::test]
    async fn endpoints_are_trimmed_before_use() {
        let prober = FakeProber::reaching(&["https://b.example"]);

        let hit = check_connectivity(
            &prober,
            &["https://a.example/invalid", "    https://b.example  "],
            TIMEOUT,
        )
        .await;
        assert_eq!(hit.unwrap(), "https://b.example");
        assert_eq!(
            prober.calls(),
            vec!["https://a.example/invalid", "https://b.example"]
        );
    }

    /// Serve one canned HTTP response per connection.
    async fn serve(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let _ = socket.read(&mut buf).await;
                    let resp = format!("{status_line}\r\ncontent-length: 0\r\n\r\n");
                    let _ = socket.write_all(resp.as_bytes()).await;
                });
            }
        });
        format!("http://{addr}")
    }

    fn prober() -> HttpProber {
        HttpProber::new().unwrap()
    }

    #[tokio::test]
    async fn http_probe_ok_response() {
        let url = serve("HTTP/1.1 200 OK").await;
        assert_eq!(prober().probe(&url, Duration::from_secs(5)).await, Ok(()));
    }

    #[tokio::test]
    async fn http_probe_treats_error_status_as_reachable() {
        let url = serve("HTTP/1.1 404 Not Found").await;
        let url = format!("{url}/invalid");
        assert_eq!(prober().probe(&url, Duration::from_secs(5)).await, Ok(()));
    }

    #[tokio::test]
    async fn http_probe_closed_port_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = prober()
            .probe(&format!("http://{addr}"), Duration::from_secs(5))
            .await;
        assert!(matches!(result, Err(ProbeError::Connect(_))), "{result:?}");
    }

    #[tokio::test]
    async fn http_probe_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let timeout = Duration::from_millis(200);
        let result = prober().probe(&format!("http://{addr}"), timeout).await;
        assert_eq!(result, Err(ProbeError::Timeout(timeout)));
    }

    #[tokio::test]
    async fn malformed_urls_fail_per_endpoint() {
        let p = prober();
        let t = Duration::from_secs(1);

        assert!(matches!(
            p.probe("not a url", t).await,
            Err(ProbeError::InvalidUrl(_))
        ));
        assert!(matches!(
            p.probe("www.example.com", t).await,
            Err(ProbeError::InvalidUrl(_))
        ));
        assert!(matches!(
            p.probe("ftp://example.com/", t).await,
            Err(ProbeError::UnsupportedScheme(s)) if s == "ftp"
        ));
    }

    #[tokio::test]
    async fn malformed_entry_falls_through_to_next_endpoint() {
        let url = serve("HTTP/1.1 204 No Content").await;
        let endpoints = vec!["::bad::".to_string(), format!("  {url}  ")];

        let hit = check_connectivity(&prober(), &endpoints, Duration::from_secs(5)).await;
        assert_eq!(hit.unwrap(), url);
    }
}
