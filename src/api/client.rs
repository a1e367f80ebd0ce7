use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::debug;

use crate::api::writes::{RecordWriter, WriteError, WriteMethod};
use crate::config::Config;
use crate::models::Envelope;
use crate::source::{FetchError, RecordFetcher};

/// HTTP client for the procurement API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent(config.http.user_agent.as_str())
            .timeout(config.http_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// GET an endpoint and decode its envelope
    pub async fn get_envelope(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<Envelope<Value>, FetchError> {
        let url = self.url(endpoint);
        debug!("GET {}", url);

        let response = self.http.get(&url).query(params).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        // error statuses still carry an envelope when the server is ours
        match serde_json::from_slice::<Envelope<Value>>(&body) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => Err(FetchError::Status {
                status_code: status.as_u16(),
            }),
            Err(source) => Err(FetchError::Decode {
                endpoint: endpoint.to_string(),
                source,
            }),
        }
    }
}

#[async_trait]
impl RecordFetcher for ApiClient {
    async fn fetch_data(&self, endpoint: &str, params: &[(String, String)]) -> Result<Value, FetchError> {
        let envelope = self.get_envelope(endpoint, params).await?;
        envelope
            .into_data()
            .map_err(|message| FetchError::Unsuccessful { message })
    }
}

#[async_trait]
impl RecordWriter for ApiClient {
    async fn send(&self, method: WriteMethod, endpoint: &str, body: Option<Value>) -> Result<Value, WriteError> {
        let url = self.url(endpoint);
        let method = match method {
            WriteMethod::Create => Method::POST,
            WriteMethod::Update => Method::PUT,
            WriteMethod::Toggle => Method::PATCH,
            WriteMethod::Delete => Method::DELETE,
        };
        debug!("{} {}", method, url);

        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        let envelope: Envelope<Value> = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(WriteError::Rejected {
                    message: Some(format!("HTTP {}", status.as_u16())),
                })
            }
            Err(source) => return Err(WriteError::Decode(source)),
        };

        if envelope.success {
            Ok(envelope.data.unwrap_or(Value::Null))
        } else {
            Err(WriteError::Rejected {
                message: envelope.message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a loopback port and return the base URL
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        format!("http://{}/api", addr)
    }

    fn client(base_url: &str) -> ApiClient {
        let config = Config::default().with_api_url(base_url);
        ApiClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_data_returns_envelope_payload() {
        let url = serve_once("200 OK", r#"{"success": true, "data": [{"id": "1", "name": "A"}]}"#).await;

        let data = client(&url).fetch_data("facilities", &[]).await.unwrap();
        assert_eq!(data[0]["name"], "A");
    }

    #[tokio::test]
    async fn test_fetch_data_unsuccessful_envelope() {
        let url = serve_once("200 OK", r#"{"success": false, "message": "not allowed"}"#).await;

        let err = client(&url).fetch_data("facilities", &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::Unsuccessful { message: Some(ref m) } if m == "not allowed"));
    }

    #[tokio::test]
    async fn test_fetch_data_error_status_without_envelope() {
        let url = serve_once("500 Internal Server Error", "oops").await;

        let err = client(&url).fetch_data("facilities", &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status_code: 500 }));
    }

    #[tokio::test]
    async fn test_write_rejected_by_server() {
        let url = serve_once("200 OK", r#"{"success": false, "message": "duplicate code"}"#).await;

        let err = client(&url)
            .send(WriteMethod::Create, "facilities", Some(serde_json::json!({"name": "A"})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Server rejected the request: duplicate code");
    }

    #[test]
    fn test_url_joining() {
        let client = client("http://localhost:3000/api/");
        assert_eq!(client.url("/facilities"), "http://localhost:3000/api/facilities");
        assert_eq!(client.url("facilities/stats"), "http://localhost:3000/api/facilities/stats");
    }
}
