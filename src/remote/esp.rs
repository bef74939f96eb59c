//! HTTP transport over the ESP-IDF TLS-capable client.
//!
//! One connection per request, bounded by [`REMOTE_TIMEOUT_MS`]. The
//! `apikey` / bearer header pair is attached to every request.

use std::time::Duration;

use embedded_svc::http::client::Client as HttpClient;
use embedded_svc::http::Method;
use embedded_svc::io::Read;
use esp_idf_svc::http::client::{Configuration as HttpConfiguration, EspHttpConnection};
use log::debug;

use crate::config::REMOTE_TIMEOUT_MS;
use crate::error::TransportError;
use crate::remote::HttpTransport;

/// Largest response body we accept.
const MAX_BODY_BYTES: usize = 8192;

pub struct EspTransport {
    base_url: String,
    api_key: String,
    bearer: String,
}

impl EspTransport {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
            bearer: format!("Bearer {api_key}"),
        }
    }

    fn request(
        &mut self,
        method: Method,
        path_and_query: &str,
        body: Option<&str>,
    ) -> Result<(u16, String), TransportError> {
        let connection = EspHttpConnection::new(&HttpConfiguration {
            timeout: Some(Duration::from_millis(u64::from(REMOTE_TIMEOUT_MS))),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        })
        .map_err(|_| TransportError::Connect)?;
        let mut client = HttpClient::wrap(connection);

        let url = format!("{}{}", self.base_url, path_and_query);
        let headers = [
            ("apikey", self.api_key.as_str()),
            ("Authorization", self.bearer.as_str()),
            ("Content-Type", "application/json"),
        ];

        let mut request = client
            .request(method, &url, &headers)
            .map_err(|_| TransportError::Connect)?;
        if let Some(body) = body {
            use embedded_svc::io::Write as _;
            request
                .write_all(body.as_bytes())
                .map_err(|_| TransportError::Connect)?;
        }

        let mut response = request.submit().map_err(|_| TransportError::Timeout)?;
        let status = response.status();

        let mut raw = Vec::new();
        let mut chunk = [0u8; 512];
        loop {
            let read = response
                .read(&mut chunk)
                .map_err(|_| TransportError::Connect)?;
            if read == 0 || raw.len() + read > MAX_BODY_BYTES {
                break;
            }
            raw.extend_from_slice(&chunk[..read]);
        }

        debug!("{method:?} {path_and_query}: {status} ({} bytes)", raw.len());
        Ok((status, String::from_utf8_lossy(&raw).into_owned()))
    }
}

impl HttpTransport for EspTransport {
    fn get(&mut self, path_and_query: &str) -> Result<(u16, String), TransportError> {
        self.request(Method::Get, path_and_query, None)
    }

    fn post_json(&mut self, path: &str, body: &str) -> Result<(u16, String), TransportError> {
        self.request(Method::Post, path, Some(body))
    }
}
