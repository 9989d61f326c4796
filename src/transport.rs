use reqwest::blocking::Client;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::Method;
use crate::error::BoxError;

#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one request and hands back status, headers and raw body.
///
/// Non-2xx statuses are not errors at this level; only failures to get a
/// response at all are.
pub trait Transport: Send + Sync {
    fn send(&self, method: Method, url: &str) -> Result<HttpResponse, BoxError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, method: Method, url: &str) -> Result<HttpResponse, BoxError> {
        (**self).send(method, url)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, method: Method, url: &str) -> Result<HttpResponse, BoxError> {
        (**self).send(method, url)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, method: Method, url: &str) -> Result<HttpResponse, BoxError> {
        (**self).send(method, url)
    }
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, BoxError> {
        let mut builder =
            Client::builder().user_agent(concat!("fantasy-data/", env!("CARGO_PKG_VERSION")));
        if let Some(seconds) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        let client = builder.build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, method: Method, url: &str) -> Result<HttpResponse, BoxError> {
        let req = match method {
            Method::Get => self.client.get(url),
        };
        let resp = req.header("Accept", "application/json").send()?;
        let status = resp.status().as_u16();

        let mut headers = BTreeMap::new();
        for (name, value) in resp.headers().iter() {
            let Ok(value) = value.to_str() else { continue };
            headers.insert(name.as_str().to_string(), value.to_string());
        }

        let body = resp.bytes()?.to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
