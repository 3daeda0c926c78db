//! HTTP transport.
//!
//! The store only ever needs three verbs and the raw status + body of the
//! answer, so that's all the Transport trait exposes. The real one is a
//! blocking reqwest client; tests swap in a recording fake.

use crate::config::StoreConfig;
use crate::error::Result;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

/// Status and body of a store response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// True for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The minimal HTTP surface the store client needs.
pub trait Transport {
    /// `GET url`.
    fn get(&self, url: &str) -> Result<Response>;

    /// `PUT url`, with a JSON body when one is given.
    fn put(&self, url: &str, body: Option<String>) -> Result<Response>;

    /// `DELETE url`.
    fn delete(&self, url: &str) -> Result<Response>;
}

/// Transport backed by a blocking reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { client })
    }
}

fn into_response(response: reqwest::blocking::Response) -> Result<Response> {
    let status = response.status().as_u16();
    let body = response.text()?;
    Ok(Response { status, body })
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<Response> {
        debug!("GET {}", url);
        into_response(self.client.get(url).send()?)
    }

    fn put(&self, url: &str, body: Option<String>) -> Result<Response> {
        debug!("PUT {}", url);
        let mut request = self.client.put(url);
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }
        into_response(request.send()?)
    }

    fn delete(&self, url: &str) -> Result<Response> {
        debug!("DELETE {}", url);
        into_response(self.client.delete(url).send()?)
    }
}
