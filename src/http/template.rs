use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use http::{HeaderMap, Method};
use url::Url;

/// One immutable request replayed by the workers.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    pub name: Option<String>,
    pub tags: Vec<String>,
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RequestTemplate {
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            name: None,
            tags: Vec::new(),
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Build an `http::Request` carrying a copy of the template body.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL or headers do not form a valid request.
    pub fn to_request<B>(&self, body: B) -> Result<http::Request<B>, http::Error> {
        let mut builder = http::Request::builder()
            .method(self.method.clone())
            .uri(self.url.as_str());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(self.headers.clone());
        }
        builder.body(body)
    }
}

/// Read-only template sequence with lock-free round-robin selection.
#[derive(Debug)]
pub struct RequestPool {
    templates: Arc<[RequestTemplate]>,
    cursor: AtomicUsize,
}

impl RequestPool {
    /// Returns `None` for an empty template list.
    #[must_use]
    pub fn new(templates: Vec<RequestTemplate>) -> Option<Self> {
        if templates.is_empty() {
            return None;
        }
        Some(Self {
            templates: templates.into(),
            cursor: AtomicUsize::new(0),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    #[must_use]
    pub fn templates(&self) -> &[RequestTemplate] {
        &self.templates
    }

    pub fn next_template(&self) -> Option<&RequestTemplate> {
        let idx = self
            .cursor
            .fetch_add(1, Ordering::Relaxed)
            .checked_rem(self.templates.len())
            .unwrap_or(0);
        self.templates.get(idx)
    }
}
