//! Blocking HTTP seam shared by the storefront and catalog clients.

use std::time::Duration;

/// Outcome of a request that reached the server or failed in transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpFailure {
    /// Server answered with a non-2xx status.
    Status(u16, String),
    /// Connection, TLS, timeout, or body read failure.
    Transport(String),
}

impl std::fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(code, body) if body.is_empty() => write!(f, "HTTP status {code}"),
            Self::Status(code, body) => write!(f, "HTTP status {code}: {body}"),
            Self::Transport(message) => write!(f, "transport error: {message}"),
        }
    }
}

/// Minimal request surface the remote clients need.
pub trait HttpTransport {
    /// GETs `url` with the given query parameters and returns the body text.
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<String, HttpFailure>;

    /// POSTs a plain-text body with extra headers and returns the body text.
    fn post_text(
        &self,
        url: &str,
        query: &[(&str, &str)],
        headers: &[(&str, &str)],
        body: &str,
    ) -> Result<String, HttpFailure>;
}

/// Maximum characters of an error response body kept for log lines.
const ERROR_BODY_PREVIEW_CHARS: usize = 200;

/// `ureq`-backed transport used outside tests.
pub struct UreqTransport {
    http_client: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(15))
            .timeout_write(Duration::from_secs(15))
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build();
        Self { http_client }
    }

    fn finish(result: Result<ureq::Response, ureq::Error>) -> Result<String, HttpFailure> {
        match result {
            Ok(response) => response
                .into_string()
                .map_err(|err| HttpFailure::Transport(format!("Failed to read response: {err}"))),
            Err(ureq::Error::Status(code, response)) => {
                let body: String = response
                    .into_string()
                    .unwrap_or_default()
                    .chars()
                    .take(ERROR_BODY_PREVIEW_CHARS)
                    .collect();
                Err(HttpFailure::Status(code, body))
            }
            Err(ureq::Error::Transport(transport)) => {
                Err(HttpFailure::Transport(transport.to_string()))
            }
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport for UreqTransport {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<String, HttpFailure> {
        let mut request = self.http_client.get(url).set("Accept", "application/json");
        for (key, value) in query {
            request = request.query(key, value);
        }
        Self::finish(request.call())
    }

    fn post_text(
        &self,
        url: &str,
        query: &[(&str, &str)],
        headers: &[(&str, &str)],
        body: &str,
    ) -> Result<String, HttpFailure> {
        let mut request = self.http_client.post(url).set("Accept", "application/json");
        for (key, value) in query {
            request = request.query(key, value);
        }
        for (name, value) in headers {
            request = request.set(name, value);
        }
        Self::finish(request.send_string(body))
    }
}

#[cfg(test)]
pub mod testing {
    //! Scripted transport for client tests.

    use super::{HttpFailure, HttpTransport};
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// One recorded request.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RecordedRequest {
        pub method: &'static str,
        pub url: String,
        pub query: Vec<(String, String)>,
        pub headers: Vec<(String, String)>,
        pub body: String,
    }

    type Responder = Box<dyn Fn(&RecordedRequest) -> Option<Result<String, HttpFailure>>>;

    /// Answers requests from a queue of per-URL scripted responses, falling
    /// back to responder closures.
    #[derive(Default)]
    pub struct ScriptedTransport {
        scripted: RefCell<Vec<(String, VecDeque<Result<String, HttpFailure>>)>>,
        responders: Vec<Responder>,
        pub requests: RefCell<Vec<RecordedRequest>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queues a response for the next request whose URL ends with `url_suffix`.
        pub fn push(&self, url_suffix: &str, response: Result<String, HttpFailure>) {
            let mut scripted = self.scripted.borrow_mut();
            if let Some((_, queue)) = scripted
                .iter_mut()
                .find(|(suffix, _)| suffix.as_str() == url_suffix)
            {
                queue.push_back(response);
                return;
            }
            scripted.push((url_suffix.to_string(), VecDeque::from([response])));
        }

        pub fn respond_with<F>(mut self, responder: F) -> Self
        where
            F: Fn(&RecordedRequest) -> Option<Result<String, HttpFailure>> + 'static,
        {
            self.responders.push(Box::new(responder));
            self
        }

        pub fn requests_to(&self, url_suffix: &str) -> Vec<RecordedRequest> {
            self.requests
                .borrow()
                .iter()
                .filter(|request| request.url.ends_with(url_suffix))
                .cloned()
                .collect()
        }

        fn answer(&self, request: RecordedRequest) -> Result<String, HttpFailure> {
            self.requests.borrow_mut().push(request.clone());
            {
                let mut scripted = self.scripted.borrow_mut();
                if let Some((_, queue)) = scripted
                    .iter_mut()
                    .find(|(suffix, queue)| {
                        request.url.ends_with(suffix.as_str()) && !queue.is_empty()
                    })
                {
                    if let Some(response) = queue.pop_front() {
                        return response;
                    }
                }
            }
            for responder in &self.responders {
                if let Some(response) = responder(&request) {
                    return response;
                }
            }
            Err(HttpFailure::Transport(format!(
                "no scripted response for {}",
                request.url
            )))
        }
    }

    fn owned_pairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    impl HttpTransport for ScriptedTransport {
        fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<String, HttpFailure> {
            self.answer(RecordedRequest {
                method: "GET",
                url: url.to_string(),
                query: owned_pairs(query),
                headers: Vec::new(),
                body: String::new(),
            })
        }

        fn post_text(
            &self,
            url: &str,
            query: &[(&str, &str)],
            headers: &[(&str, &str)],
            body: &str,
        ) -> Result<String, HttpFailure> {
            self.answer(RecordedRequest {
                method: "POST",
                url: url.to_string(),
                query: owned_pairs(query),
                headers: owned_pairs(headers),
                body: body.to_string(),
            })
        }
    }
}
