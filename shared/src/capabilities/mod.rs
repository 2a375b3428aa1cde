mod http;

pub use self::http::{
    HttpError, HttpHeaders, HttpMethod, HttpRequest, HttpResponse, HttpResult, ValidatedUrl,
    DEFAULT_TIMEOUT_MS, MAX_RESPONSE_BODY_SIZE, MAX_TIMEOUT_MS,
};

use async_trait::async_trait;

/// The shell-side half of the HTTP capability.
///
/// The core never opens sockets. Whatever hosts it (a browser `fetch`
/// bridge, a native client, a test double) executes the request and hands
/// back the raw response; status interpretation and decoding stay in the
/// core.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> HttpResult;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for std::sync::Arc<T> {
    async fn execute(&self, request: HttpRequest) -> HttpResult {
        (**self).execute(request).await
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Canned outcome for one request.
    #[derive(Debug, Clone)]
    pub enum Reply {
        Json(u16, serde_json::Value),
        Raw(u16, Vec<u8>),
        Status(u16),
        Fail(HttpError),
    }

    /// Scripted transport keyed by path-and-query.
    ///
    /// Each path holds a queue of replies; the last reply repeats once the
    /// queue drains. Every call yields to the scheduler before answering so
    /// overlapping operations actually interleave. A path with no script
    /// panics, which lets a test assert that no request was made.
    #[derive(Default)]
    pub struct MockTransport {
        routes: Mutex<HashMap<String, VecDeque<Reply>>>,
        log: Mutex<Vec<HttpRequest>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn on(self, path_and_query: &str, reply: Reply) -> Self {
            self.script(path_and_query, reply);
            self
        }

        pub fn script(&self, path_and_query: &str, reply: Reply) {
            self.routes
                .lock()
                .unwrap()
                .entry(path_and_query.to_string())
                .or_default()
                .push_back(reply);
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.log.lock().unwrap().clone()
        }

        pub fn calls_to(&self, path_and_query: &str) -> usize {
            self.log
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.url().path_and_query() == path_and_query)
                .count()
        }

        fn next_reply(&self, path: &str) -> Reply {
            let mut routes = self.routes.lock().unwrap();
            let queue = routes
                .get_mut(path)
                .unwrap_or_else(|| panic!("unexpected request to {path}"));
            if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue.front().cloned().unwrap()
            }
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn execute(&self, request: HttpRequest) -> HttpResult {
            let path = request.url().path_and_query();
            self.log.lock().unwrap().push(request.clone());
            let reply = self.next_reply(&path);

            tokio::task::yield_now().await;

            let request_id = request.request_id().to_string();
            match reply {
                Reply::Json(status, body) => Ok(HttpResponse::new(
                    status,
                    serde_json::to_vec(&body).unwrap(),
                    request_id,
                )),
                Reply::Raw(status, body) => Ok(HttpResponse::new(status, body, request_id)),
                Reply::Status(status) => Ok(HttpResponse::new(status, Vec::new(), request_id)),
                Reply::Fail(err) => Err(err),
            }
        }
    }
}
