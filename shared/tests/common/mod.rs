use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use trackfeel_shared::capabilities::{HttpRequest, HttpResponse, HttpResult};
use trackfeel_shared::HttpTransport;

/// Shell stand-in: answers by path-and-query from a table that tests can
/// rewrite between calls. A path mapped to `None` fails the test if hit.
#[derive(Default)]
pub struct ScriptedTransport {
    table: Mutex<HashMap<String, Option<(u16, Value)>>>,
    hits: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, path: &str, status: u16, body: Value) {
        self.table
            .lock()
            .unwrap()
            .insert(path.to_string(), Some((status, body)));
    }

    pub fn forbid(&self, path: &str) {
        self.table.lock().unwrap().insert(path.to_string(), None);
    }

    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> HttpResult {
        let path = request.url().path_and_query();
        self.hits.lock().unwrap().push(path.clone());

        let entry = self.table.lock().unwrap().get(&path).cloned();
        let (status, body) = match entry {
            Some(Some(reply)) => reply,
            Some(None) => panic!("request to {path} was not expected"),
            None => panic!("no scripted reply for {path}"),
        };

        tokio::task::yield_now().await;

        Ok(HttpResponse::new(
            status,
            serde_json::to_vec(&body).unwrap(),
            request.request_id().to_string(),
        ))
    }
}
