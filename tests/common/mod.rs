#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use contentful_blog::config::{Config, FetchSettings};
use contentful_blog::coordinator::FetchCoordinator;
use contentful_blog::error::Result;
use contentful_blog::transport::Transport;
use serde_json::{json, Value};
use tokio::time::Instant;

pub const COLLECTION: &str = "lessonCollection";

#[derive(Clone, Debug)]
pub struct Call {
    pub query: String,
    pub preview: bool,
    pub at: Instant,
}

type Responder = Box<dyn Fn(&str) -> Result<Value> + Send + Sync>;

/// Transport double: replays scripted outcomes in order, then falls back to
/// a responder keyed on the query text.
pub struct FakeTransport {
    latency: Duration,
    script: Mutex<VecDeque<Result<Value>>>,
    responder: Responder,
    calls: Mutex<Vec<Call>>,
}

impl FakeTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Result<Value> + Send + Sync + 'static,
    {
        FakeTransport {
            latency: Duration::ZERO,
            script: Mutex::new(VecDeque::new()),
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(body: Value) -> Self {
        Self::new(move |_| Ok(body.clone()))
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_script(self, outcomes: Vec<Result<Value>>) -> Self {
        *self.script.lock().unwrap() = outcomes.into();
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(&self, query: &str, preview: bool) -> Result<Value> {
        self.calls.lock().unwrap().push(Call {
            query: query.to_string(),
            preview,
            at: Instant::now(),
        });
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let scripted = self.script.lock().unwrap().pop_front();
        match scripted {
            Some(outcome) => outcome,
            None => (self.responder)(query),
        }
    }
}

pub fn coordinator(transport: &Arc<FakeTransport>) -> FetchCoordinator {
    FetchCoordinator::new(transport.clone(), &FetchSettings::default())
}

pub fn test_config() -> Config {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("CONTENTFUL_SPACE_ID", "space"),
        ("CONTENTFUL_ACCESS_TOKEN", "live-token"),
        ("CONTENTFUL_PREVIEW_ACCESS_TOKEN", "draft-token"),
        ("CONTENTFUL_REVALIDATE_SECRET", "s3cret"),
    ]);
    Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap()
}

pub fn post(slug: &str) -> Value {
    json!({
        "slug": slug,
        "title": format!("Title of {}", slug),
        "coverImage": { "url": format!("https://images.ctfassets.net/{}.png", slug) },
        "date": "2024-03-01T00:00:00.000Z",
        "author": "Ada",
        "excerpt": "An excerpt",
        "content": { "json": { "nodeType": "document", "content": [] } }
    })
}

pub fn envelope(items: Vec<Value>) -> Value {
    json!({ "data": { COLLECTION: { "items": items } } })
}
