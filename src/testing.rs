//! In-memory transport recording every request, for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};

use crate::connect::Delay;
use crate::errors::{Error, Method};
use crate::runtime::BoxFuture;
use crate::transport::{Request, Transport};

type Result<T> = std::result::Result<T, Error>;

/// Answers requests from canned responses keyed by method and URL.
///
/// Each route holds a queue of answers; the last one keeps being replayed once
/// the others are used up. Requests without a route fail at the transport.
#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    routes: Arc<Mutex<HashMap<(Method, String), Vec<Result<Value>>>>>,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: Method, url: &str, answer: Result<Value>) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, url.to_string()))
            .or_default()
            .push(answer);
    }

    pub fn on_get(&self, url: &str, answer: Value) {
        self.respond(Method::Get, url, Ok(answer));
    }

    pub fn on_put(&self, url: &str, answer: Value) {
        self.respond(Method::Put, url, Ok(answer));
    }

    pub fn on_post(&self, url: &str, answer: Value) {
        self.respond(Method::Post, url, Ok(answer));
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }

    pub fn count_get(&self, url: &str) -> usize {
        self.count(Method::Get, url)
    }

    pub fn count_put(&self, url: &str) -> usize {
        self.count(Method::Put, url)
    }

    pub fn count_post(&self, url: &str) -> usize {
        self.count(Method::Post, url)
    }

    fn answer(&self, request: &Request) -> Result<Value> {
        let mut routes = self.routes.lock().unwrap();
        let key = (request.method, request.url.clone());
        match routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.remove(0),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Err(Error::transport(request.method, &request.url, "no route")),
        }
    }
}

impl Transport for MockTransport {
    fn request(&self, request: Request) -> BoxFuture<'_, Result<Value>> {
        self.requests.lock().unwrap().push(request.clone());
        let answer = self.answer(&request);
        Box::pin(async move {
            // Let concurrent callers interleave like real round trips would.
            tokio::task::yield_now().await;
            answer
        })
    }
}

/// Delay that returns at once and remembers every requested pause.
pub(crate) fn recording_delay() -> (Delay, Arc<Mutex<Vec<Duration>>>) {
    let pauses = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&pauses);
    let delay: Delay = Arc::new(move |duration| {
        recorded.lock().unwrap().push(duration);
        Box::pin(async {})
    });
    (delay, pauses)
}

/// Twelve lights as a bridge with a mixed install reports them.
pub(crate) fn lights_fixture() -> Value {
    let names = [
        "Bedside Table",
        "Bookcase",
        "Hallway 1",
        "Bedroom Dresser R",
        "Kitchen Table",
        "Hallway 2",
        "Bedroom Dresser L",
        "LightStrips 1",
        "Zombie",
        "Kitchen RF",
        "Kitchen RN",
        "Hallway 3",
    ];

    let lights = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let id = i as u32 + 1;
            let strip = *name == "LightStrips 1";
            let light = json!({
                "state": {
                    "on": *name != "Bedroom Dresser R",
                    "bri": if id == 10 { 254 } else { 144 },
                    "hue": 13088,
                    "sat": 212,
                    "xy": [0.5128, 0.4147],
                    "ct": 467,
                    "alert": "none",
                    "effect": "none",
                    "colormode": "xy",
                    "reachable": id != 9
                },
                "type": "Extended color light",
                "name": name,
                "modelid": if strip { "LST001" } else { "LCT001" },
                "swversion": "66009461",
                "uniqueid": format!("00:17:88:01:00:d4:12:{id:02x}-0b"),
                "pointsymbol": {}
            });
            (id.to_string(), light)
        })
        .collect::<serde_json::Map<String, Value>>();

    Value::Object(lights)
}
