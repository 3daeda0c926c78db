//! In-memory transport for tests.
//!
//! Records every call as `"METHOD url"` and answers from a script,
//! falling back to "not found" for GET and "ok" for everything else.

use crate::error::Result;
use crate::transport::{Response, Transport};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

#[derive(Default)]
pub(crate) struct FakeTransport {
    calls: RefCell<Vec<String>>,
    bodies: RefCell<Vec<(String, Option<String>)>>,
    script: RefCell<HashMap<String, VecDeque<Response>>>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queues a response for the next matching call.
    pub(crate) fn respond(self, call: &str, status: u16, body: &str) -> Self {
        self.script
            .borrow_mut()
            .entry(call.to_string())
            .or_default()
            .push_back(Response::new(status, body));
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Body sent with the most recent matching call.
    pub(crate) fn body_of(&self, call: &str) -> Option<String> {
        self.bodies
            .borrow()
            .iter()
            .rev()
            .find(|(c, _)| c == call)
            .and_then(|(_, body)| body.clone())
    }

    fn answer(&self, method: &str, url: &str, body: Option<String>) -> Result<Response> {
        let call = format!("{} {}", method, url);
        self.calls.borrow_mut().push(call.clone());
        self.bodies.borrow_mut().push((call.clone(), body));

        let scripted = self
            .script
            .borrow_mut()
            .get_mut(&call)
            .and_then(VecDeque::pop_front);
        Ok(scripted.unwrap_or_else(|| match method {
            "GET" => Response::new(404, r#"{"error":"not_found"}"#),
            _ => Response::new(201, r#"{"ok":true}"#),
        }))
    }
}

impl Transport for FakeTransport {
    fn get(&self, url: &str) -> Result<Response> {
        self.answer("GET", url, None)
    }

    fn put(&self, url: &str, body: Option<String>) -> Result<Response> {
        self.answer("PUT", url, body)
    }

    fn delete(&self, url: &str) -> Result<Response> {
        self.answer("DELETE", url, None)
    }
}
