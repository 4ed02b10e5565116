//! Session model and the in-memory store backing issued session cookies.

use std::collections::HashMap;

use parking_lot::Mutex;
use uuid::Uuid;

/// Multi-valued attributes asserted by the CAS server about a principal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(HashMap<String, Vec<String>>);

impl Attributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value to the named attribute.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.entry(name.into()).or_default().push(value.into());
    }

    /// All values of the named attribute; empty when absent.
    #[must_use]
    pub fn get(&self, name: &str) -> &[String] {
        self.0.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// First value of the named attribute.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name).first().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<HashMap<String, Vec<String>>> for Attributes {
    fn from(map: HashMap<String, Vec<String>>) -> Self {
        Self(map)
    }
}

/// An authenticated CAS principal, attached to requests as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasSession {
    pub username: String,
    pub attributes: Attributes,
}

/// Sessions keyed by the opaque cookie value handed to the browser.
#[derive(Debug, Default)]
pub(crate) struct SessionStore {
    sessions: Mutex<HashMap<String, CasSession>>,
}

impl SessionStore {
    /// Stores a session and returns its new cookie value.
    pub fn insert(&self, session: CasSession) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions.lock().insert(id.clone(), session);
        id
    }

    pub fn get(&self, id: &str) -> Option<CasSession> {
        self.sessions.lock().get(id).cloned()
    }
}
