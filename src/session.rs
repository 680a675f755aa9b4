use std::collections::HashMap;

/// The state belonging to a single user's session.
///
/// This is kept in memory and handed to whoever needs it, so independent
/// sessions never see each other's history or half-typed input.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Session {
    history: Vec<String>,
    drafts: HashMap<String, String>,
}

impl Session {
    pub fn new() -> Self { Session::default() }

    /// Remember a submitted problem (or its outcome).
    pub fn record<S: Into<String>>(&mut self, entry: S) {
        self.history.push(entry.into());
    }

    /// Everything recorded so far, oldest first.
    pub fn history(&self) -> &[String] { &self.history }

    pub fn clear_history(&mut self) { self.history.clear(); }

    pub fn set_draft<K, V>(&mut self, field: K, text: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.drafts.insert(field.into(), text.into());
    }

    pub fn draft(&self, field: &str) -> Option<&str> {
        self.drafts.get(field).map(String::as_str)
    }

    /// Append to a field's draft, starting a new one if necessary (e.g. a
    /// button on the math keyboard inserting `√`).
    pub fn append_to_draft(&mut self, field: &str, text: &str) -> &str {
        let draft = self.drafts.entry(field.to_string()).or_default();
        draft.push_str(text);
        draft
    }

    /// Remove a field's draft, typically when it gets submitted.
    pub fn take_draft(&mut self, field: &str) -> Option<String> {
        self.drafts.remove(field)
    }
}
