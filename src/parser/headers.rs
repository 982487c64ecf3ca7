//! Request header storage.

use std::collections::BTreeMap;

use crate::parser::method::is_token_byte;

/// Canonical form of a header name: the first letter and every letter
/// following a hyphen are upper-cased, all other letters lower-cased
/// (`content-type` becomes `Content-Type`).
///
/// Names containing bytes that are not valid in a header token are returned
/// unchanged.
pub fn canonical_header_name(name: &str) -> String {
    if name.is_empty() || !name.bytes().all(is_token_byte) {
        return name.to_string();
    }

    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

/// The headers of a request, in arrival order.
///
/// A name may occur several times; every occurrence is kept. Names are
/// stored in canonical form, so `x-test` and `X-TEST` are the same header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Create an empty header list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header, keeping any earlier values for the same name.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.entries.push((canonical_header_name(name), value.into()));
    }

    /// Remove every value for `name`, returning the first one if any.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let name = canonical_header_name(name);
        let mut first = None;
        self.entries.retain(|(k, v)| {
            if *k != name {
                return true;
            }
            if first.is_none() {
                first = Some(v.clone());
            }
            false
        });
        first
    }

    /// The first value received for `name` (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).next()
    }

    /// Every value received for `name` (case-insensitive), in arrival order.
    pub fn get_all<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        let name = canonical_header_name(name);
        self.entries
            .iter()
            .filter(move |(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Check if a header exists (case-insensitive).
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate over all `(name, value)` pairs in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of header lines, counting repeated names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no header lines were received.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Collapse the headers to one value per name.
    ///
    /// The first value received for a name wins and later ones are dropped.
    /// This is lossy on purpose: callers that need every value should use
    /// [`Headers::get_all`].
    pub fn first_values(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        for (name, value) in &self.entries {
            map.entry(name.clone()).or_insert_with(|| value.clone());
        }
        map
    }
}

impl<N: AsRef<str>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(name.as_ref(), value);
        }
        headers
    }
}
