//! Case-insensitive, order-preserving header multimap.
//!
//! Used for both the request's own headers and, identically, for chunked
//! trailers (spec.md §4.3).

#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderEntry {
    name: String,
    lower: String,
    values: Vec<String>,
}

/// A case-insensitive multimap from header name to the ordered sequence of
/// values observed on the wire.
///
/// Original casing of the *first* occurrence of a name is preserved;
/// repeated occurrences append to that entry's value list rather than
/// creating a second entry. Iteration order equals insertion order of
/// distinct lowercase names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<HeaderEntry>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// The first value stored for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.find(name).and_then(|e| e.values.first()).map(String::as_str)
    }

    /// All values stored for `name`, in arrival order.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.find(name).map(|e| e.values.as_slice()).unwrap_or(&[])
    }

    /// Mutable reference to `name`'s value list, creating an empty entry
    /// (preserving `name`'s case) if one doesn't already exist. Lets a
    /// caller append a repeated header with a single name lookup instead
    /// of a lookup followed by a separate insert-or-append call.
    pub fn get_all_mut(&mut self, name: &str) -> &mut Vec<String> {
        let lower = name.to_ascii_lowercase();
        if self.find_mut_lower(&lower).is_none() {
            self.entries.push(HeaderEntry { name: name.to_string(), lower: lower.clone(), values: Vec::new() });
        }
        &mut self.find_mut_lower(&lower).expect("entry just inserted if missing").values
    }

    /// Insert `name` with `values`, replacing any existing entry.
    pub fn put(&mut self, name: impl Into<String>, values: Vec<String>) {
        let name = name.into();
        let lower = name.to_ascii_lowercase();
        match self.find_mut_lower(&lower) {
            Some(e) => {
                e.name = name;
                e.values = values;
            }
            None => self.entries.push(HeaderEntry { name, lower, values }),
        }
    }

    /// Replace all values for `name` with a single `value`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.put(name, vec![value.into()]);
    }

    /// Append `value` to `name`'s value list, creating the entry if absent.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let lower = name.to_ascii_lowercase();
        match self.find_mut_lower(&lower) {
            Some(e) => e.values.push(value.into()),
            None => self.entries.push(HeaderEntry { name, lower, values: vec![value.into()] }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|e| (e.name.as_str(), e.values.as_slice()))
    }

    /// Number of distinct (lowercase) header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, name: &str) -> Option<&HeaderEntry> {
        let lower = name.to_ascii_lowercase();
        self.entries.iter().find(|e| e.lower == lower)
    }

    fn find_mut_lower(&mut self, lower: &str) -> Option<&mut HeaderEntry> {
        self.entries.iter_mut().find(|e| e.lower == lower)
    }
}
