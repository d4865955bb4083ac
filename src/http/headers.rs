use crate::error::Error;

/// An ordered, case-insensitive header multimap.
///
/// Names keep the spelling of their first insertion. Each name maps to the
/// sequence of values in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    /// An empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every value of `name` with `value`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(idx) => self.entries[idx].1 = vec![value],
            None => self.entries.push((name, vec![value])),
        }
    }

    /// Adds `value` after any existing values of `name`.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(idx) => self.entries[idx].1.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    /// Removes `name`, returning its values.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.position(name).map(|idx| self.entries.remove(idx).1)
    }

    /// The first value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    /// Every value of `name`, empty when absent.
    pub fn get_all(&self, name: &str) -> &[String] {
        match self.position(name) {
            Some(idx) => &self.entries[idx].1,
            None => &[],
        }
    }

    /// Whether `name` has at least one value.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no header is set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates names with all of their values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(name))
    }
}

/// Rejects names and values that would break the request head.
pub(crate) fn validate(name: &str, value: &str) -> Result<(), Error> {
    let name_ok = !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_graphic()
                && !matches!(b, b':' | b'(' | b')' | b'"' | b'/' | b'[' | b']' | b'{' | b'}')
        });
    let value_ok = !value.bytes().any(|b| b == b'\r' || b == b'\n' || b == 0);

    if name_ok && value_ok {
        Ok(())
    } else {
        Err(Error::InvalidHeader(name.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_case_insensitively() {
        let mut headers = Headers::new();
        headers.set("Accept", "text/plain");
        headers.set("accept", "application/json");

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("ACCEPT"), Some("application/json"));
        assert_eq!(headers.iter().next().map(|(name, _)| name), Some("Accept"));
    }

    #[test]
    fn append_keeps_arrival_order() {
        let mut headers = Headers::new();
        headers.append("Set-Cookie", "a=1");
        headers.append("X-Other", "x");
        headers.append("set-cookie", "b=2");

        assert_eq!(headers.get_all("Set-Cookie"), ["a=1", "b=2"]);
        assert_eq!(headers.remove("SET-COOKIE").map(|v| v.len()), Some(2));
        assert!(!headers.contains("Set-Cookie"));
        assert!(headers.get_all("Set-Cookie").is_empty());
    }

    #[test]
    fn validate_rejects_header_injection() {
        assert!(validate("X-Token", "abc").is_ok());
        assert!(validate("X-Token", "abc\r\nHost: evil").is_err());
        assert!(validate("Bad Name", "v").is_err());
        assert!(validate("", "v").is_err());
    }
}
