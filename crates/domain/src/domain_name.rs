use std::fmt;

/// A DNS name in canonical form: lowercase ASCII, always ending in `.`.
///
/// Every key into the pattern matcher, the cache, and the local-records
/// store uses this form. `Normalize` happens once, at the boundary where an
/// externally supplied string enters the engine (the wire parser, a config
/// file, an admin call); everything downstream assumes the input is already
/// normalized and does no further work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomainName(String);

impl DomainName {
    /// Lowercase ASCII, strip surrounding whitespace, append a trailing `.`
    /// if the caller omitted one. Idempotent: `normalize(normalize(s)) ==
    /// normalize(s)`.
    pub fn normalize(s: &str) -> Self {
        let trimmed = s.trim();
        let mut lower = trimmed.to_ascii_lowercase();
        if !lower.ends_with('.') {
            lower.push('.');
        }
        Self(lower)
    }

    /// Build from a string already known to be normalized (e.g. read back
    /// from a store that only ever holds normalized keys). Does not
    /// re-validate; use `normalize` for untrusted input.
    pub fn from_normalized(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name without its trailing dot, as used by `EvaluationContext`.
    pub fn without_trailing_dot(&self) -> &str {
        self.0.strip_suffix('.').unwrap_or(&self.0)
    }

    pub fn label_count(&self) -> usize {
        self.without_trailing_dot()
            .split('.')
            .filter(|l| !l.is_empty())
            .count()
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for DomainName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DomainName {
    fn from(s: &str) -> Self {
        Self::normalize(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_adds_trailing_dot() {
        assert_eq!(DomainName::normalize("Example.COM").as_str(), "example.com.");
        assert_eq!(DomainName::normalize("example.com.").as_str(), "example.com.");
    }

    #[test]
    fn normalize_trims_whitespace() {
        assert_eq!(DomainName::normalize("  example.com  ").as_str(), "example.com.");
    }

    #[test]
    fn normalize_is_idempotent() {
        for input in ["Example.com", "a.b.c.", "  X.Y.Z  "] {
            let once = DomainName::normalize(input);
            let twice = DomainName::normalize(once.as_str());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn without_trailing_dot_strips_single_dot() {
        assert_eq!(DomainName::normalize("example.com").without_trailing_dot(), "example.com");
    }

    #[test]
    fn label_count_counts_labels() {
        assert_eq!(DomainName::normalize("a.b.c").label_count(), 3);
        assert_eq!(DomainName::normalize("com").label_count(), 1);
    }
}
