use crate::domain_name::DomainName;

/// Which list a pattern set belongs to; the blocklist and the whitelist
/// share the same matcher/snapshot machinery (spec §4.10 step 6 evaluates
/// the whitelist with "the same §4.2" tiers the blocklist uses), so the
/// infrastructure layer parameterizes its store over this tag instead of
/// duplicating the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternSetKind {
    Block,
    Allow,
}

/// One entry in a pattern set. The compiled regex itself lives in
/// infrastructure (this crate has no regex dependency); here a regex entry
/// is represented by its source text only, for config/serialization
/// purposes and pattern classification at this layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternEntry {
    Exact(DomainName),
    /// Always starts with `*.`; the suffix after the prefix is stored
    /// normalized (lowercase, trailing dot).
    Wildcard(DomainName),
    Regex(String),
}

/// `*.suffix.` matches `domain` iff:
///  (a) domain ends with `.suffix.`,
///  (b) domain != suffix. (a wildcard never matches the bare suffix), and
///  (c) the label immediately before `.suffix.` contains no further dot.
///
/// Both `domain` and `pattern` must already be normalized (lowercase,
/// trailing-dot) DomainName text.
pub fn wildcard_matches(domain: &str, pattern: &str) -> bool {
    let Some(suffix) = pattern.strip_prefix("*.") else {
        return false;
    };
    if domain == suffix {
        return false;
    }
    // Match at a label boundary: domain must end with `.suffix`, and the
    // single label before that boundary must be the whole remaining
    // prefix (no further dots) — this is what keeps a wildcard from
    // matching both grandchildren ("x.ads.example.com.") and accidental
    // substring neighbors ("badexample.com." vs "*.example.com.").
    let dotted_suffix = format!(".{suffix}");
    let Some(prefix) = domain.strip_suffix(&dotted_suffix) else {
        return false;
    };
    !prefix.is_empty() && !prefix.contains('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matches_direct_subdomain() {
        assert!(wildcard_matches("ads.example.com.", "*.example.com."));
    }

    #[test]
    fn wildcard_does_not_match_bare_suffix() {
        assert!(!wildcard_matches("example.com.", "*.example.com."));
    }

    #[test]
    fn wildcard_does_not_match_grandchild() {
        assert!(!wildcard_matches("x.ads.example.com.", "*.example.com."));
    }

    #[test]
    fn wildcard_does_not_match_unrelated_domain() {
        assert!(!wildcard_matches("example.net.", "*.example.com."));
    }

    #[test]
    fn wildcard_requires_wildcard_prefix() {
        assert!(!wildcard_matches("ads.example.com.", "example.com."));
    }

    #[test]
    fn wildcard_does_not_match_suffix_without_label_boundary() {
        assert!(!wildcard_matches("badexample.com.", "*.example.com."));
    }
}
