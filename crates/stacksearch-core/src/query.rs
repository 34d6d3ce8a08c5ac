/// A search box entry split into its parts
///
/// `python list #beginner // comprehension` becomes terms `python list`,
/// tags `beginner`, and the local clause `comprehension`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    /// Free-text words sent as `q`
    pub terms: Vec<String>,
    /// `#tag` words, without the `#`, sent as `tagged`
    pub tags: Vec<String>,
    /// Everything after `//`, matched against fetched titles only
    pub local: String,
}

impl ParsedQuery {
    /// Terms as a single `q` value
    pub fn query(&self) -> String {
        self.terms.join(" ")
    }

    /// Nothing to send to the API
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.tags.is_empty()
    }
}

const LOCAL_SEPARATOR: &str = "//";

pub fn parse_search_query(input: &str) -> ParsedQuery {
    let input = input.trim();

    let (remote, local) = match input.split_once(LOCAL_SEPARATOR) {
        Some((remote, local)) => (remote, local.trim()),
        // A lone trailing slash is half of a `//` still being typed
        None => (input.strip_suffix('/').unwrap_or(input), ""),
    };

    let mut terms = Vec::new();
    let mut tags = Vec::new();
    for word in remote.split_whitespace() {
        match word.strip_prefix('#') {
            Some("") => {}
            Some(tag) => tags.push(tag.to_string()),
            None => terms.push(word.to_string()),
        }
    }

    ParsedQuery {
        terms,
        tags,
        local: local.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_terms_tags_and_local_clause() {
        let parsed = parse_search_query("python list #beginner // comprehension");

        assert_eq!(parsed.terms, strings(&["python", "list"]));
        assert_eq!(parsed.tags, strings(&["beginner"]));
        assert_eq!(parsed.local, "comprehension");
        assert_eq!(parsed.query(), "python list");
    }

    #[test]
    fn test_empty_query() {
        let parsed = parse_search_query("");
        assert!(parsed.is_empty());
        assert!(parsed.local.is_empty());

        assert!(parse_search_query("   ").is_empty());
    }

    #[test]
    fn test_trailing_single_slash_is_dropped() {
        let parsed = parse_search_query("borrow checker /");

        assert_eq!(parsed.terms, strings(&["borrow", "checker"]));
        assert!(parsed.local.is_empty());
    }

    #[test]
    fn test_only_first_separator_splits() {
        let parsed = parse_search_query("url parsing // http://example.com");

        assert_eq!(parsed.terms, strings(&["url", "parsing"]));
        assert_eq!(parsed.local, "http://example.com");
    }

    #[test]
    fn test_separator_without_clause() {
        let parsed = parse_search_query("lifetimes //");

        assert_eq!(parsed.terms, strings(&["lifetimes"]));
        assert!(parsed.local.is_empty());
    }

    #[test]
    fn test_tags_only() {
        let parsed = parse_search_query("#rust #async");

        assert!(parsed.terms.is_empty());
        assert_eq!(parsed.tags, strings(&["rust", "async"]));
        assert!(!parsed.is_empty());
    }

    #[test]
    fn test_bare_hash_is_ignored() {
        let parsed = parse_search_query("c # sharp");

        assert_eq!(parsed.terms, strings(&["c", "sharp"]));
        assert!(parsed.tags.is_empty());
    }
}
