//! IMAP SEARCH criteria builder.
//!
//! Builds the query strings sent with `SEARCH`:
//!
//! - `ALL` — every message in the mailbox
//! - `SENTSINCE 06-May-2023` / `SENTBEFORE 01-Jun-2023`
//! - `FROM "someone@example.com"`
//! - `SUBJECT "Hello"` / `BODY "Hello"`
//! - `ANSWERED` / `UNSEEN`
//!
//! Several terms are ANDed: `(SENTSINCE 06-May-2023 FROM "a@b.com")`.

use std::fmt;

use chrono::NaiveDate;

/// One search key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchKey {
    SentSince(NaiveDate),
    SentBefore(NaiveDate),
    From(String),
    Subject(String),
    Body(String),
    Answered,
    Unseen,
}

/// A conjunction of search keys. Empty means `ALL`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    keys: Vec<SearchKey>,
}

impl SearchCriteria {
    /// Match every message.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn since(mut self, date: NaiveDate) -> Self {
        self.keys.push(SearchKey::SentSince(date));
        self
    }

    pub fn before(mut self, date: NaiveDate) -> Self {
        self.keys.push(SearchKey::SentBefore(date));
        self
    }

    pub fn from_address(mut self, address: impl Into<String>) -> Self {
        self.keys.push(SearchKey::From(address.into()));
        self
    }

    pub fn subject(mut self, text: impl Into<String>) -> Self {
        self.keys.push(SearchKey::Subject(text.into()));
        self
    }

    pub fn body(mut self, text: impl Into<String>) -> Self {
        self.keys.push(SearchKey::Body(text.into()));
        self
    }

    pub fn answered(mut self) -> Self {
        self.keys.push(SearchKey::Answered);
        self
    }

    pub fn unseen(mut self) -> Self {
        self.keys.push(SearchKey::Unseen);
        self
    }

    pub fn keys(&self) -> &[SearchKey] {
        &self.keys
    }
}

impl fmt::Display for SearchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchKey::SentSince(d) => write!(f, "SENTSINCE {}", imap_date(*d)),
            SearchKey::SentBefore(d) => write!(f, "SENTBEFORE {}", imap_date(*d)),
            SearchKey::From(s) => write!(f, "FROM {}", quote(s)),
            SearchKey::Subject(s) => write!(f, "SUBJECT {}", quote(s)),
            SearchKey::Body(s) => write!(f, "BODY {}", quote(s)),
            SearchKey::Answered => f.write_str("ANSWERED"),
            SearchKey::Unseen => f.write_str("UNSEEN"),
        }
    }
}

impl fmt::Display for SearchCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.keys.as_slice() {
            [] => f.write_str("ALL"),
            keys => {
                f.write_str("(")?;
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{key}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// IMAP date format: `06-May-2023`.
fn imap_date(date: NaiveDate) -> String {
    date.format("%d-%b-%Y").to_string()
}

/// Quote a string argument, escaping `"` and `\`.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_all() {
        assert_eq!(SearchCriteria::all().to_string(), "ALL");
    }

    #[test]
    fn test_since_date_format() {
        let date = NaiveDate::from_ymd_opt(2023, 5, 6).unwrap();
        assert_eq!(
            SearchCriteria::all().since(date).to_string(),
            "(SENTSINCE 06-May-2023)"
        );
    }

    #[test]
    fn test_combined_terms() {
        let q = SearchCriteria::all()
            .from_address("anthony@example.com")
            .subject("Hello")
            .answered();
        assert_eq!(
            q.to_string(),
            "(FROM \"anthony@example.com\" SUBJECT \"Hello\" ANSWERED)"
        );
        assert_eq!(q.keys().len(), 3);
    }

    #[test]
    fn test_quotes_are_escaped() {
        let q = SearchCriteria::all().body(r#"say "hi" \o/"#);
        assert_eq!(q.to_string(), r#"(BODY "say \"hi\" \\o/")"#);
    }
}
