//! Search filters
//!
//! A [`SearchFilter`] is a template with positional placeholders (`{0}`,
//! `{1}`, ...) plus the argument values bound to them. Arguments are escaped
//! per RFC 4515 when the filter is rendered for the server, so a value such
//! as `*)(uid=*` stays a literal and can never widen a search.
//!
//! [`FilterExpr`] parses a rendered filter back into a tree and evaluates it
//! against entries; the in-memory directory uses it.

use std::fmt;

use super::DirectoryEntry;
use crate::error::{DirectoryError, DirectoryResult};

/// Filter template with bound arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    template: String,
    args: Vec<String>,
}

impl SearchFilter {
    pub fn new(template: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            template: template.into(),
            args,
        }
    }

    /// `(&(objectClass={0})({1}={2}))`: a user entry by identifier
    pub fn user(object_class: &str, id_attribute: &str, principal: &str) -> Self {
        Self::new(
            "(&(objectClass={0})({1}={2}))",
            vec![
                object_class.to_string(),
                id_attribute.to_string(),
                principal.to_string(),
            ],
        )
    }

    /// `({0}={1})`: groups listing `member_dn` in their member attribute
    pub fn group_member(member_attribute: &str, member_dn: &str) -> Self {
        Self::new(
            "({0}={1})",
            vec![member_attribute.to_string(), member_dn.to_string()],
        )
    }

    /// `(objectClass={0})`: every entry of a class
    pub fn object_class(object_class: &str) -> Self {
        Self::new("(objectClass={0})", vec![object_class.to_string()])
    }

    /// `(objectClass=*)`: any entry, used for the root DSE
    pub fn any() -> Self {
        Self::new("(objectClass=*)", Vec::new())
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Filter string sent to the server, with every argument escaped
    pub fn render(&self) -> String {
        self.substitute(|arg| ldap3::ldap_escape(arg).into_owned())
    }

    /// Unescaped rendering. Only for log output, never for a search.
    pub fn render_for_log(&self) -> String {
        self.substitute(|arg| arg.to_string())
    }

    fn substitute(&self, encode: impl Fn(&str) -> String) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            let placeholder = after.find('}').and_then(|close| {
                after[..close]
                    .parse::<usize>()
                    .ok()
                    .and_then(|idx| self.args.get(idx))
                    .map(|arg| (close, arg))
            });

            match placeholder {
                Some((close, arg)) => {
                    out.push_str(&encode(arg));
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        out
    }
}

impl fmt::Display for SearchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Parsed filter tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
    Not(Box<FilterExpr>),
    Equal { attr: String, value: String },
    Present { attr: String },
    /// `attr=initial*any*final`, every piece optional except at least one `*`
    Substring { attr: String, pieces: Vec<String> },
}

impl FilterExpr {
    /// Parse a rendered filter string
    pub fn parse(input: &str) -> DirectoryResult<Self> {
        let mut parser = Parser {
            input: input.trim().as_bytes(),
            pos: 0,
        };
        let expr = parser.filter()?;
        if parser.pos != parser.input.len() {
            return Err(DirectoryError::Filter(format!(
                "trailing input at offset {} in {}",
                parser.pos, input
            )));
        }
        Ok(expr)
    }

    /// Evaluate against an entry. Attribute names and values compare
    /// case-insensitively.
    pub fn matches(&self, entry: &DirectoryEntry) -> bool {
        match self {
            FilterExpr::And(items) => items.iter().all(|f| f.matches(entry)),
            FilterExpr::Or(items) => items.iter().any(|f| f.matches(entry)),
            FilterExpr::Not(inner) => !inner.matches(entry),
            FilterExpr::Equal { attr, value } => entry
                .values(attr)
                .iter()
                .any(|v| v.eq_ignore_ascii_case(value)),
            FilterExpr::Present { attr } => !entry.values(attr).is_empty(),
            FilterExpr::Substring { attr, pieces } => entry
                .values(attr)
                .iter()
                .any(|v| substring_match(&v.to_ascii_lowercase(), pieces)),
        }
    }
}

fn substring_match(value: &str, pieces: &[String]) -> bool {
    let Some((first, rest)) = pieces.split_first() else {
        return true;
    };
    let first = first.to_ascii_lowercase();
    if !value.starts_with(&first) {
        return false;
    }

    let mut remaining = &value[first.len()..];
    let Some((last, middle)) = rest.split_last() else {
        return true;
    };

    for piece in middle {
        let piece = piece.to_ascii_lowercase();
        match remaining.find(&piece) {
            Some(idx) => remaining = &remaining[idx + piece.len()..],
            None => return false,
        }
    }

    remaining.ends_with(&last.to_ascii_lowercase())
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn filter(&mut self) -> DirectoryResult<FilterExpr> {
        self.expect(b'(')?;
        let expr = match self.peek() {
            Some(b'&') => {
                self.pos += 1;
                FilterExpr::And(self.filter_list()?)
            }
            Some(b'|') => {
                self.pos += 1;
                FilterExpr::Or(self.filter_list()?)
            }
            Some(b'!') => {
                self.pos += 1;
                FilterExpr::Not(Box::new(self.filter()?))
            }
            _ => self.item()?,
        };
        self.expect(b')')?;
        Ok(expr)
    }

    fn filter_list(&mut self) -> DirectoryResult<Vec<FilterExpr>> {
        let mut items = Vec::new();
        while self.peek() == Some(b'(') {
            items.push(self.filter()?);
        }
        if items.is_empty() {
            return Err(self.error("empty filter list"));
        }
        Ok(items)
    }

    fn item(&mut self) -> DirectoryResult<FilterExpr> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == b')' || c == b'(' {
                break;
            }
            self.pos += 1;
        }
        let raw = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.error("filter is not valid UTF-8"))?;

        let (attr, value) = raw
            .split_once('=')
            .ok_or_else(|| self.error("missing '=' in filter item"))?;
        if attr.is_empty() || attr.ends_with(['<', '>', '~', ':']) {
            return Err(self.error("unsupported filter item"));
        }
        let attr = attr.to_string();

        if value == "*" {
            return Ok(FilterExpr::Present { attr });
        }

        let pieces = value
            .split('*')
            .map(unescape)
            .collect::<DirectoryResult<Vec<_>>>()?;

        if pieces.len() == 1 {
            Ok(FilterExpr::Equal {
                attr,
                value: pieces.into_iter().next().unwrap_or_default(),
            })
        } else {
            Ok(FilterExpr::Substring { attr, pieces })
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn expect(&mut self, c: u8) -> DirectoryResult<()> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", c as char)))
        }
    }

    fn error(&self, message: &str) -> DirectoryError {
        DirectoryError::Filter(format!("{} at offset {}", message, self.pos))
    }
}

/// Decode `\XX` hex escapes in an assertion value
fn unescape(value: &str) -> DirectoryResult<String> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' {
            let hex = value
                .get(i + 1..i + 3)
                .ok_or_else(|| DirectoryError::Filter(format!("truncated escape in {}", value)))?;
            let byte = u8::from_str_radix(hex, 16)
                .map_err(|_| DirectoryError::Filter(format!("invalid escape in {}", value)))?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out).map_err(|_| DirectoryError::Filter(format!("invalid UTF-8 in {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_filter_rendering() {
        let filter = SearchFilter::user("person", "uid", "euler");
        assert_eq!(filter.render(), "(&(objectClass=person)(uid=euler))");
        assert_eq!(filter.template(), "(&(objectClass={0})({1}={2}))");
    }

    #[test]
    fn test_injection_is_escaped() {
        let filter = SearchFilter::user("person", "uid", "*)(uid=*");

        let rendered = filter.render();
        assert_eq!(rendered, r"(&(objectClass=person)(uid=\2a\29\28uid=\2a))");

        // The log rendering keeps the raw value
        assert_eq!(
            filter.render_for_log(),
            "(&(objectClass=person)(uid=*)(uid=*))"
        );

        let parsed = FilterExpr::parse(&rendered).unwrap();
        assert_eq!(
            parsed,
            FilterExpr::And(vec![
                FilterExpr::Equal {
                    attr: "objectClass".into(),
                    value: "person".into()
                },
                FilterExpr::Equal {
                    attr: "uid".into(),
                    value: "*)(uid=*".into()
                },
            ])
        );
    }

    #[test]
    fn test_unknown_placeholder_kept() {
        let filter = SearchFilter::new("({0}={5}{x})", vec!["cn".into()]);
        assert_eq!(filter.render(), "(cn={5}{x})");
    }

    #[test]
    fn test_parse_and_match() {
        let entry = DirectoryEntry::new("uid=euler,dc=example,dc=com")
            .with_attr("objectClass", "person")
            .with_attr("uid", "euler")
            .with_attr("cn", "Leonhard Euler");

        let cases = [
            ("(uid=euler)", true),
            ("(UID=EULER)", true),
            ("(uid=gauss)", false),
            ("(uid=*)", true),
            ("(mail=*)", false),
            ("(cn=Leon*Euler)", true),
            ("(cn=*hard*)", true),
            ("(cn=*Gauss)", false),
            ("(&(objectClass=person)(uid=euler))", true),
            ("(|(uid=gauss)(uid=euler))", true),
            ("(!(uid=euler))", false),
        ];

        for (filter, expected) in cases {
            let expr = FilterExpr::parse(filter).unwrap();
            assert_eq!(expr.matches(&entry), expected, "filter {}", filter);
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(FilterExpr::parse("uid=euler").is_err());
        assert!(FilterExpr::parse("(uid=euler").is_err());
        assert!(FilterExpr::parse("(uid=*)(uid=*)").is_err());
        assert!(FilterExpr::parse("(&)").is_err());
        assert!(FilterExpr::parse(r"(uid=\zz)").is_err());
        assert!(FilterExpr::parse("(uid>=5)").is_err());
    }
}
