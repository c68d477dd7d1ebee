//! Resource path matching for the person provider.
//!
//! Accepted forms:
//! - `person`, `/person`, `content://<authority>/person`
//! - `person/{name}` and the same prefixed forms
//!
//! The name segment is percent-encoded, so names containing `/`, spaces or
//! nothing at all stay one exact segment. `person/` addresses the empty name.

use once_cell::sync::Lazy;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;

/// Table name and first path segment of every person resource.
pub const TABLE_NAME: &str = "person";

const CONTENT_SCHEME: &str = "content://";

/// Everything except RFC 3986 unreserved characters is escaped.
const NAME_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

static PERSON_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/?person(?:/([^/]*))?$").expect("valid person path regex"));

/// Operation target resolved from a resource path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The whole person table.
    Table,
    /// People whose name equals the segment.
    ByName(String),
}

/// Matches resource paths against the provider's authority.
#[derive(Debug, Clone)]
pub struct RouteMatcher {
    authority: String,
}

impl RouteMatcher {
    pub fn new(authority: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
        }
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Resolves `path` to a route, or `None` when nothing matches.
    pub fn resolve(&self, path: &str) -> Option<Route> {
        let local = self.local_path(path)?;
        let captures = PERSON_PATH_RE.captures(local)?;
        match captures.get(1) {
            Some(segment) => {
                let name = percent_decode_str(segment.as_str()).decode_utf8().ok()?;
                Some(Route::ByName(name.into_owned()))
            }
            None => Some(Route::Table),
        }
    }

    /// MIME-like type of the resource at `path`.
    pub fn content_type(&self, path: &str) -> Option<&'static str> {
        match self.resolve(path)? {
            Route::Table => Some("vnd.people.dir/person"),
            Route::ByName(_) => Some("vnd.people.item/person"),
        }
    }

    /// Strips a `content://<authority>` prefix, rejecting foreign authorities.
    fn local_path<'p>(&self, path: &'p str) -> Option<&'p str> {
        let Some(rest) = path.strip_prefix(CONTENT_SCHEME) else {
            return Some(path);
        };
        let (authority, local) = match rest.find('/') {
            Some(index) => rest.split_at(index),
            None => (rest, ""),
        };
        (authority == self.authority).then_some(local)
    }
}

/// Path of the whole table.
pub fn table_path() -> String {
    format!("/{TABLE_NAME}")
}

/// Path addressing the people named exactly `name`.
pub fn name_path(name: &str) -> String {
    format!("/{TABLE_NAME}/{}", utf8_percent_encode(name, NAME_SEGMENT))
}
