use crate::Result;
use crate::regex::{Regex, escape};

pub const SESSION_COOKIE: &str = "session";

/// Source of the document cookie header (`name=value; name=value`).
pub trait CookieSource {
    fn cookie_header(&self) -> String;
}

impl CookieSource for String {
    fn cookie_header(&self) -> String {
        self.clone()
    }
}

impl CookieSource for &'static str {
    fn cookie_header(&self) -> String {
        (*self).to_string()
    }
}

/// Returns the raw value of cookie `key`, without any decoding.
///
/// The header is read as a list of `name=value` pairs each terminated by
/// `"; "`; the value is everything between `key=` and the next `"; "`. An
/// empty key looks up a cookie literally named `=`.
pub fn read_cookie(header: &str, key: &str) -> Result<Option<String>> {
    let name = if key.is_empty() { "=" } else { key };
    let pattern = format!("(?:^|; ){}=(.*?); ", escape(name));
    let regex = Regex::new(&pattern)?;
    let terminated = format!("{header}; ");
    Ok(regex.capture_group(&terminated, 1)?)
}

pub fn current_session(header: &str) -> Result<Option<String>> {
    read_cookie(header, SESSION_COOKIE)
}

/// In-memory cookie store with `document.cookie` assignment semantics.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CookieJar {
    cookies: Vec<(String, String)>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a header such as `"session=abc123; other=zzz"` into a jar.
    pub fn from_header(header: &str) -> Self {
        let mut jar = Self::new();
        for pair in header.split(';') {
            let pair = pair.trim_start();
            if !pair.is_empty() {
                jar.set(pair);
            }
        }
        jar
    }

    /// Applies one cookie assignment, e.g. `"session=abc; path=/"`.
    ///
    /// Only `max-age` is honoured among the attributes: a non-positive value
    /// removes the cookie.
    pub fn set(&mut self, assignment: &str) {
        let mut parts = assignment.split(';');
        let pair = parts.next().unwrap_or_default();
        let (name, value) = match pair.split_once('=') {
            Some((name, value)) => (name.trim(), value.trim()),
            None => ("", pair.trim()),
        };

        let expired = parts.any(|attr| {
            let Some((attr_name, attr_value)) = attr.split_once('=') else {
                return false;
            };
            attr_name.trim().eq_ignore_ascii_case("max-age")
                && attr_value
                    .trim()
                    .parse::<i64>()
                    .map(|seconds| seconds <= 0)
                    .unwrap_or(false)
        });

        if expired {
            self.remove(name);
            return;
        }

        if let Some(entry) = self.cookies.iter_mut().find(|(key, _)| key == name) {
            entry.1 = value.to_string();
        } else {
            self.cookies.push((name.to_string(), value.to_string()));
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.cookies.len();
        self.cookies.retain(|(key, _)| key != name);
        before != self.cookies.len()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| {
                if name.is_empty() {
                    value.clone()
                } else {
                    format!("{name}={value}")
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl CookieSource for CookieJar {
    fn cookie_header(&self) -> String {
        self.header()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_is_read_from_header() -> Result<()> {
        assert_eq!(
            current_session("session=abc123; other=zzz; ")?,
            Some("abc123".into())
        );
        assert_eq!(current_session("other=zzz; session=abc123")?, Some("abc123".into()));
        Ok(())
    }

    #[test]
    fn missing_cookie_is_none() -> Result<()> {
        assert_eq!(read_cookie("a=1; b=2", "c")?, None);
        assert_eq!(read_cookie("", "session")?, None);
        Ok(())
    }

    #[test]
    fn name_must_match_a_whole_segment() -> Result<()> {
        assert_eq!(read_cookie("xsession=bad; session=good", "session")?, Some("good".into()));
        assert_eq!(read_cookie("ab=1; b=2", "b")?, Some("2".into()));
        Ok(())
    }

    #[test]
    fn values_are_not_decoded() -> Result<()> {
        assert_eq!(read_cookie("name=a%20b", "name")?, Some("a%20b".into()));
        assert_eq!(read_cookie("name=", "name")?, Some(String::new()));
        Ok(())
    }

    #[test]
    fn key_metacharacters_are_literal() -> Result<()> {
        assert_eq!(read_cookie("a.b=1; axb=2", "a.b")?, Some("1".into()));
        assert_eq!(read_cookie("axb=2", "a.b")?, None);
        Ok(())
    }

    #[test]
    fn empty_key_looks_up_equals_name() -> Result<()> {
        assert_eq!(read_cookie("a=1", "")?, None);
        assert_eq!(read_cookie("==weird; a=1", "")?, Some("weird".into()));
        Ok(())
    }

    #[test]
    fn jar_replaces_and_expires_cookies() -> Result<()> {
        let mut jar = CookieJar::new();
        jar.set("session=alice; path=/");
        jar.set("theme=dark");
        jar.set("session=bob; Path=/");
        assert_eq!(jar.header(), "session=bob; theme=dark");
        assert_eq!(current_session(&jar.cookie_header())?, Some("bob".into()));

        jar.set("session=; Max-Age=0; path=/");
        assert_eq!(jar.get("session"), None);
        assert_eq!(current_session(&jar.cookie_header())?, None);
        assert_eq!(jar.len(), 1);
        Ok(())
    }

    #[test]
    fn jar_from_header_keeps_order() {
        let jar = CookieJar::from_header("session=abc123; other=zzz; ");
        assert_eq!(jar.get("session"), Some("abc123"));
        assert_eq!(jar.get("other"), Some("zzz"));
        assert_eq!(jar.header(), "session=abc123; other=zzz");
    }
}
