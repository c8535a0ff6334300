//! Per-domain cookie memory for crawling boards that gate pages behind a
//! session or bot-check cookie.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use cookie::Cookie;
use tokio::sync::Mutex;
use url::Url;

/// Cookies observed per domain (scheme + host + port), replayed on later
/// requests to the same domain. Clones share the same cache.
#[derive(Debug, Clone, Default)]
pub struct CookieCache {
    jar: Arc<Mutex<HashMap<String, BTreeMap<String, String>>>>,
}

impl CookieCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for a `Cookie` request header, if anything is known for this domain.
    pub async fn cookie_header(&self, url: &str) -> Option<String> {
        let key = domain_key(url)?;
        let jar = self.jar.lock().await;
        let cookies = jar.get(&key).filter(|c| !c.is_empty())?;
        Some(
            cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Remember the cookies from `Set-Cookie` header values. Scoping
    /// attributes such as `Path` or `Domain` are ignored. An empty value or a
    /// non-positive `Max-Age` removes the cookie.
    pub async fn store<I, S>(&self, url: &str, set_cookie: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let Some(key) = domain_key(url) else {
            return;
        };
        let parsed: Vec<(String, String)> = set_cookie
            .into_iter()
            .filter_map(|header| parse_set_cookie(header.as_ref()))
            .collect();
        if parsed.is_empty() {
            return;
        }

        let mut jar = self.jar.lock().await;
        let cookies = jar.entry(key).or_default();
        for (name, value) in parsed {
            if value.is_empty() {
                cookies.remove(&name);
            } else {
                cookies.insert(name, value);
            }
        }
    }
}

fn domain_key(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let host = url.host_str()?;
    let port = url
        .port_or_known_default()
        .map(|p| format!(":{p}"))
        .unwrap_or_default();
    Some(format!("{}://{}{}", url.scheme(), host.to_lowercase(), port))
}

/// Name and value of a `Set-Cookie` header. Expired cookies come back with
/// an empty value.
fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let cookie = Cookie::parse(header).ok()?;
    let expired = cookie.max_age().is_some_and(|age| !age.is_positive());
    let value = if expired { "" } else { cookie.value_trimmed() };
    Some((cookie.name().to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_key_includes_default_port() {
        assert_eq!(
            domain_key("https://Example.com/jobs?page=2").as_deref(),
            Some("https://example.com:443")
        );
        assert_eq!(
            domain_key("http://example.com:8080/").as_deref(),
            Some("http://example.com:8080")
        );
        assert_eq!(domain_key("not a url"), None);
    }

    #[test]
    fn set_cookie_attributes_are_dropped() {
        assert_eq!(
            parse_set_cookie("cf_clearance=abc123; Path=/; HttpOnly; Secure"),
            Some(("cf_clearance".into(), "abc123".into()))
        );
        assert_eq!(
            parse_set_cookie("quoted=\"v1\"; Secure"),
            Some(("quoted".into(), "v1".into()))
        );
        assert_eq!(parse_set_cookie("=nameless"), None);
        assert_eq!(parse_set_cookie("garbage"), None);
    }

    #[test]
    fn zero_max_age_reads_as_removal() {
        assert_eq!(
            parse_set_cookie("session=s1; Max-Age=0"),
            Some(("session".into(), String::new()))
        );
    }

    #[tokio::test]
    async fn cookies_replay_only_on_same_domain() {
        let cache = CookieCache::new();
        cache
            .store("https://board.example/list", ["session=s1; Path=/", "cf=c1"])
            .await;

        assert_eq!(
            cache.cookie_header("https://board.example/job/9").await.as_deref(),
            Some("cf=c1; session=s1")
        );
        assert_eq!(cache.cookie_header("https://other.example/").await, None);
        assert_eq!(cache.cookie_header("http://board.example/").await, None);
    }

    #[tokio::test]
    async fn later_cookies_overwrite_and_empty_values_remove() {
        let cache = CookieCache::new();
        cache.store("https://board.example/", ["a=1", "b=2"]).await;
        cache.store("https://board.example/", ["a=3", "b="]).await;

        assert_eq!(
            cache.cookie_header("https://board.example/").await.as_deref(),
            Some("a=3")
        );

        cache.store("https://board.example/", ["a=3; Max-Age=0"]).await;
        assert_eq!(cache.cookie_header("https://board.example/").await, None);
    }

    #[tokio::test]
    async fn clones_share_the_jar() {
        let cache = CookieCache::new();
        let shared = cache.clone();
        let task = tokio::spawn(async move {
            shared.store("https://board.example/", ["token=t"]).await;
        });
        task.await.unwrap();

        assert!(cache.cookie_header("https://board.example/").await.is_some());
    }
}
