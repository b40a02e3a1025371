use std::collections::BTreeMap;

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

/// The host's cookie jar as seen from page script.
pub trait CookieStore {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&mut self, cookie: Cookie<'static>) -> anyhow::Result<()>;
}

/// Attributes applied to every cookie written by page behaviors.
///
/// Defaults are a session cookie (no `Max-Age`/`Expires`) scoped to `Path=/`
/// with `SameSite=Lax`. Script-written cookies are never `HttpOnly`.
#[derive(Debug, Clone, PartialEq)]
pub struct CookiePolicy {
    pub path: String,
    pub same_site: SameSite,
    pub secure: bool,
    pub max_age: Option<Duration>,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            same_site: SameSite::Lax,
            secure: false,
            max_age: None,
        }
    }
}

impl CookiePolicy {
    pub fn build(&self, name: &str, value: &str) -> Cookie<'static> {
        let mut builder = Cookie::build((name.to_string(), value.to_string()))
            .path(self.path.clone())
            .same_site(self.same_site)
            .secure(self.secure);
        if let Some(max_age) = self.max_age {
            builder = builder.max_age(max_age);
        }
        builder.build()
    }
}

/// Keeps the most recent cookie per name.
#[derive(Debug, Clone, Default)]
pub struct MemoryCookieStore {
    cookies: BTreeMap<String, Cookie<'static>>,
}

impl MemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cookie(&self, name: &str) -> Option<&Cookie<'static>> {
        self.cookies.get(name)
    }

    /// `Set-Cookie` header values, sorted by cookie name.
    pub fn set_cookie_headers(&self) -> Vec<String> {
        self.cookies.values().map(|c| c.to_string()).collect()
    }

    pub fn values(&self) -> BTreeMap<String, String> {
        self.cookies
            .iter()
            .map(|(name, c)| (name.clone(), c.value().to_string()))
            .collect()
    }
}

impl CookieStore for MemoryCookieStore {
    fn get(&self, name: &str) -> Option<String> {
        self.cookies.get(name).map(|c| c.value().to_string())
    }

    fn set(&mut self, cookie: Cookie<'static>) -> anyhow::Result<()> {
        tracing::trace!(name = cookie.name(), value = cookie.value(), "set cookie");
        self.cookies.insert(cookie.name().to_string(), cookie);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_root_scoped_session_cookie() {
        let cookie = CookiePolicy::default().build("Count-State", "3");
        assert_eq!(cookie.value(), "3");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), None);
        assert_eq!(cookie.http_only(), None);

        let header = cookie.to_string();
        assert!(header.starts_with("Count-State=3"), "{header}");
        assert!(!header.contains("Max-Age"), "{header}");
    }

    #[test]
    fn max_age_is_applied_when_configured() {
        let policy = CookiePolicy {
            max_age: Some(Duration::days(7)),
            ..CookiePolicy::default()
        };
        let cookie = policy.build("Count-State", "1");
        assert_eq!(cookie.max_age(), Some(Duration::days(7)));
    }

    #[test]
    fn memory_store_overwrites_by_name() {
        let mut store = MemoryCookieStore::new();
        let policy = CookiePolicy::default();
        store.set(policy.build("Count-State", "1")).unwrap();
        store.set(policy.build("Count-State", "2")).unwrap();
        assert_eq!(store.get("Count-State").as_deref(), Some("2"));
        assert_eq!(store.set_cookie_headers().len(), 1);
    }
}
