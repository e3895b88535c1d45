/// Path prefixes (after the leading `/`) the route guard never runs on:
/// API routes, framework static and image assets, and the favicon.
pub const EXCLUDED_PREFIXES: [&str; 4] = ["api", "_next/static", "_next/image", "favicon.ico"];

/// Matcher
///
/// Decides whether the route guard is invoked for a path at all.
///
/// Exclusion is a prefix test on the path with its leading `/` removed, so
/// `/api/foo` and `/apiary` are both skipped while `/` and `/admin` are not.
#[derive(Debug, Clone)]
pub struct Matcher {
    excluded: Vec<String>,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(EXCLUDED_PREFIXES)
    }
}

impl Matcher {
    pub fn new<I, P>(excluded: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            excluded: excluded.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true when the guard should run for `path`.
    pub fn matches(&self, path: &str) -> bool {
        let Some(rest) = path.strip_prefix('/') else {
            return false;
        };
        !self
            .excluded
            .iter()
            .any(|prefix| rest.starts_with(prefix.as_str()))
    }
}
