//! Robots.txt parser implementation
//!
//! This module wraps the robotstxt crate's matcher and adds the two degenerate
//! policies the indexer needs when a robots file cannot be used as-is.

use robotstxt::DefaultMatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    AllowAll,
    DenyAll,
    Rules,
}

/// Parsed robots.txt data for one site origin
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty unless rules were fetched)
    content: String,
    access: Access,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            access: Access::Rules,
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// Used when robots.txt is absent, unreachable, or times out.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            access: Access::AllowAll,
        }
    }

    /// Creates a ParsedRobots that denies everything
    ///
    /// Used when the robots.txt request is answered with 401 or 403.
    pub fn deny_all() -> Self {
        Self {
            content: String::new(),
            access: Access::DenyAll,
        }
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// # Arguments
    ///
    /// * `url` - The absolute URL or path to check
    /// * `user_agent` - The product token matched against `User-agent` groups
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        match self.access {
            Access::AllowAll => true,
            Access::DenyAll => false,
            Access::Rules if self.content.is_empty() => true,
            Access::Rules => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
            }
        }
    }

    /// Returns the values of every `Sitemap:` directive, in file order
    ///
    /// The directive name is matched case-insensitively; values are returned
    /// untouched, so relative references still need resolving.
    pub fn sitemaps(&self) -> Vec<String> {
        self.content
            .lines()
            .filter_map(|line| {
                let trimmed = line.trim();
                let (key, value) = trimmed.split_once(':')?;
                if !key.trim().eq_ignore_ascii_case("sitemap") {
                    return None;
                }
                let value = value.trim();
                (!value.is_empty()).then(|| value.to_string())
            })
            .collect()
    }
}
