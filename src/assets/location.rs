use std::fmt;

/// Domain used when a location string carries no `domain:` prefix.
pub const DEFAULT_DOMAIN: &str = "game";

/// Domain tried as a fallback for part textures.
pub const FALLBACK_DOMAIN: &str = "kemono";

/// `domain:path` asset address, e.g. `kemono:entity/kemono/hair-{code}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetLocation {
    pub domain: String,
    pub path: String,
}

impl AssetLocation {
    #[must_use]
    pub fn new(domain: &str, path: &str) -> Self {
        Self {
            domain: domain.to_string(),
            path: path.to_string(),
        }
    }

    /// Parses `domain:path`, defaulting the domain.
    #[must_use]
    pub fn parse(location: &str) -> Self {
        match location.split_once(':') {
            Some((domain, path)) if !domain.is_empty() => Self::new(domain, path),
            Some((_, path)) => Self::new(DEFAULT_DOMAIN, path),
            None => Self::new(DEFAULT_DOMAIN, location),
        }
    }

    #[must_use]
    pub fn with_path_prefix_once(mut self, prefix: &str) -> Self {
        if !self.path.starts_with(prefix) {
            self.path.insert_str(0, prefix);
        }
        self
    }

    #[must_use]
    pub fn with_path_appendix_once(mut self, appendix: &str) -> Self {
        if !self.path.ends_with(appendix) {
            self.path.push_str(appendix);
        }
        self
    }

    #[must_use]
    pub fn with_domain(mut self, domain: &str) -> Self {
        domain.clone_into(&mut self.domain);
        self
    }

    /// Replaces the `{code}` placeholder in the path.
    #[must_use]
    pub fn with_code(mut self, code: &str) -> Self {
        self.path = self.path.replace("{code}", code);
        self
    }

    /// `shapes/<path>.json`
    #[must_use]
    pub fn shape(location: &str) -> Self {
        Self::parse(location)
            .with_path_prefix_once("shapes/")
            .with_path_appendix_once(".json")
    }

    /// `textures/<path>.png`
    #[must_use]
    pub fn texture(location: &str) -> Self {
        Self::parse(location)
            .with_path_prefix_once("textures/")
            .with_path_appendix_once(".png")
    }
}

impl fmt::Display for AssetLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.domain, self.path)
    }
}
