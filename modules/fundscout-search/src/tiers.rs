//! Account-class search profiles. A tier bounds how wide and deep one query
//! is allowed to go; nothing here is user-facing.

#[derive(Debug, Clone)]
pub struct SearchTier {
    pub name: &'static str,
    /// Source names from the registered searcher set this tier may use.
    pub sources: Vec<String>,
    /// Query variants fanned out per source.
    pub max_variants: usize,
    /// Cap on extracted companies per query.
    pub max_companies: usize,
    pub page_size: usize,
    pub max_pages: usize,
}

impl SearchTier {
    pub fn free() -> Self {
        Self {
            name: "free",
            sources: vec!["web".to_string()],
            max_variants: 2,
            max_companies: 5,
            page_size: 5,
            max_pages: 1,
        }
    }

    pub fn pro() -> Self {
        Self {
            name: "pro",
            sources: vec!["web".to_string(), "news".to_string()],
            max_variants: 4,
            max_companies: 20,
            page_size: 10,
            max_pages: 3,
        }
    }

    pub fn enterprise() -> Self {
        Self {
            name: "enterprise",
            sources: vec!["web".to_string(), "news".to_string()],
            max_variants: 6,
            max_companies: 50,
            page_size: 20,
            max_pages: 10,
        }
    }

    pub fn from_str_loose(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "enterprise" => Self::enterprise(),
            "pro" => Self::pro(),
            _ => Self::free(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_widen_monotonically() {
        let free = SearchTier::free();
        let pro = SearchTier::pro();
        let ent = SearchTier::enterprise();
        assert!(free.sources.len() <= pro.sources.len());
        assert!(pro.max_variants < ent.max_variants);
        assert!(free.max_companies < pro.max_companies);
        assert_eq!(SearchTier::from_str_loose("unknown").name, "free");
    }
}
