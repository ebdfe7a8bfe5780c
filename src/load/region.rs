use anyhow::{Context, Result};
use regex::Regex;

/// Keeps records whose region identifier matches the target geography.
#[derive(Clone, Debug)]
pub struct RegionFilter {
    pattern: Regex,
}

impl RegionFilter {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern =
            Regex::new(pattern).with_context(|| format!("invalid region pattern `{}`", pattern))?;
        Ok(Self { pattern })
    }

    pub fn matches(&self, region_id: &str) -> bool {
        self.pattern.is_match(region_id)
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_pattern_selects_state_counties() -> Result<()> {
        let filter = RegionFilter::new("^06")?;
        assert!(filter.matches("06001"));
        assert!(filter.matches("06115"));
        assert!(!filter.matches("36061"));
        assert!(!filter.matches("10601"));
        Ok(())
    }

    #[test]
    fn bad_pattern_is_an_error() {
        assert!(RegionFilter::new("^(06").is_err());
    }
}
