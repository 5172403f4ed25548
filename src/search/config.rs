//! Search configuration

/// Knobs shared by search strategies
#[derive(Clone, Debug, Default)]
pub struct SearchConfig {
    /// Candidates tried per root before giving up on it (None = all)
    pub max_candidates_per_root: Option<usize>,

    /// Oracle calls allowed for the whole search (None = unbounded)
    pub max_oracle_calls: Option<usize>,
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_candidates_per_root(mut self, n: usize) -> Self {
        self.max_candidates_per_root = Some(n);
        self
    }

    pub fn max_oracle_calls(mut self, n: usize) -> Self {
        self.max_oracle_calls = Some(n);
        self
    }

    pub(crate) fn oracle_budget_left(&self, used: usize) -> bool {
        self.max_oracle_calls.map_or(true, |max| used < max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget() {
        let config = SearchConfig::new();
        assert!(config.oracle_budget_left(1_000_000));

        let config = SearchConfig::new().max_oracle_calls(2).max_candidates_per_root(1);
        assert!(config.oracle_budget_left(1));
        assert!(!config.oracle_budget_left(2));
        assert_eq!(config.max_candidates_per_root, Some(1));
    }
}
