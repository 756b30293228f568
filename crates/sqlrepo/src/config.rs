//! Per-repository configuration.

/// Switches governing how a repository writes.
///
/// Each repository instance carries its own copy; there is no global
/// configuration object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepositoryOptions {
    /// When true (the default), `update` fetches the current row, diffs it
    /// against the candidate and writes only the changed columns. When
    /// false, `update` writes every non-key column unconditionally.
    pub update_changed_only: bool,
}

impl RepositoryOptions {
    /// Options with every switch at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the partial-update switch.
    pub fn update_changed_only(mut self, enabled: bool) -> Self {
        self.update_changed_only = enabled;
        self
    }
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            update_changed_only: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RepositoryOptions::default();
        assert!(options.update_changed_only);
    }

    #[test]
    fn test_builder_style_override() {
        let options = RepositoryOptions::new().update_changed_only(false);
        assert!(!options.update_changed_only);
    }
}
