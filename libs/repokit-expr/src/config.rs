use serde::{Deserialize, Serialize};

/// How `&&`/`||` groups nest below the root group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    /// Groups follow the expression structure; same-operator chains flatten.
    #[default]
    Structural,
    /// Legacy layout: every new group and leaf goes to the deepest last group.
    FirstConnective,
}

/// Translator settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ExprConfig {
    pub grouping: Grouping,
    /// Expressions nesting deeper than this are rejected before evaluation.
    pub max_depth: usize,
}

impl Default for ExprConfig {
    fn default() -> Self {
        Self {
            grouping: Grouping::Structural,
            max_depth: 256,
        }
    }
}

impl ExprConfig {
    #[must_use]
    pub fn with_grouping(mut self, grouping: Grouping) -> Self {
        self.grouping = grouping;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
