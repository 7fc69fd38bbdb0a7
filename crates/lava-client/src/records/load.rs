use serde::{Deserialize, Serialize};

/// Built-in load index names, in index order.
pub const BUILTIN_LOAD_INDICES: [&str; 11] = [
    "r15s", "r1m", "r15m", "ut", "pg", "io", "ls", "it", "tmp", "swp", "mem",
];

/// Load index names used to render load-related reason codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadIndexLog {
    pub names: Vec<String>,
}

impl Default for LoadIndexLog {
    fn default() -> Self {
        Self {
            names: BUILTIN_LOAD_INDICES.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl LoadIndexLog {
    /// Built-in indices followed by site-defined ones.
    pub fn with_external<I, S>(external: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut log = Self::default();
        log.names.extend(external.into_iter().map(Into::into));
        log
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_names() {
        let log = LoadIndexLog::default();
        assert_eq!(log.len(), 11);
        assert_eq!(log.name(3), Some("ut"));
        assert_eq!(log.name(11), None);

        let log = LoadIndexLog::with_external(["scratch"]);
        assert_eq!(log.name(11), Some("scratch"));
    }
}
