use serde::{Deserialize, Serialize};

/// Result of translating a root-to-node path into another hierarchy's space.
///
/// `path` is the deepest successfully mapped prefix, root first, and is never
/// empty: translations that map nothing at all yield no `PathMatch`. `exact`
/// distinguishes a full translation from an ancestor fallback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMatch<T> {
    /// Mapped path, root first.
    pub path: Vec<T>,
    /// `true` when every hop of the input path was mapped.
    pub exact: bool,
}

impl<T> PathMatch<T> {
    /// Create a match; callers guarantee `path` is non-empty.
    pub fn new(path: Vec<T>, exact: bool) -> Self {
        Self { path, exact }
    }

    /// The deepest mapped node.
    pub fn target(&self) -> &T {
        self.path.last().expect("PathMatch path is never empty")
    }

    /// Number of mapped hops.
    pub fn depth(&self) -> usize {
        self.path.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_is_deepest_hop() {
        let m = PathMatch::new(vec![1u32, 2, 3], true);
        assert_eq!(*m.target(), 3);
        assert_eq!(m.depth(), 3);
    }

    #[test]
    fn ancestor_fallback_is_not_exact() {
        let m = PathMatch::new(vec![1u32], false);
        assert!(!m.exact);
        assert_eq!(*m.target(), 1);
    }
}
