use std::fmt;

/// Identity of a node within one editor's lifetime
///
/// Keys are handed out by a [`KeyGenerator`] and are never reused, so a key
/// that disappears from a snapshot can never come back attached to a
/// different node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey(u64);

impl NodeKey {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "k{}", self.0)
    }
}

/// Sequential key allocator owned by one editor
#[derive(Debug, Clone, Default)]
pub struct KeyGenerator {
    count: u64,
}

impl KeyGenerator {
    pub fn new() -> Self {
        Self { count: 0 }
    }

    /// Generate next sequential key
    pub fn new_key(&mut self) -> NodeKey {
        self.count += 1;
        NodeKey(self.count)
    }

    /// Number of keys allocated so far
    pub fn allocated(&self) -> u64 {
        self.count
    }
}
