//! Domain identifier types for diagram nodes and agents.
//!
//! These types provide type-safe wrappers around the identifiers used
//! throughout the influence-diagram system.

use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Serialize};

/// Unique name of a node in an influence diagram.
///
/// Node names identify chance, decision, and utility variables. They are
/// short strings such as `"S"`, `"D1"`, or `"U2"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeName(String);

impl NodeName {
    /// Create a new node name.
    ///
    /// # Examples
    ///
    /// ```
    /// use macid::identifiers::NodeName;
    ///
    /// let name = NodeName::new("D1");
    /// assert_eq!(name.as_str(), "D1");
    /// ```
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert the name into its inner String.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq<&str> for NodeName {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl PartialEq<NodeName> for &str {
    fn eq(&self, other: &NodeName) -> bool {
        *self == other.as_str()
    }
}

impl Borrow<str> for NodeName {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl From<String> for NodeName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for NodeName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for NodeName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Identifier of an agent owning decision and utility nodes.
///
/// Agents are numbered; a single-agent diagram conventionally uses agent 0.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct AgentId(u32);

impl AgentId {
    /// Create a new agent identifier.
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Get the inner value.
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent {}", self.0)
    }
}

impl From<u32> for AgentId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_name_string_comparisons() {
        let name = NodeName::new("D1");
        assert_eq!(name, "D1");
        assert_eq!("D1", name);
        assert_ne!(name, "D2");
    }

    #[test]
    fn agent_id_ordering_is_numeric() {
        assert!(AgentId::new(1) < AgentId::new(2));
        assert_eq!(AgentId::new(3).value(), 3);
    }
}
