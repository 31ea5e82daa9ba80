use core::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a node in the mesh.
///
/// Node ids are opaque 32 bit keys. Deployments historically derived them from
/// IPv4 interface addresses, which is why the [`Display`](fmt::Display)
/// implementation renders them as dotted quads, but the engine never
/// interprets the value beyond equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Create a new `NodeId` from a raw 32 bit value.
    pub const fn new(value: u32) -> Self {
        NodeId(value)
    }

    /// The raw 32 bit value of this `NodeId`.
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0.to_be_bytes();
        f.write_fmt(format_args!("{a}.{b}.{c}.{d}"))
    }
}

impl From<u32> for NodeId {
    fn from(value: u32) -> Self {
        NodeId(value)
    }
}

impl From<NodeId> for u32 {
    fn from(value: NodeId) -> Self {
        value.0
    }
}

/// Error returned when parsing a [`NodeId`] from a string fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeIdParseError;

impl fmt::Display for NodeIdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("expected a dotted quad or a raw 32 bit value")
    }
}

impl std::error::Error for NodeIdParseError {}

impl std::str::FromStr for NodeId {
    type Err = NodeIdParseError;

    /// Parse either a dotted quad (`10.0.0.1`) or a raw decimal value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(raw) = s.parse::<u32>() {
            return Ok(NodeId(raw));
        }

        let mut bytes = [0u8; 4];
        let mut parts = s.split('.');
        for byte in &mut bytes {
            *byte = parts
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or(NodeIdParseError)?;
        }
        if parts.next().is_some() {
            return Err(NodeIdParseError);
        }

        Ok(NodeId(u32::from_be_bytes(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::NodeId;

    #[test]
    fn renders_as_dotted_quad() {
        assert_eq!(NodeId::new(0x0A000001).to_string(), "10.0.0.1");
        assert_eq!(NodeId::new(0xC0A80001).to_string(), "192.168.0.1");
    }

    #[test]
    fn parses_dotted_quad_and_raw() {
        assert_eq!("10.0.0.1".parse(), Ok(NodeId::new(0x0A000001)));
        assert_eq!("167772161".parse(), Ok(NodeId::new(0x0A000001)));
        assert!("10.0.0".parse::<NodeId>().is_err());
        assert!("10.0.0.1.2".parse::<NodeId>().is_err());
        assert!("node".parse::<NodeId>().is_err());
    }
}
