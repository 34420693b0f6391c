use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Debug;

bitflags! {
    /// Operational flags of a network interface snapshot.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct InterfaceFlags: u8 {
        const UP = 1 << 0;
        const LOOPBACK = 1 << 1;
        const POINT_TO_POINT = 1 << 2;
        const MULTICAST = 1 << 3;
        const VIRTUAL = 1 << 4;
    }
}

impl From<u8> for InterfaceFlags {
    fn from(bits: u8) -> Self {
        Self::from_bits_truncate(bits)
    }
}

impl Serialize for InterfaceFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.bits())
    }
}

impl<'de> Deserialize<'de> for InterfaceFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = u8::deserialize(deserializer)?;
        Ok(Self::from_bits_retain(bits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_roundtrip_through_serde() {
        let flags = InterfaceFlags::UP | InterfaceFlags::MULTICAST;
        let json = serde_json::to_string(&flags).unwrap();
        assert_eq!(json, "9");
        let back: InterfaceFlags = serde_json::from_str(&json).unwrap();
        assert_eq!(back, flags);
    }
}
