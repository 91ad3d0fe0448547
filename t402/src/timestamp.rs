//! Unix timestamps for payment authorization windows.
//!
//! Payment authorizations are time-bounded: `validAfter` is the earliest
//! moment an authorization may execute, `validBefore` the moment it
//! expires. Both travel on the wire as stringified integers because
//! JavaScript peers cannot represent all 64-bit values losslessly.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::ops::{Add, Sub};
use std::time::SystemTime;

/// Seconds since the Unix epoch, serialized as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnixTimestamp(u64);

impl UnixTimestamp {
    /// Creates a timestamp from raw seconds.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Returns the current system time.
    ///
    /// # Panics
    ///
    /// Panics if the system clock is set before the Unix epoch.
    #[must_use]
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .expect("system clock before Unix epoch")
            .as_secs();
        Self(secs)
    }

    /// Returns raw seconds since the epoch.
    #[must_use]
    pub const fn as_secs(&self) -> u64 {
        self.0
    }
}

impl Add<u64> for UnixTimestamp {
    type Output = Self;

    fn add(self, rhs: u64) -> Self {
        Self(self.0.saturating_add(rhs))
    }
}

impl Sub<u64> for UnixTimestamp {
    type Output = Self;

    fn sub(self, rhs: u64) -> Self {
        Self(self.0.saturating_sub(rhs))
    }
}

impl Display for UnixTimestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for UnixTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for UnixTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<u64>()
            .map(Self)
            .map_err(|_| serde::de::Error::custom("timestamp must be a non-negative integer"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_string() {
        let ts = UnixTimestamp::from_secs(1_699_999_999);
        assert_eq!(serde_json::to_string(&ts).unwrap(), "\"1699999999\"");
    }

    #[test]
    fn test_deserializes_from_string() {
        let ts: UnixTimestamp = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(ts.as_secs(), 42);
    }

    #[test]
    fn test_rejects_negative() {
        assert!(serde_json::from_str::<UnixTimestamp>("\"-1\"").is_err());
    }

    #[test]
    fn test_saturating_arithmetic() {
        let ts = UnixTimestamp::from_secs(10);
        assert_eq!((ts - 20).as_secs(), 0);
        assert_eq!((ts + 5).as_secs(), 15);
    }
}
