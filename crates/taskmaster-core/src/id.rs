use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::num::ParseIntError;
use std::{fmt, str::FromStr};

/// Identifier of a task, assigned by the backing store (BIGSERIAL).
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct TaskId(u64);

impl TaskId {
    /// Wrap a raw identifier. Returns `None` for zero, which the store never assigns.
    #[must_use]
    pub const fn new(raw: u64) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    /// Raw integer value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Failure to parse a [`TaskId`] from text.
#[derive(Debug, thiserror::Error)]
pub enum TaskIdError {
    /// Not an unsigned integer.
    #[error("invalid task id: {0}")]
    Parse(#[from] ParseIntError),
    /// Zero is not a valid identifier.
    #[error("task id must be positive")]
    Zero,
}

impl FromStr for TaskId {
    type Err = TaskIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: u64 = s.trim().parse()?;
        Self::new(raw).ok_or(TaskIdError::Zero)
    }
}

impl Serialize for TaskId {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = u64::deserialize(d)?;
        Self::new(raw).ok_or_else(|| serde::de::Error::custom("task id must be positive"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_rejected() {
        assert!(TaskId::new(0).is_none());
        assert!(matches!("0".parse::<TaskId>(), Err(TaskIdError::Zero)));
    }

    #[test]
    fn parses_and_displays() -> Result<(), TaskIdError> {
        let id: TaskId = " 42 ".parse()?;
        assert_eq!(id.get(), 42);
        assert_eq!(id.to_string(), "42");
        Ok(())
    }

    #[test]
    fn serializes_as_number() -> Result<(), serde_json::Error> {
        let id = TaskId::new(7).unwrap_or_else(|| unreachable!("non-zero literal"));
        assert_eq!(serde_json::to_string(&id)?, "7");
        let back: TaskId = serde_json::from_str("7")?;
        assert_eq!(back, id);
        assert!(serde_json::from_str::<TaskId>("0").is_err());
        assert!(serde_json::from_str::<TaskId>("-3").is_err());
        Ok(())
    }
}
