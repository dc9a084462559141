//! Canonical constraint constants and closed value sets.
//!
//! The validator, the storage DDL generator and the in-memory remote all read
//! their limits from here, so every layer agrees on the same bounds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minimum title length in characters (after trimming).
pub const TITLE_MIN_LENGTH: usize = 1;
/// Maximum title length in characters (after trimming).
pub const TITLE_MAX_LENGTH: usize = 200;
/// Maximum description length in characters (after trimming).
pub const DESCRIPTION_MAX_LENGTH: usize = 1000;
/// Priority applied when a create input omits one.
pub const DEFAULT_PRIORITY: TaskPriority = TaskPriority::Medium;
/// Listing filter used when none is configured.
pub const DEFAULT_FILTER: FilterType = FilterType::All;
/// Listing sort key used when none is configured.
pub const DEFAULT_SORT: SortType = SortType::Created;

/// A closed set of string values shared by the wire format and storage.
pub trait SchemaEnum: Sized + Copy + Eq + 'static {
    /// Every member, in declaration order.
    const ALL: &'static [Self];
    /// Human label used in error messages.
    const LABEL: &'static str;

    /// Wire/storage representation.
    fn as_str(self) -> &'static str;

    /// Look up a member by its exact wire representation.
    fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|member| member.as_str() == value)
    }

    /// Membership check against the wire representation.
    fn contains(value: &str) -> bool {
        Self::parse(value).is_some()
    }

    /// Every wire value, in declaration order.
    fn values() -> Vec<&'static str> {
        Self::ALL.iter().map(|member| member.as_str()).collect()
    }
}

/// Error returned when a string is outside a [`SchemaEnum`] value set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct UnknownValue {
    message: String,
}

macro_rules! schema_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl SchemaEnum for $name {
            const ALL: &'static [Self] = &[$(Self::$variant),+];
            const LABEL: &'static str = $label;

            fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s).ok_or_else(|| UnknownValue {
                    message: messages::one_of::<Self>(),
                })
            }
        }
    };
}

schema_enum! {
    /// Optional grouping of a task.
    TaskCategory, "Category" {
        /// Work related.
        Work => "Work",
        /// Personal errands.
        Personal => "Personal",
        /// Things to buy.
        Shopping => "Shopping",
        /// Health and fitness.
        Health => "Health",
    }
}

schema_enum! {
    /// Urgency of a task.
    TaskPriority, "Priority" {
        /// Can wait.
        Low => "low",
        /// Default priority.
        Medium => "medium",
        /// Should be handled soon.
        High => "high",
        /// Needs immediate attention.
        Urgent => "urgent",
    }
}

schema_enum! {
    /// Completion filter applied to task listings.
    FilterType, "Filter" {
        /// Every task.
        All => "all",
        /// Tasks not yet completed.
        Active => "active",
        /// Completed tasks only.
        Completed => "completed",
    }
}

schema_enum! {
    /// Sort key applied to task listings.
    SortType, "Sort field" {
        /// Creation time.
        Created => "created",
        /// Due date.
        Due => "due",
        /// Title, case-insensitive.
        Title => "title",
        /// Priority rank.
        Priority => "priority",
    }
}

schema_enum! {
    /// Sort direction.
    SortDirection, "Direction" {
        /// Ascending.
        Asc => "asc",
        /// Descending.
        Desc => "desc",
    }
}

impl TaskPriority {
    /// Numeric rank used for sorting (urgent = 4 … low = 1).
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Urgent => 4,
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        DEFAULT_PRIORITY
    }
}

impl Default for FilterType {
    fn default() -> Self {
        DEFAULT_FILTER
    }
}

impl Default for SortType {
    fn default() -> Self {
        DEFAULT_SORT
    }
}

impl SortType {
    /// Direction a listing uses when none is requested.
    ///
    /// Newest and most urgent tasks come first; due dates and titles ascend.
    #[must_use]
    pub const fn natural_direction(self) -> SortDirection {
        match self {
            Self::Created | Self::Priority => SortDirection::Desc,
            Self::Due | Self::Title => SortDirection::Asc,
        }
    }
}

/// Constraint messages shared by structural and business validation.
pub mod messages {
    use super::{DESCRIPTION_MAX_LENGTH, SchemaEnum, TITLE_MAX_LENGTH, TITLE_MIN_LENGTH};

    /// Completed task without a completion timestamp.
    pub const COMPLETED_AT_REQUIRED: &str = "completed_at must be set when task is marked as completed";
    /// Completion timestamp on a task that is not completed.
    pub const COMPLETED_AT_FORBIDDEN: &str = "completed_at must be null when task is not completed";
    /// Due date at or before the validation instant.
    pub const DUE_DATE_NOT_FUTURE: &str = "due_date must be in the future";

    /// Title shorter than the minimum.
    #[must_use]
    pub fn title_too_short() -> String {
        format!("Title must be at least {TITLE_MIN_LENGTH} character")
    }

    /// Title longer than the maximum.
    #[must_use]
    pub fn title_too_long() -> String {
        format!("Title must be no more than {TITLE_MAX_LENGTH} characters")
    }

    /// Description longer than the maximum.
    #[must_use]
    pub fn description_too_long() -> String {
        format!("Description must be no more than {DESCRIPTION_MAX_LENGTH} characters")
    }

    /// Value outside a closed set.
    #[must_use]
    pub fn one_of<T: SchemaEnum>() -> String {
        format!("{} must be one of: {}", T::LABEL, T::values().join(", "))
    }
}
