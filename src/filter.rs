//! Change intent attached to entities and leaves

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, YdkError};

/// Requested edit operation for a node or leaf.
///
/// `NotSet` means no explicit operation: the node inherits the default
/// operation of the enclosing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YFilter {
    Merge,
    Create,
    Remove,
    Delete,
    Replace,
    Read,
    #[default]
    NotSet,
}

impl YFilter {
    /// Whether an explicit operation was requested
    pub fn is_set(self) -> bool {
        self != YFilter::NotSet
    }

    /// NETCONF `operation` attribute keyword
    pub fn as_str(self) -> &'static str {
        match self {
            YFilter::Merge => "merge",
            YFilter::Create => "create",
            YFilter::Remove => "remove",
            YFilter::Delete => "delete",
            YFilter::Replace => "replace",
            YFilter::Read => "read",
            YFilter::NotSet => "not_set",
        }
    }
}

impl fmt::Display for YFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for YFilter {
    type Err = YdkError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "merge" => Ok(YFilter::Merge),
            "create" => Ok(YFilter::Create),
            "remove" => Ok(YFilter::Remove),
            "delete" => Ok(YFilter::Delete),
            "replace" => Ok(YFilter::Replace),
            "read" => Ok(YFilter::Read),
            "not_set" | "" => Ok(YFilter::NotSet),
            other => Err(YdkError::TypeConversion(format!(
                "unknown filter operation: {}",
                other
            ))),
        }
    }
}
