use serde::Serialize;

use crate::error::FleetError;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// One listing request. Built fresh for every request and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineQuery {
    #[serde(rename = "start")]
    pub offset: u32,
    pub limit: u32,
    #[serde(rename = "text", skip_serializing_if = "Option::is_none")]
    pub text_filter: Option<String>,
    /// `None` means no authorization filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorized: Option<bool>,
}

impl MachineQuery {
    pub fn page(offset: u32, limit: u32, text_filter: Option<String>, authorized: bool) -> Self {
        Self {
            offset,
            limit,
            text_filter,
            authorized: Some(authorized),
        }
    }

    /// Count-only probe for the unauthorized badge. The server has no count
    /// endpoint, so this is a one-item list request whose items are ignored.
    pub fn unauthorized_probe() -> Self {
        Self {
            offset: 0,
            limit: 1,
            text_filter: None,
            authorized: Some(false),
        }
    }

    pub fn validate(&self) -> Result<(), FleetError> {
        validate_limit(self.limit)
    }
}

pub fn validate_limit(limit: u32) -> Result<(), FleetError> {
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(FleetError::InvalidQuery(format!(
            "limit must be between 1 and {MAX_PAGE_LIMIT}"
        )));
    }
    Ok(())
}

/// Blank filters mean "no filter".
pub fn normalize_filter(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
