use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Default, Clone, Copy, Deserialize, IntoParams)]
pub struct PageParams {
    /// Number of items to return (default: 20, max: 100)
    pub limit: Option<i64>,
    /// Number of items to skip (default: 0)
    pub offset: Option<i64>,
}

impl PageParams {
    /// Resolve raw query parameters into a safe (limit, offset) pair.
    pub fn resolve(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginationMetadata {
    /// Total number of items available
    pub total: i64,
    /// Number of items requested (limit)
    pub limit: i64,
    /// Number of items skipped (offset)
    pub offset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(limit: Option<i64>, offset: Option<i64>) -> PageParams {
        PageParams { limit, offset }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(params(None, None).resolve(), (DEFAULT_LIMIT, 0));
    }

    #[test]
    fn test_limit_clamped_to_max() {
        assert_eq!(params(Some(5000), None).resolve(), (MAX_LIMIT, 0));
    }

    #[test]
    fn test_limit_clamped_to_min() {
        assert_eq!(params(Some(0), None).resolve(), (1, 0));
        assert_eq!(params(Some(-3), None).resolve(), (1, 0));
    }

    #[test]
    fn test_negative_offset_floored() {
        assert_eq!(params(None, Some(-10)).resolve(), (DEFAULT_LIMIT, 0));
    }

    #[test]
    fn test_passthrough() {
        assert_eq!(params(Some(7), Some(14)).resolve(), (7, 14));
    }
}
