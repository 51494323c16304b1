use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// The default number of items returned when a request doesn't specify a limit.
pub const DEFAULT_LIMIT: u64 = 50;

/// The largest number of items a single request may ask for.
pub const MAX_LIMIT: u64 = 100;

/// The largest offset a database accepts, larger ones are capped to it.
pub const MAX_OFFSET: u64 = i64::MAX as u64;

#[derive(IntoParams, Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[into_params(parameter_in = Query)]
pub struct Paginated {
    /// The first item to return, skipping all that come before it.
    #[serde(default)]
    pub offset: u64,
    /// The maximum number of entries to return.
    #[serde(default = "default::limit")]
    pub limit: u64,
}

impl Default for Paginated {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Paginated {
    /// The limit, clamped to `1..=MAX_LIMIT`.
    pub fn effective_limit(&self) -> u64 {
        self.limit.clamp(1, MAX_LIMIT)
    }

    /// The offset, capped to [`MAX_OFFSET`].
    pub fn effective_offset(&self) -> u64 {
        self.offset.min(MAX_OFFSET)
    }
}

mod default {
    pub(super) const fn limit() -> u64 {
        super::DEFAULT_LIMIT
    }
}

#[derive(ToSchema, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginatedResults<R> {
    pub items: Vec<R>,
    pub total: u64,
}

impl<R> PaginatedResults<R> {
    pub fn map<O, F: FnMut(R) -> O>(self, f: F) -> PaginatedResults<O> {
        PaginatedResults {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_when_missing() {
        let paginated: Paginated = serde_json::from_value(json!({})).unwrap();
        assert_eq!(paginated, Paginated::default());
        assert_eq!(paginated.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn offset_is_capped() {
        let paginated: Paginated =
            serde_json::from_value(json!({ "offset": u64::MAX })).unwrap();
        assert_eq!(paginated.effective_offset(), MAX_OFFSET);
        assert_eq!(Paginated::default().effective_offset(), 0);
    }

    #[test]
    fn limit_is_clamped() {
        let paginated = Paginated {
            offset: 0,
            limit: 10_000,
        };
        assert_eq!(paginated.effective_limit(), MAX_LIMIT);

        let paginated = Paginated {
            offset: 0,
            limit: 0,
        };
        assert_eq!(paginated.effective_limit(), 1);
    }

    #[test]
    fn map_keeps_total() {
        let results = PaginatedResults {
            items: vec![1, 2, 3],
            total: 42,
        }
        .map(|i| i * 2);
        assert_eq!(results.items, vec![2, 4, 6]);
        assert_eq!(results.total, 42);
    }
}
