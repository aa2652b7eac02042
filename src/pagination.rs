// Pagination helpers shared by every list endpoint
// Parses page/pageSize from the query string and builds the `meta.pagination` object

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Raw pagination parameters extracted from the HTTP query string
/// Values are kept as strings so malformed input never rejects the request
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    /// Page number (1-indexed)
    pub page: Option<String>,
    /// Items per page
    pub page_size: Option<String>,
}

/// Resolved pagination parameters; both fields are always >= 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    /// Resolves raw query values, falling back to the defaults for any value
    /// that is absent, non-numeric, or not positive
    pub fn parse(page: Option<&str>, page_size: Option<&str>) -> Self {
        Self {
            page: parse_positive(page).unwrap_or(DEFAULT_PAGE),
            page_size: parse_positive(page_size).unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }

    pub fn from_query(query: &PageQuery) -> Self {
        Self::parse(query.page.as_deref(), query.page_size.as_deref())
    }

    /// Number of rows to skip: (page - 1) * page_size
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    /// pageCount = ceil(count / pageSize); zero rows means zero pages
    pub fn page_count(&self, count: u64) -> u64 {
        count.div_ceil(u64::from(self.page_size))
    }

    pub fn meta(&self, count: u64) -> PaginationMeta {
        PaginationMeta {
            page: self.page,
            page_count: self.page_count(count),
            page_size: self.page_size,
            count,
        }
    }
}

fn parse_positive(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|value| *value > 0)
}

/// `{ page, pageCount, pageSize, count }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u32,
    pub page_count: u64,
    pub page_size: u32,
    pub count: u64,
}

/// `{ meta: { pagination } }` part of a list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMeta {
    pub pagination: PaginationMeta,
}

/// List response envelope: the items under a caller-chosen key plus `meta`
///
/// ```ignore
/// let body = Paginated::new("cars", cars, meta);
/// // { "cars": [...], "meta": { "pagination": {...} } }
/// ```
#[derive(Debug, Clone)]
pub struct Paginated<T> {
    pub key: &'static str,
    pub items: Vec<T>,
    pub meta: ListMeta,
}

impl<T> Paginated<T> {
    pub fn new(key: &'static str, items: Vec<T>, pagination: PaginationMeta) -> Self {
        Self {
            key,
            items,
            meta: ListMeta { pagination },
        }
    }
}

impl<T: Serialize> Serialize for Paginated<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(self.key, &self.items)?;
        map.serialize_entry("meta", &self.meta)?;
        map.end()
    }
}

/// Offset for the request's page, never failing on malformed input
pub fn get_offset_from_request(query: &PageQuery) -> u64 {
    Pagination::from_query(query).offset()
}

/// Pagination object echoing the resolved page/pageSize for `count` rows
pub fn build_pagination_object(query: &PageQuery, count: u64) -> PaginationMeta {
    Pagination::from_query(query).meta(count)
}
