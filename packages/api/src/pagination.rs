// ABOUTME: Pagination utilities for list endpoints
// ABOUTME: Lists are returned whole unless the caller asks for a page

use serde::Serialize;

/// Default page size for paginated queries
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Maximum page size to prevent performance issues
pub const MAX_PAGE_SIZE: i64 = 100;

/// Minimum page number (1-indexed)
pub const MIN_PAGE: i64 = 1;

/// Query parameters for pagination
#[derive(Debug, Clone)]
pub struct PaginationParams {
    /// Page number (1-indexed, defaults to 1)
    pub page: i64,

    /// Number of items per page (defaults to DEFAULT_PAGE_SIZE, max MAX_PAGE_SIZE)
    pub limit: i64,
}

impl PaginationParams {
    pub fn new() -> Self {
        Self {
            page: MIN_PAGE,
            limit: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_and_limit(page: i64, limit: i64) -> Self {
        Self { page, limit }
    }

    /// Pagination is requested when either query parameter is present
    pub fn from_query(page: Option<i64>, limit: Option<i64>) -> Option<Self> {
        if page.is_none() && limit.is_none() {
            return None;
        }
        Some(Self::with_page_and_limit(
            page.unwrap_or(MIN_PAGE),
            limit.unwrap_or(DEFAULT_PAGE_SIZE),
        ))
    }

    /// Validate and normalize pagination parameters
    /// Returns (limit, offset); pages past the end saturate instead of overflowing
    pub fn validate(&self) -> (i64, i64) {
        let page = self.page.max(MIN_PAGE);
        let limit = self.limit.clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1).saturating_mul(limit);
        (limit, offset)
    }

    pub fn limit(&self) -> i64 {
        self.validate().0
    }

    pub fn offset(&self) -> i64 {
        self.validate().1
    }

    pub fn page(&self) -> i64 {
        self.page.max(MIN_PAGE)
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self::new()
    }
}

/// Metadata about pagination state
#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    /// Current page number (1-indexed)
    pub page: i64,

    /// Items per page
    #[serde(rename = "pageSize")]
    pub page_size: i64,

    /// Total number of items across all pages
    #[serde(rename = "totalItems")]
    pub total_items: i64,

    /// Total number of pages
    #[serde(rename = "totalPages")]
    pub total_pages: i64,

    #[serde(rename = "hasNextPage")]
    pub has_next_page: bool,

    #[serde(rename = "hasPreviousPage")]
    pub has_previous_page: bool,
}

impl PaginationMeta {
    pub fn new(params: &PaginationParams, total_items: i64) -> Self {
        let page = params.page();
        let page_size = params.limit();
        let total_pages = (total_items + page_size - 1) / page_size;

        Self {
            page,
            page_size,
            total_items,
            total_pages,
            has_next_page: page < total_pages,
            has_previous_page: page > MIN_PAGE,
        }
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    /// The data items for the current page
    pub data: Vec<T>,

    /// Pagination metadata
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, params: &PaginationParams, total_items: i64) -> Self {
        Self {
            data,
            pagination: PaginationMeta::new(params, total_items),
        }
    }

    /// Cut one page out of an already filtered list
    pub fn from_items(items: Vec<T>, params: &PaginationParams) -> Self {
        let total_items = items.len() as i64;
        let (limit, offset) = params.validate();
        let data = items
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect();
        Self::new(data, params, total_items)
    }
}

/// A list body: the whole list, or one page of it with metadata
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ListPayload<T> {
    All(Vec<T>),
    Page(PaginatedResponse<T>),
}

pub fn paginate<T>(items: Vec<T>, page: Option<i64>, limit: Option<i64>) -> ListPayload<T> {
    match PaginationParams::from_query(page, limit) {
        Some(params) => ListPayload::Page(PaginatedResponse::from_items(items, &params)),
        None => ListPayload::All(items),
    }
}
