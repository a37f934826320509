//! Paginated Search
//!
//! Locates the first item matching a predicate in a cursor-paginated
//! collection, fetching as few pages as possible.
//!
//! ```text
//! fetch(None) ─► scan page 1 ─match─► Found
//!                    │ no match, has_next
//!                    ▼
//! fetch(cursor₁) ─► scan page 2 ─ ... ─► has_next = false ─► NotFound
//! ```
//!
//! Fetch failures propagate unchanged: this module never retries and never
//! reports a failed fetch as `NotFound`.

use crate::result::{SalonError, SalonResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::future::Future;
use tracing::{debug, info};

// =============================================================================
// PAGE TYPES
// =============================================================================

/// Opaque pagination token returned by one fetch and required by the next
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor(String);

impl Cursor {
    /// Wrap a raw cursor token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token, passed back to the server verbatim
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items in server order
    pub items: Vec<T>,
    /// Whether another page follows
    pub has_next: bool,
    /// Cursor for the next page
    pub cursor: Option<Cursor>,
}

impl<T> Page<T> {
    /// A terminal page (nothing follows)
    #[must_use]
    pub const fn last(items: Vec<T>) -> Self {
        Self {
            items,
            has_next: false,
            cursor: None,
        }
    }

    /// A page followed by another one at `cursor`
    pub fn with_next(items: Vec<T>, cursor: impl Into<String>) -> Self {
        Self {
            items,
            has_next: true,
            cursor: Some(Cursor::new(cursor)),
        }
    }
}

// =============================================================================
// GRAPHQL CONNECTION SHAPE
// =============================================================================

/// `pageInfo` of a GraphQL connection
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// `hasNextPage`, required
    pub has_next_page: bool,
    /// `endCursor`
    #[serde(default)]
    pub end_cursor: Option<String>,
}

/// One `edges[]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct Edge<N> {
    /// The wrapped node
    pub node: N,
}

/// A cursor-based GraphQL connection (`edges { node }`, `pageInfo`)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<N> {
    /// Edges in server order
    pub edges: Vec<Edge<N>>,
    /// Required: a connection without it fails to decode as `MissingField`
    pub page_info: PageInfo,
}

impl<N> Connection<N> {
    /// Flatten into a [`Page`]
    pub fn into_page(self) -> Page<N> {
        let info = self.page_info;
        Page {
            items: self.edges.into_iter().map(|edge| edge.node).collect(),
            has_next: info.has_next_page,
            cursor: info.end_cursor.map(Cursor),
        }
    }
}

// =============================================================================
// PAGE FETCHER
// =============================================================================

/// Source of pages for [`paginated_search`]
#[async_trait]
pub trait PageFetcher<T: Send>: Send {
    /// Fetch the page after `cursor` (`None` for the first page)
    async fn fetch_page(&mut self, cursor: Option<&Cursor>) -> SalonResult<Page<T>>;
}

/// Adapter turning an async closure into a [`PageFetcher`]
pub struct FnFetcher<F> {
    func: F,
}

impl<F> std::fmt::Debug for FnFetcher<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnFetcher").finish_non_exhaustive()
    }
}

impl<F> FnFetcher<F> {
    /// Wrap `func`, which receives an owned copy of the cursor
    pub const fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<T, F, Fut> PageFetcher<T> for FnFetcher<F>
where
    T: Send,
    F: FnMut(Option<Cursor>) -> Fut + Send,
    Fut: Future<Output = SalonResult<Page<T>>> + Send,
{
    async fn fetch_page(&mut self, cursor: Option<&Cursor>) -> SalonResult<Page<T>> {
        (self.func)(cursor.cloned()).await
    }
}

// =============================================================================
// SEARCH
// =============================================================================

/// Result of a paginated search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome<T> {
    /// First matching item and the 0-based page it was on
    Found {
        /// The matching item
        item: T,
        /// 0-based page index
        page_index: usize,
    },
    /// Every page was scanned without a match
    NotFound {
        /// Number of pages fetched
        pages_scanned: usize,
    },
}

impl<T> SearchOutcome<T> {
    /// Borrow the found item
    #[must_use]
    pub const fn item(&self) -> Option<&T> {
        match self {
            Self::Found { item, .. } => Some(item),
            Self::NotFound { .. } => None,
        }
    }

    /// Check if an item was found
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    /// Take the item, turning absence into [`SalonError::NotFound`]
    pub fn found_or_err(self, search: impl Into<String>) -> SalonResult<T> {
        match self {
            Self::Found { item, .. } => Ok(item),
            Self::NotFound { pages_scanned } => Err(SalonError::NotFound {
                search: search.into(),
                pages_scanned,
            }),
        }
    }
}

/// Search pages from `fetcher` for the first item satisfying `predicate`.
///
/// Starts from the first page on every call. Stops fetching as soon as a
/// page contains a match.
///
/// # Errors
///
/// - any error from `fetcher`, unchanged, with no further fetches
/// - [`SalonError::MissingField`] when a page claims `has_next` without a cursor
pub async fn paginated_search<T, F, P>(
    label: &str,
    fetcher: &mut F,
    predicate: P,
) -> SalonResult<SearchOutcome<T>>
where
    T: Send,
    F: PageFetcher<T> + ?Sized,
    P: Fn(&T) -> bool,
{
    let mut cursor: Option<Cursor> = None;
    let mut page_index = 0usize;

    loop {
        let page = fetcher.fetch_page(cursor.as_ref()).await?;
        debug!(
            search = label,
            page = page_index,
            items = page.items.len(),
            has_next = page.has_next,
            "page fetched"
        );

        if let Some(item) = page.items.into_iter().find(|item| predicate(item)) {
            info!(search = label, page = page_index, "match found");
            return Ok(SearchOutcome::Found { item, page_index });
        }

        page_index += 1;
        if !page.has_next {
            debug!(search = label, pages_scanned = page_index, "no match");
            return Ok(SearchOutcome::NotFound {
                pages_scanned: page_index,
            });
        }

        match page.cursor {
            Some(next) => cursor = Some(next),
            None => return Err(SalonError::missing_field(label, "pageInfo.endCursor")),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
