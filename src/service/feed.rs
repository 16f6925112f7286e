//! Feed service
//!
//! Pages through the posts a user may see, newest first.

use std::sync::Arc;

use crate::config::FeedConfig;
use crate::data::Database;
use crate::error::AppError;

use super::post::{PostService, PostView};

/// One page of the feed
#[derive(Debug, Clone)]
pub struct FeedPage {
    pub posts: Vec<PostView>,
    pub pagination: Pagination,
}

/// Pagination metadata returned with every feed page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_posts: i64,
    pub has_more: bool,
}

impl Pagination {
    /// Compute pagination for a page of `returned` posts out of `total`
    pub fn new(page: u32, limit: u32, returned: usize, total: i64) -> Self {
        let skip = i64::from(page - 1) * i64::from(limit);
        let limit = i64::from(limit);
        let total_pages = (total + limit - 1) / limit;

        Self {
            current_page: page,
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
            total_posts: total,
            has_more: skip + (returned as i64) < total,
        }
    }
}

/// Resolve requested page and limit against defaults and bounds
///
/// # Errors
/// `Validation` if `page` is below 1 or `limit` is not positive
pub fn resolve_paging(
    config: &FeedConfig,
    page: Option<i64>,
    limit: Option<i64>,
) -> Result<(u32, u32), AppError> {
    let page = page.unwrap_or(1);
    if page < 1 {
        return Err(AppError::Validation("page must be at least 1".to_string()));
    }

    let limit = limit.unwrap_or(i64::from(config.default_page_size));
    if limit < 1 {
        return Err(AppError::Validation(
            "limit must be greater than 0".to_string(),
        ));
    }
    let limit = limit.min(i64::from(config.max_page_size));

    let page = u32::try_from(page)
        .map_err(|_| AppError::Validation("page is out of range".to_string()))?;
    // Bounded by max_page_size above
    let limit = limit as u32;

    Ok((page, limit))
}

/// Feed service
pub struct FeedService {
    db: Arc<Database>,
    config: FeedConfig,
}

impl FeedService {
    /// Create new feed service
    pub fn new(db: Arc<Database>, config: FeedConfig) -> Self {
        Self { db, config }
    }

    /// Get one page of the feed for a requester
    ///
    /// Private posts of other users are filtered in SQL, so they never take
    /// up room in the skip/limit window.
    ///
    /// # Arguments
    /// * `requester_id` - Authenticated user
    /// * `page` - 1-based page number (default 1)
    /// * `limit` - Page size (default and maximum from `FeedConfig`)
    pub async fn page(
        &self,
        requester_id: &str,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<FeedPage, AppError> {
        let (page, limit) = resolve_paging(&self.config, page, limit)?;
        let offset = i64::from(page - 1) * i64::from(limit);

        let total = self.db.count_visible_posts(requester_id).await?;
        let posts = if offset >= total {
            Vec::new()
        } else {
            self.db
                .get_visible_posts(requester_id, i64::from(limit), offset)
                .await?
        };

        let pagination = Pagination::new(page, limit, posts.len(), total);
        tracing::debug!(
            requester_id,
            page,
            limit,
            returned = posts.len(),
            total,
            "Feed page loaded"
        );

        let posts = PostService::new(self.db.clone()).populate(posts).await?;

        Ok(FeedPage { posts, pagination })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_for_twenty_five_posts() {
        let first = Pagination::new(1, 10, 10, 25);
        assert_eq!(first.total_pages, 3);
        assert!(first.has_more);

        let last = Pagination::new(3, 10, 5, 25);
        assert_eq!(last.current_page, 3);
        assert!(!last.has_more);

        let beyond = Pagination::new(4, 10, 0, 25);
        assert!(!beyond.has_more);
    }

    #[test]
    fn pagination_with_no_posts() {
        let empty = Pagination::new(1, 10, 0, 0);
        assert_eq!(empty.total_pages, 0);
        assert_eq!(empty.total_posts, 0);
        assert!(!empty.has_more);
    }

    #[test]
    fn paging_defaults_and_bounds() {
        let config = FeedConfig {
            default_page_size: 10,
            max_page_size: 50,
        };

        assert_eq!(resolve_paging(&config, None, None).unwrap(), (1, 10));
        assert_eq!(resolve_paging(&config, Some(3), Some(500)).unwrap(), (3, 50));
        assert!(matches!(
            resolve_paging(&config, Some(0), None),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            resolve_paging(&config, Some(1), Some(0)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn exact_multiple_has_no_extra_page() {
        let page = Pagination::new(2, 10, 10, 20);
        assert_eq!(page.total_pages, 2);
        assert!(!page.has_more);
    }
}
