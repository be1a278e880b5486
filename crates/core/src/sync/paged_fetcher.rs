use chrono::{DateTime, Utc};
use log::debug;
use serde_json::Value;

use super::{EntityPageSource, PageRequest, RequestContext};
use crate::catalog::EntityType;
use crate::errors::Result;

pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetcherState {
    Ready { offset: usize },
    Exhausted,
}

/// Cursor over one remote collection.
///
/// Pages are requested strictly in sequence. The fetcher becomes exhausted after a
/// short page, an empty page, or a failed fetch, and never restarts.
pub struct PagedEntityFetcher<'a> {
    source: &'a dyn EntityPageSource,
    ctx: &'a RequestContext,
    entity_type: EntityType,
    page_size: usize,
    since: Option<DateTime<Utc>>,
    state: FetcherState,
    pages_fetched: usize,
}

impl<'a> PagedEntityFetcher<'a> {
    pub fn new(
        source: &'a dyn EntityPageSource,
        ctx: &'a RequestContext,
        entity_type: EntityType,
        page_size: usize,
        since: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            source,
            ctx,
            entity_type,
            page_size: page_size.max(1),
            since,
            state: FetcherState::Ready { offset: 0 },
            pages_fetched: 0,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == FetcherState::Exhausted
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Fetches the next page, or `Ok(None)` once exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Value>>> {
        let offset = match self.state {
            FetcherState::Ready { offset } => offset,
            FetcherState::Exhausted => return Ok(None),
        };

        let request = PageRequest {
            entity_type: self.entity_type,
            offset,
            count: self.page_size,
            since: self.since,
        };
        let page = match self.source.fetch_page(self.ctx, &request).await {
            Ok(page) => page,
            Err(err) => {
                self.state = FetcherState::Exhausted;
                return Err(err);
            }
        };
        self.pages_fetched += 1;
        debug!(
            "Fetched {} page {} ({} items, offset {})",
            self.entity_type,
            self.pages_fetched,
            page.len(),
            offset
        );

        self.state = if page.len() < self.page_size {
            FetcherState::Exhausted
        } else {
            FetcherState::Ready {
                offset: offset + page.len(),
            }
        };

        if page.is_empty() {
            Ok(None)
        } else {
            Ok(Some(page))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use crate::profiles::Region;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct ScriptedSource {
        total: usize,
        fail_at_offset: Option<usize>,
        requests: Mutex<Vec<PageRequest>>,
    }

    impl ScriptedSource {
        fn new(total: usize) -> Self {
            Self {
                total,
                fail_at_offset: None,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EntityPageSource for ScriptedSource {
        async fn fetch_page(
            &self,
            _ctx: &RequestContext,
            request: &PageRequest,
        ) -> Result<Vec<Value>> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail_at_offset == Some(request.offset) {
                return Err(Error::validation("boom"));
            }
            let end = (request.offset + request.count).min(self.total);
            Ok((request.offset..end)
                .map(|i| json!({"campaignId": i}))
                .collect())
        }
    }

    fn ctx() -> RequestContext {
        RequestContext {
            profile_id: "p1".into(),
            region: Region::Na,
            access_token: "token".into(),
        }
    }

    #[tokio::test]
    async fn stops_after_short_page() {
        let source = ScriptedSource::new(250);
        let ctx = ctx();
        let mut fetcher =
            PagedEntityFetcher::new(&source, &ctx, EntityType::Campaigns, 100, None);

        let mut sizes = Vec::new();
        while let Some(page) = fetcher.next_page().await.unwrap() {
            sizes.push(page.len());
        }

        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(fetcher.pages_fetched(), 3);
        assert!(fetcher.is_exhausted());
        let offsets: Vec<usize> = source
            .requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.offset)
            .collect();
        assert_eq!(offsets, vec![0, 100, 200]);
    }

    #[tokio::test]
    async fn exact_multiple_ends_with_empty_page() {
        let source = ScriptedSource::new(200);
        let ctx = ctx();
        let mut fetcher =
            PagedEntityFetcher::new(&source, &ctx, EntityType::Campaigns, 100, None);

        let mut pages = 0;
        while fetcher.next_page().await.unwrap().is_some() {
            pages += 1;
        }
        assert_eq!(pages, 2);
        assert_eq!(fetcher.pages_fetched(), 3);
        assert_eq!(fetcher.next_page().await.unwrap(), None);
        assert_eq!(source.requests.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn failure_exhausts_the_cursor() {
        let mut source = ScriptedSource::new(500);
        source.fail_at_offset = Some(100);
        let ctx = ctx();
        let since = Utc::now();
        let mut fetcher =
            PagedEntityFetcher::new(&source, &ctx, EntityType::Ads, 100, Some(since));

        assert!(fetcher.next_page().await.unwrap().is_some());
        assert!(fetcher.next_page().await.is_err());
        assert!(fetcher.is_exhausted());
        assert_eq!(fetcher.next_page().await.unwrap(), None);

        let requests = source.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.since == Some(since)));
    }
}
