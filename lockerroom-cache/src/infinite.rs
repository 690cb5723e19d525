//! Cursor-paginated ("infinite") queries.
//!
//! The first page is an ordinary query whose value is an
//! [`InfiniteData`] holding one page; refetching it resets the list.
//! Further pages are appended with [`QueryClient::fetch_next_page`].

use std::future::Future;
use std::sync::Arc;

use lockerroom_core::{LockerRoomResult, Paginated};

use crate::client::QueryClient;
use crate::entry::{downcast, CachedValue};
use crate::key::QueryKey;

/// Loaded pages, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct InfiniteData<P> {
    pub pages: Vec<P>,
}

impl<P: Paginated> InfiniteData<P> {
    pub fn first(page: P) -> Self {
        Self { pages: vec![page] }
    }

    pub fn next_cursor(&self) -> Option<P::Cursor> {
        self.pages.last().and_then(Paginated::next_cursor)
    }

    pub fn has_next_page(&self) -> bool {
        self.next_cursor().is_some()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Copy with every page passed through `f`.
    pub fn map_pages<F>(&self, f: F) -> Self
    where
        F: FnMut(&P) -> P,
    {
        Self {
            pages: self.pages.iter().map(f).collect(),
        }
    }
}

/// What a next-page request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Appended,
    /// The last loaded page has no successor.
    Exhausted,
    /// No first page is cached yet.
    NotLoaded,
    /// Another next-page request is already running.
    Busy,
    /// The list was reset or extended while the page was loading.
    Superseded,
}

/// Clears the page-load marker if the request is cancelled.
struct PageGuard<'a> {
    client: &'a QueryClient,
    key: &'a QueryKey,
}

impl Drop for PageGuard<'_> {
    fn drop(&mut self) {
        if let Some(slot) = self.client.lock().get_mut(self.key) {
            slot.fetching_page = false;
        }
    }
}

impl QueryClient {
    /// Load the page after the last cached one and append it.
    ///
    /// The page is appended only if the list still ends at the cursor it
    /// was requested with. Pending mutations keep their rollback state in
    /// step, so a rollback never drops a page loaded meanwhile.
    pub async fn fetch_next_page<P, F, Fut>(
        &self,
        key: &QueryKey,
        fetch_page: F,
    ) -> LockerRoomResult<PageOutcome>
    where
        P: Paginated + Clone + Send + Sync + 'static,
        F: Fn(P::Cursor) -> Fut,
        Fut: Future<Output = LockerRoomResult<P>>,
    {
        let (cursor, loaded, retry) = {
            let mut entries = self.lock();
            let Some(slot) = entries.get_mut(key) else {
                return Ok(PageOutcome::NotLoaded);
            };
            let Some(data) = slot.typed::<InfiniteData<P>>()? else {
                return Ok(PageOutcome::NotLoaded);
            };
            if slot.fetching_page {
                return Ok(PageOutcome::Busy);
            }
            let Some(cursor) = data.next_cursor() else {
                return Ok(PageOutcome::Exhausted);
            };
            slot.fetching_page = true;
            slot.touch();
            (cursor, data.page_count(), slot.options.retry.clone())
        };

        let _guard = PageGuard { client: self, key };
        let label = format!("{key} (page {})", loaded + 1);
        let page = retry.run(&label, || fetch_page(cursor.clone())).await?;

        let mut entries = self.lock();
        let Some(slot) = entries.get_mut(key) else {
            return Ok(PageOutcome::Superseded);
        };
        let appended = slot.extend_all(|value| {
            let data = downcast::<InfiniteData<P>>(key, value).ok()?;
            if data.page_count() != loaded || data.next_cursor().as_ref() != Some(&cursor) {
                return None;
            }
            let mut pages = data.pages;
            pages.push(page.clone());
            Some(Arc::new(InfiniteData { pages }) as CachedValue)
        });
        if !appended {
            tracing::debug!(key = %key, loaded, "Discarding page for a list that changed");
            return Ok(PageOutcome::Superseded);
        }
        slot.touch();
        slot.notify();
        tracing::debug!(key = %key, pages = loaded + 1, "Appended page");
        Ok(PageOutcome::Appended)
    }
}
