use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use lockerroom_cache::{
    CacheRead, InfiniteData, PageOutcome, QueryClient, QueryOptions, Subscription,
};
use lockerroom_core::{
    FeedCursor, FeedPage, FieldError, LockerRoomApi, LockerRoomError, LockerRoomResult, MediaPost,
    NewPost, PostId,
};

use crate::keys;

/// Every loaded feed page, newest first.
pub type FeedData = InfiniteData<FeedPage>;

#[derive(Clone)]
pub struct FeedService {
    api: Arc<dyn LockerRoomApi>,
    client: QueryClient,
}

impl FeedService {
    pub fn new(api: Arc<dyn LockerRoomApi>, client: QueryClient) -> Self {
        Self { api, client }
    }

    fn options(&self) -> QueryOptions {
        self.client.config().query_options()
    }

    /// Fetcher for the first page. Refetching through it resets the list.
    fn first_page(
        &self,
    ) -> impl Fn() -> BoxFuture<'static, LockerRoomResult<FeedData>> + Send + Sync + 'static {
        let api = self.api.clone();
        move || {
            let api = api.clone();
            async move { api.feed_page(None).await.map(InfiniteData::first) }.boxed()
        }
    }

    /// The cached feed, loading the newest page if nothing fresh is cached.
    pub async fn load_first_page(&self) -> LockerRoomResult<FeedData> {
        self.client
            .fetch_query(keys::feed(), self.options(), self.first_page())
            .await
            .map(CacheRead::into_value)
    }

    /// Append the page after the last loaded one.
    pub async fn load_next_page(&self) -> LockerRoomResult<PageOutcome> {
        let api = self.api.clone();
        self.client
            .fetch_next_page::<FeedPage, _, _>(&keys::feed(), move |cursor: FeedCursor| {
                let api = api.clone();
                async move { api.feed_page(Some(&cursor)).await }
            })
            .await
    }

    /// Drop extra pages and reload the newest one.
    pub async fn refresh(&self) -> LockerRoomResult<()> {
        self.client.refetch(&keys::feed()).await
    }

    pub fn watch(&self) -> Subscription<FeedData> {
        self.client
            .subscribe(keys::feed(), self.options(), self.first_page())
    }

    /// A post from whatever pages are cached.
    pub fn cached_post(&self, post_id: PostId) -> LockerRoomResult<Option<MediaPost>> {
        let feed = self.client.get_query_data::<FeedData>(&keys::feed())?;
        Ok(feed.and_then(|feed| {
            feed.pages
                .iter()
                .flat_map(|page| page.posts.iter())
                .find(|post| post.id == post_id)
                .cloned()
        }))
    }

    pub async fn create_post(&self, post: NewPost) -> LockerRoomResult<MediaPost> {
        if post.caption.trim().is_empty() && post.media.is_empty() {
            return Err(LockerRoomError::validation(
                "Add a caption or some media",
                vec![FieldError::new("caption", "Add a caption or some media")],
            ));
        }
        let key = keys::feed();
        let created = self
            .client
            .mutation::<MediaPost>("create_post")
            .reconcile_with::<FeedData, _>(key.clone(), |before, created| {
                before.map(|feed| prepend(feed, created))
            })
            .invalidates(key)
            .execute(self.api.create_post(&post))
            .await?;
        tracing::info!(post_id = %created.id, "Post created");
        Ok(created)
    }

    /// Flip the actor's like. Every cached copy of the post flips at once.
    pub async fn toggle_like(&self, post_id: PostId) -> LockerRoomResult<MediaPost> {
        let key = keys::feed();
        self.client
            .mutation::<MediaPost>("toggle_like")
            .optimistic::<FeedData, _>(key.clone(), move |feed| {
                feed.map(|feed| map_post(feed, post_id, MediaPost::with_like_toggled))
            })
            .reconcile_with::<FeedData, _>(key, |before, server| {
                before.map(|feed| map_post(feed, server.id, |_| server.clone()))
            })
            .execute(self.api.toggle_like(post_id))
            .await
    }

    pub async fn delete_post(&self, post_id: PostId) -> LockerRoomResult<()> {
        self.client
            .mutation::<()>("delete_post")
            .optimistic::<FeedData, _>(keys::feed(), move |feed| {
                feed.map(|feed| remove_post(feed, post_id))
            })
            .execute(self.api.delete_post(post_id))
            .await
    }
}

fn map_post<F>(feed: &FeedData, post_id: PostId, f: F) -> FeedData
where
    F: Fn(&MediaPost) -> MediaPost,
{
    feed.map_pages(|page| FeedPage {
        posts: page
            .posts
            .iter()
            .map(|post| if post.id == post_id { f(post) } else { post.clone() })
            .collect(),
        next_cursor: page.next_cursor.clone(),
    })
}

fn remove_post(feed: &FeedData, post_id: PostId) -> FeedData {
    feed.map_pages(|page| FeedPage {
        posts: page.posts.iter().filter(|p| p.id != post_id).cloned().collect(),
        next_cursor: page.next_cursor.clone(),
    })
}

fn prepend(feed: &FeedData, post: &MediaPost) -> FeedData {
    let mut next = feed.clone();
    if let Some(first) = next.pages.first_mut() {
        if !first.posts.iter().any(|p| p.id == post.id) {
            first.posts.insert(0, post.clone());
        }
    }
    next
}
