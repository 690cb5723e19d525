//! Cursor pagination.

use crate::entities::{FeedCursor, FeedPage};

/// A page that knows where the next one starts.
pub trait Paginated {
    type Cursor: Clone + PartialEq + Send + Sync + 'static;

    fn next_cursor(&self) -> Option<Self::Cursor>;
}

impl Paginated for FeedPage {
    type Cursor = FeedCursor;

    fn next_cursor(&self) -> Option<FeedCursor> {
        self.next_cursor.clone()
    }
}
