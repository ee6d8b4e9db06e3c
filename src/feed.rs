use crate::client::{FetchError, POSTS_PER_PAGE, PostSource};
use crate::model::Post;
use tracing::{debug, warn};

/// A page the feed has committed to loading. The caller performs the fetch
/// and hands the outcome back through [`Feed::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading(PageRequest),
    /// The request failed; only `retry` or `reload` leave this state.
    Errored {
        request: PageRequest,
        message: String,
    },
}

/// What to show below the last post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Footer {
    Loading,
    Error,
    /// Nothing loaded matches the current search.
    NoResults,
    /// More pages exist; the sentinel is armed.
    More,
    /// Every page has been loaded.
    End,
}

/// Infinite-scroll state for the post feed.
///
/// At most one page request is outstanding at a time: new requests are only
/// issued from `Idle`, and a response is applied only if it answers the
/// request currently in flight.
#[derive(Debug)]
pub struct Feed {
    page: u32,
    page_size: u32,
    posts: Vec<Post>,
    query: String,
    filtered: Vec<usize>,
    phase: Phase,
    has_more: bool,
}

impl Default for Feed {
    fn default() -> Self {
        Self::new()
    }
}

impl Feed {
    pub fn new() -> Self {
        Self::with_page_size(POSTS_PER_PAGE)
    }

    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size,
            posts: Vec::new(),
            query: String::new(),
            filtered: Vec::new(),
            phase: Phase::Idle,
            has_more: true,
        }
    }

    /// Eager first load. Returns `None` once anything has been requested.
    pub fn activate(&mut self) -> Option<PageRequest> {
        if self.page == 1 && self.posts.is_empty() && self.phase == Phase::Idle {
            Some(self.begin())
        } else {
            None
        }
    }

    /// The sentinel below the list became visible.
    pub fn on_sentinel_visible(&mut self) -> Option<PageRequest> {
        if should_fetch(&self.phase, self.has_more) {
            Some(self.begin())
        } else {
            None
        }
    }

    /// Re-issues the failed request. No-op unless the feed is `Errored`.
    pub fn retry(&mut self) -> Option<PageRequest> {
        let Phase::Errored { request, .. } = self.phase else {
            return None;
        };
        debug!(page = request.page, "retrying posts page");
        self.phase = Phase::Loading(request);
        Some(request)
    }

    /// Drops everything loaded so far and starts again from page 1. The
    /// search query is kept.
    pub fn reload(&mut self) -> PageRequest {
        self.page = 1;
        self.posts.clear();
        self.filtered.clear();
        self.has_more = true;
        self.phase = Phase::Idle;
        self.begin()
    }

    /// Applies the outcome of `request`. Responses that do not answer the
    /// in-flight request are discarded and `false` is returned.
    pub fn apply(&mut self, request: PageRequest, result: Result<Vec<Post>, FetchError>) -> bool {
        if self.phase != Phase::Loading(request) {
            warn!(page = request.page, "discarding stale posts response");
            return false;
        }
        match result {
            Ok(posts) => {
                self.has_more = posts.len() == self.page_size as usize;
                debug!(
                    page = request.page,
                    count = posts.len(),
                    has_more = self.has_more,
                    "posts page applied"
                );
                self.posts.extend(posts);
                self.page = request.page + 1;
                self.phase = Phase::Idle;
                compute_filtered(&mut self.filtered, &self.posts, &self.query);
            }
            Err(e) => {
                warn!(page = request.page, error = %e, "posts page failed");
                self.phase = Phase::Errored {
                    request,
                    message: e.to_string(),
                };
            }
        }
        true
    }

    /// Filters already-loaded posts. Never fetches or resets paging.
    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        compute_filtered(&mut self.filtered, &self.posts, &self.query);
    }

    pub fn search_query(&self) -> &str {
        &self.query
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn filtered_posts(&self) -> impl Iterator<Item = &Post> + '_ {
        self.filtered.iter().map(|&i| &self.posts[i])
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn filtered_post(&self, index: usize) -> Option<&Post> {
        self.filtered.get(index).map(|&i| &self.posts[i])
    }

    /// The next page the sentinel would request.
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading(_))
    }

    pub fn error(&self) -> Option<&str> {
        match &self.phase {
            Phase::Errored { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }

    /// Whether a sentinel signal would currently start a request.
    pub fn sentinel_armed(&self) -> bool {
        should_fetch(&self.phase, self.has_more)
    }

    pub fn footer(&self) -> Footer {
        match self.phase {
            Phase::Errored { .. } => Footer::Error,
            Phase::Loading(_) => Footer::Loading,
            Phase::Idle if self.filtered.is_empty() => Footer::NoResults,
            Phase::Idle if self.has_more => Footer::More,
            Phase::Idle => Footer::End,
        }
    }

    fn begin(&mut self) -> PageRequest {
        let request = PageRequest {
            page: self.page,
            limit: self.page_size,
        };
        debug!(page = request.page, "requesting posts page");
        self.phase = Phase::Loading(request);
        request
    }
}

/// Decides whether a viewport signal may start a fetch.
pub fn should_fetch(phase: &Phase, has_more: bool) -> bool {
    *phase == Phase::Idle && has_more
}

/// Recomputes `filtered` as the indices of posts whose title or body contains
/// `query`, case-insensitively, in load order. An empty query keeps all.
pub fn compute_filtered(filtered: &mut Vec<usize>, posts: &[Post], query: &str) {
    let needle = query.to_lowercase();
    filtered.clear();
    filtered.extend(
        posts
            .iter()
            .enumerate()
            .filter(|(_, p)| p.matches_lowercase(&needle))
            .map(|(i, _)| i),
    );
}

/// Performs `request` against `source` and applies the outcome to `feed`.
pub async fn drive<S: PostSource>(feed: &mut Feed, source: &S, request: PageRequest) -> bool {
    let result = source.fetch_page(request.page, request.limit).await;
    feed.apply(request, result)
}
