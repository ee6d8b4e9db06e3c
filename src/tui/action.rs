use crate::client::FetchError;
use crate::feed::PageRequest;
use crate::model::Post;

/// UI → fetch actor
#[derive(Debug)]
pub enum Action {
    FetchPage(PageRequest),
    Quit,
}

/// Fetch actor → UI
#[derive(Debug)]
pub enum AppEvent {
    PageLoaded(PageRequest, Result<Vec<Post>, FetchError>),
}
