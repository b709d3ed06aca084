//! The paginated list accumulator. A [`PostFeed`] holds the ordered sequence
//! of post summaries fetched so far together with the cursor to the next
//! page; [`PostFeed::advance`] consumes the cursor one page at a time. The
//! sequence only ever grows by suffix extension, and a failed advance leaves
//! the feed exactly as it was, so the caller can retry.

use crate::api::{self, ContentApi, QueryResponse};
use crate::post::{self, PostSummary};
use std::fmt;
use url::Url;

/// The accumulated post list and its pagination cursor.
pub struct PostFeed {
    cursor: Option<Url>,
    posts: Vec<PostSummary>,
}

/// The outcome of a successful [`PostFeed::advance`] call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Advance {
    /// One summary was appended and the cursor moved forward.
    Appended,

    /// The cursor was already exhausted; nothing changed. Exhaustion is a
    /// terminal state, not an error.
    Exhausted,
}

impl PostFeed {
    /// Seeds the feed from the initial search response: every result on the
    /// first page, in result order, plus the page's cursor.
    pub fn from_response(response: &QueryResponse) -> post::Result<PostFeed> {
        let posts = response
            .results
            .iter()
            .map(PostSummary::from_document)
            .collect::<post::Result<Vec<PostSummary>>>()?;
        Ok(PostFeed {
            cursor: response.next_page.clone(),
            posts,
        })
    }

    /// The summaries accumulated so far, in fetch order.
    pub fn posts(&self) -> &[PostSummary] {
        &self.posts
    }

    /// The cursor to the next page, or `None` once the feed is exhausted.
    pub fn cursor(&self) -> Option<&Url> {
        self.cursor.as_ref()
    }

    /// Dereferences the cursor, appends the next page's first result as a
    /// [`PostSummary`], and replaces the cursor with the new one (possibly
    /// `None`). On failure the feed is untouched and the call can simply be
    /// repeated.
    pub fn advance(&mut self, api: &dyn ContentApi) -> Result<Advance> {
        let cursor = match &self.cursor {
            None => return Ok(Advance::Exhausted),
            Some(cursor) => cursor,
        };

        let page = api.dereference(cursor)?;
        let first = page.results.first().ok_or(api::Error::EmptyPage)?;
        let summary = PostSummary::from_document(first)?;

        // All fallible work is done; mutate only now so an error above
        // cannot leave the feed half-updated.
        self.posts.push(summary);
        self.cursor = page.next_page;
        Ok(Advance::Appended)
    }
}

/// The result of a fallible pagination operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failed pagination advance.
#[derive(Debug)]
pub enum Error {
    /// Returned when dereferencing the cursor fails.
    Api(api::Error),

    /// Returned when the fetched page's first result cannot be projected
    /// into a summary.
    Summary(post::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Api(err) => err.fmt(f),
            Error::Summary(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Api(err) => Some(err),
            Error::Summary(err) => Some(err),
        }
    }
}

impl From<api::Error> for Error {
    /// Converts [`api::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator when dereferencing cursors.
    fn from(err: api::Error) -> Error {
        Error::Api(err)
    }
}

impl From<post::Error> for Error {
    /// Converts [`post::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator when projecting page results.
    fn from(err: post::Error) -> Error {
        Error::Summary(err)
    }
}
