//! The client for the headless content-management API. The API is queried
//! over HTTP: a search endpoint takes a document-type predicate plus optional
//! filter predicates, a field projection, a page size, and an ordering, and
//! returns one page of documents together with an opaque `next_page` cursor
//! URL. Dereferencing the cursor yields the following page.
//!
//! The client is passed explicitly wherever it is needed (the [`ContentApi`]
//! trait) so tests can substitute a scripted implementation instead of
//! talking to the network.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use std::fmt;
use url::Url;

/// A document as returned by the API. `data` holds the custom fields of the
/// document type, projected down to whatever the query's `fetch` clause
/// requested.
#[derive(Clone, Debug, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub uid: Option<String>,

    pub first_publication_date: String,

    pub last_publication_date: String,

    #[serde(default)]
    pub data: serde_json::Value,
}

/// One page of query results. `next_page` is `None` on the last page.
#[derive(Clone, Debug, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub next_page: Option<Url>,

    pub results: Vec<Document>,
}

/// A search query against the API.
pub struct Query {
    pub predicates: Vec<Predicate>,
    pub fetch: Vec<String>,
    pub page_size: usize,
    pub ordering: Option<Ordering>,
}

impl Query {
    /// Starts a query for all documents of the given type.
    pub fn document_type(document_type: &str) -> Query {
        Query {
            predicates: vec![Predicate::At {
                path: "document.type".to_owned(),
                value: document_type.to_owned(),
            }],
            fetch: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
            ordering: None,
        }
    }

    pub fn predicate(mut self, predicate: Predicate) -> Query {
        self.predicates.push(predicate);
        self
    }

    pub fn fetch(mut self, fields: &[&str]) -> Query {
        self.fetch = fields.iter().map(|f| (*f).to_owned()).collect();
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Query {
        self.page_size = page_size;
        self
    }

    pub fn order_by(mut self, path: &str, direction: Direction) -> Query {
        self.ordering = Some(Ordering {
            path: path.to_owned(),
            direction,
        });
        self
    }

    /// Renders the query as a request URL against the given search endpoint
    /// and repository ref.
    pub fn to_url(&self, endpoint: &Url, reference: &str) -> Url {
        let mut url = endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("ref", reference);

            let predicates: Vec<String> =
                self.predicates.iter().map(|p| p.to_string()).collect();
            pairs.append_pair("q", &format!("[{}]", predicates.join("")));

            if !self.fetch.is_empty() {
                pairs.append_pair("fetch", &self.fetch.join(","));
            }
            pairs.append_pair("pageSize", &self.page_size.to_string());
            if let Some(ordering) = &self.ordering {
                pairs.append_pair("orderings", &ordering.to_string());
            }
        }
        url
    }
}

const DEFAULT_PAGE_SIZE: usize = 20;

/// A filter predicate, rendered in the API's bracketed query syntax.
pub enum Predicate {
    /// Field equality, e.g. `[at(document.type, "posts")]`.
    At { path: String, value: String },

    /// Date strictly before the instant, e.g.
    /// `[date.before(document.first_publication_date, 1620036000000)]`.
    DateBefore {
        path: String,
        instant: DateTime<FixedOffset>,
    },

    /// Date strictly after the instant.
    DateAfter {
        path: String,
        instant: DateTime<FixedOffset>,
    },
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Predicate::At { path, value } => {
                write!(f, r#"[at({}, "{}")]"#, path, value)
            }
            Predicate::DateBefore { path, instant } => {
                write!(f, "[date.before({}, {})]", path, instant.timestamp_millis())
            }
            Predicate::DateAfter { path, instant } => {
                write!(f, "[date.after({}, {})]", path, instant.timestamp_millis())
            }
        }
    }
}

pub struct Ordering {
    pub path: String,
    pub direction: Direction,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.direction {
            Direction::Ascending => write!(f, "[{}]", self.path),
            Direction::Descending => write!(f, "[{} desc]", self.path),
        }
    }
}

/// The seam between the rest of the crate and the content API.
pub trait ContentApi {
    /// Runs a search query and returns its first page.
    fn search(&self, query: &Query) -> Result<QueryResponse>;

    /// Fetches the page a pagination cursor points at.
    fn dereference(&self, cursor: &Url) -> Result<QueryResponse>;

    /// Fetches a single document by its unique identifier. When
    /// `preview_ref` is set, the document is resolved against that draft
    /// revision instead of the published master ref.
    fn by_uid(
        &self,
        document_type: &str,
        uid: &str,
        preview_ref: Option<&str>,
    ) -> Result<Document>;
}

/// The HTTP implementation of [`ContentApi`]. Connecting resolves the
/// repository's master ref from the root endpoint; every published query is
/// issued against that ref.
pub struct HttpContentApi {
    search_endpoint: Url,
    master_ref: String,
    http: reqwest::blocking::Client,
}

#[derive(Deserialize)]
struct Repository {
    refs: Vec<Ref>,
}

#[derive(Deserialize)]
struct Ref {
    #[serde(rename = "ref")]
    reference: String,

    #[serde(default, rename = "isMasterRef")]
    is_master: bool,
}

impl HttpContentApi {
    pub fn connect(endpoint: &Url) -> Result<HttpContentApi> {
        let http = reqwest::blocking::Client::new();
        let repository: Repository = http
            .get(endpoint.clone())
            .send()?
            .error_for_status()?
            .json()?;
        let master_ref = repository
            .refs
            .into_iter()
            .find(|r| r.is_master)
            .ok_or(Error::NoMasterRef)?
            .reference;

        // The endpoint may or may not carry a trailing slash; Url::join
        // would drop the last path segment without one.
        let search_endpoint = Url::parse(&format!(
            "{}/documents/search",
            endpoint.as_str().trim_end_matches('/'),
        ))?;

        Ok(HttpContentApi {
            search_endpoint,
            master_ref,
            http,
        })
    }

    fn get(&self, url: Url) -> Result<QueryResponse> {
        log::debug!("content api request: {}", url);
        Ok(self.http.get(url).send()?.error_for_status()?.json()?)
    }
}

impl ContentApi for HttpContentApi {
    fn search(&self, query: &Query) -> Result<QueryResponse> {
        self.get(query.to_url(&self.search_endpoint, &self.master_ref))
    }

    fn dereference(&self, cursor: &Url) -> Result<QueryResponse> {
        self.get(cursor.clone())
    }

    fn by_uid(
        &self,
        document_type: &str,
        uid: &str,
        preview_ref: Option<&str>,
    ) -> Result<Document> {
        let query = Query::document_type(document_type)
            .predicate(Predicate::At {
                path: format!("my.{}.uid", document_type),
                value: uid.to_owned(),
            })
            .page_size(1);
        let reference = preview_ref.unwrap_or(&self.master_ref);
        let response = self.get(query.to_url(&self.search_endpoint, reference))?;
        response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound {
                uid: uid.to_owned(),
            })
    }
}

/// The result of a fallible API operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error talking to the content API.
#[derive(Debug)]
pub enum Error {
    /// An HTTP transport, status, or body-decoding error.
    Http(reqwest::Error),

    /// Returned when a URL cannot be constructed from the configured
    /// endpoint.
    Url(url::ParseError),

    /// Returned when the repository root endpoint lists no master ref.
    NoMasterRef,

    /// Returned when a fetch-by-uid matches no document.
    NotFound { uid: String },

    /// Returned when a dereferenced pagination cursor yields a page with no
    /// results.
    EmptyPage,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Http(err) => err.fmt(f),
            Error::Url(err) => err.fmt(f),
            Error::NoMasterRef => write!(f, "Repository endpoint lists no master ref"),
            Error::NotFound { uid } => write!(f, "No document with uid '{}'", uid),
            Error::EmptyPage => write!(f, "Pagination cursor produced an empty page"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(err) => Some(err),
            Error::Url(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    /// Converts [`reqwest::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator for fallible HTTP operations.
    fn from(err: reqwest::Error) -> Error {
        Error::Http(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts [`url::ParseError`]s into [`Error`]. This allows us to use
    /// the `?` operator when building request URLs.
    fn from(err: url::ParseError) -> Error {
        Error::Url(err)
    }
}
