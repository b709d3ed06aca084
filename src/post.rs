//! The post data model and the single-post assembly step: projecting API
//! [`Document`]s into [`PostSummary`]s for the index pages and into
//! [`RenderablePost`]s (formatted dates, estimated reading time, rendered
//! body, chronological neighbors) for the post pages.

use crate::api::{self, ContentApi, Direction, Document, Predicate, Query};
use crate::richtext;
use chrono::{DateTime, FixedOffset, Locale};
use serde::Deserialize;
use std::fmt;

/// The document type under which posts live in the content repository.
pub const DOCUMENT_TYPE: &str = "posts";

/// The ordering path for chronological queries.
const PUBLICATION_DATE_PATH: &str = "document.first_publication_date";

/// Assumed reading speed for the estimated reading time.
const WORDS_PER_MINUTE: usize = 200;

/// Dates are rendered with a fixed pattern under a fixed locale; the
/// last-edited stamp additionally carries hour and minute.
const DATE_LOCALE: Locale = Locale::pt_BR;
const DATE_PATTERN: &str = "%-d %b %Y";
const DATE_TIME_PATTERN: &str = "%-d %b %Y, %H:%M";

/// A post as it appears in the paginated index: display fields only.
#[derive(Clone, Debug, PartialEq)]
pub struct PostSummary {
    pub uid: String,

    /// The raw publication instant, kept for feed generation.
    pub published: DateTime<FixedOffset>,

    /// The publication date, already formatted for display.
    pub publication_date: String,

    pub title: String,
    pub subtitle: String,
    pub author: String,
}

#[derive(Deserialize)]
struct SummaryData {
    title: String,

    #[serde(default)]
    subtitle: String,

    author: String,
}

impl PostSummary {
    /// Projects an API [`Document`] into a [`PostSummary`]. The document
    /// must carry a uid and the summary fields in `data`.
    pub fn from_document(document: &Document) -> Result<PostSummary> {
        let uid = document.uid.clone().ok_or(Error::MissingUid)?;
        let data: SummaryData = serde_json::from_value(document.data.clone())?;
        let published = parse_timestamp(&document.first_publication_date)?;
        Ok(PostSummary {
            uid,
            publication_date: format_publication_date(&published),
            published,
            title: data.title,
            subtitle: data.subtitle,
            author: data.author,
        })
    }
}

/// A full post document, with its content blocks still in rich-text form.
#[derive(Clone, Debug)]
pub struct PostDocument {
    pub uid: String,
    pub published: DateTime<FixedOffset>,
    pub edited: DateTime<FixedOffset>,
    pub title: String,
    pub subtitle: String,
    pub banner_url: String,
    pub author: String,
    pub content: Vec<ContentBlock>,
}

/// One section of a post: a heading and a rich-text body.
#[derive(Clone, Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(default)]
    pub heading: String,

    #[serde(default)]
    pub body: Vec<richtext::Block>,
}

#[derive(Deserialize)]
struct PostData {
    title: String,

    #[serde(default)]
    subtitle: String,

    author: String,

    #[serde(default)]
    banner: Banner,

    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Default, Deserialize)]
struct Banner {
    #[serde(default)]
    url: String,
}

impl PostDocument {
    pub fn from_document(document: &Document) -> Result<PostDocument> {
        let uid = document.uid.clone().ok_or(Error::MissingUid)?;
        let data: PostData = serde_json::from_value(document.data.clone())?;
        Ok(PostDocument {
            uid,
            published: parse_timestamp(&document.first_publication_date)?,
            edited: parse_timestamp(&document.last_publication_date)?,
            title: data.title,
            subtitle: data.subtitle,
            banner_url: data.banner.url,
            author: data.author,
            content: data.content,
        })
    }
}

/// The chronologically adjacent post, when one exists. Absence is a valid
/// terminal case (the newest and oldest posts each lack one neighbor) and
/// renders as an inert placeholder rather than a link.
#[derive(Clone, Debug, PartialEq)]
pub struct NavigationNeighbor {
    pub uid: String,
    pub title: String,
}

#[derive(Deserialize)]
struct TitleData {
    title: String,
}

impl NavigationNeighbor {
    fn from_document(document: &Document) -> Result<NavigationNeighbor> {
        let uid = document.uid.clone().ok_or(Error::MissingUid)?;
        let data: TitleData = serde_json::from_value(document.data.clone())?;
        Ok(NavigationNeighbor {
            uid,
            title: data.title,
        })
    }
}

/// A post with every display field derived, ready for templating.
#[derive(Clone, Debug)]
pub struct RenderablePost {
    pub uid: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner_url: String,

    pub published: DateTime<FixedOffset>,
    pub edited: DateTime<FixedOffset>,
    pub publication_date: String,
    pub last_edited: String,

    /// Estimated reading time in whole minutes.
    pub reading_time: u32,

    pub content: Vec<RenderedBlock>,

    pub previous: Option<NavigationNeighbor>,
    pub next: Option<NavigationNeighbor>,

    /// Whether the page is being generated against a draft revision. Passed
    /// through to the template so it can show an exit-preview affordance.
    pub preview: bool,
}

/// A content section with its body rendered to HTML.
#[derive(Clone, Debug)]
pub struct RenderedBlock {
    pub heading: String,
    pub body: String,
}

/// Derives all display fields for a post. Pure: neighbor lookup happens
/// beforehand (see [`resolve_neighbors`]) and the results are passed in.
pub fn assemble(
    document: &PostDocument,
    previous: Option<NavigationNeighbor>,
    next: Option<NavigationNeighbor>,
    preview: bool,
) -> RenderablePost {
    RenderablePost {
        uid: document.uid.clone(),
        title: document.title.clone(),
        subtitle: document.subtitle.clone(),
        author: document.author.clone(),
        banner_url: document.banner_url.clone(),
        published: document.published,
        edited: document.edited,
        publication_date: format_publication_date(&document.published),
        last_edited: format_last_edited(&document.edited),
        reading_time: reading_time(&document.content),
        content: document
            .content
            .iter()
            .map(|block| RenderedBlock {
                heading: block.heading.clone(),
                body: richtext::render_html(&block.body),
            })
            .collect(),
        previous,
        next,
        preview,
    }
}

/// Estimates the reading time in minutes: whitespace-delimited tokens of
/// each block's heading plus its body text, summed over all blocks, at 200
/// words per minute, rounded up. A post with no content blocks reads in 0
/// minutes.
pub fn reading_time(content: &[ContentBlock]) -> u32 {
    let words: usize = content
        .iter()
        .map(|block| {
            block.heading.split_whitespace().count()
                + richtext::plain_text(&block.body).split_whitespace().count()
        })
        .sum();
    ((words + WORDS_PER_MINUTE - 1) / WORDS_PER_MINUTE) as u32
}

/// Looks up the chronological neighbors of a post: each side is an
/// independent single-result query ordered by publication date, bounded by
/// the post's own publication instant. A missing neighbor is `None`, not an
/// error.
pub fn resolve_neighbors(
    api: &dyn ContentApi,
    document: &PostDocument,
) -> Result<(Option<NavigationNeighbor>, Option<NavigationNeighbor>)> {
    let previous = neighbor(api, document, Direction::Descending)?;
    let next = neighbor(api, document, Direction::Ascending)?;
    Ok((previous, next))
}

fn neighbor(
    api: &dyn ContentApi,
    document: &PostDocument,
    direction: Direction,
) -> Result<Option<NavigationNeighbor>> {
    let bound = match direction {
        Direction::Ascending => Predicate::DateAfter {
            path: PUBLICATION_DATE_PATH.to_owned(),
            instant: document.published,
        },
        Direction::Descending => Predicate::DateBefore {
            path: PUBLICATION_DATE_PATH.to_owned(),
            instant: document.published,
        },
    };
    let query = Query::document_type(DOCUMENT_TYPE)
        .predicate(bound)
        .fetch(&["posts.title"])
        .page_size(1)
        .order_by(PUBLICATION_DATE_PATH, direction);
    let response = api.search(&query)?;
    match response.results.first() {
        None => Ok(None),
        Some(doc) => Ok(Some(NavigationNeighbor::from_document(doc)?)),
    }
}

/// Parses an API timestamp. The API emits both RFC 3339 (`...Z`) and the
/// offset-without-colon form (`...+0000`), so both are accepted.
pub fn parse_timestamp(
    input: &str,
) -> std::result::Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(input)
        .or_else(|_| DateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%z"))
}

/// Formats a publication instant for display, e.g. `3 mai 2021`.
pub fn format_publication_date(instant: &DateTime<FixedOffset>) -> String {
    instant.format_localized(DATE_PATTERN, DATE_LOCALE).to_string()
}

/// Formats a last-edited instant for display, including the time of day.
pub fn format_last_edited(instant: &DateTime<FixedOffset>) -> String {
    instant
        .format_localized(DATE_TIME_PATTERN, DATE_LOCALE)
        .to_string()
}

/// The result of a fallible post projection or neighbor lookup.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem turning an API document into a post.
#[derive(Debug)]
pub enum Error {
    /// Returned when a document lacks the uid that addresses its page.
    MissingUid,

    /// Returned when a document's `data` is missing expected fields or has
    /// the wrong shape.
    Decode(serde_json::Error),

    /// Returned when a publication timestamp cannot be parsed.
    Date(chrono::ParseError),

    /// Returned when a neighbor lookup fails at the API.
    Api(api::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingUid => write!(f, "Document has no uid"),
            Error::Decode(err) => err.fmt(f),
            Error::Date(err) => err.fmt(f),
            Error::Api(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MissingUid => None,
            Error::Decode(err) => Some(err),
            Error::Date(err) => Some(err),
            Error::Api(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for Error {
    /// Converts [`serde_json::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator when projecting document data.
    fn from(err: serde_json::Error) -> Error {
        Error::Decode(err)
    }
}

impl From<chrono::ParseError> for Error {
    /// Converts [`chrono::ParseError`]s into [`Error`]. This allows us to
    /// use the `?` operator when parsing timestamps.
    fn from(err: chrono::ParseError) -> Error {
        Error::Date(err)
    }
}

impl From<api::Error> for Error {
    /// Converts [`api::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator in neighbor lookups.
    fn from(err: api::Error) -> Error {
        Error::Api(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::QueryResponse;
    use serde_json::json;

    fn block(heading: &str, body_text: &str) -> ContentBlock {
        ContentBlock {
            heading: heading.to_owned(),
            body: vec![richtext::Block {
                kind: richtext::BlockKind::Paragraph,
                text: body_text.to_owned(),
                spans: Vec::new(),
                url: None,
                alt: None,
            }],
        }
    }

    #[test]
    fn test_reading_time_single_block() {
        // 2 heading tokens + 3 body tokens = 5 words; ceil(5 / 200) = 1.
        assert_eq!(reading_time(&[block("A B", "C D E")]), 1);
    }

    #[test]
    fn test_reading_time_empty_content() {
        assert_eq!(reading_time(&[]), 0);
    }

    #[test]
    fn test_reading_time_rounds_up() {
        let words: Vec<String> = (0..201).map(|i| format!("w{}", i)).collect();
        assert_eq!(reading_time(&[block("", &words.join(" "))]), 2);
    }

    #[test]
    fn test_parse_timestamp_accepts_both_offsets() {
        let rfc3339 = parse_timestamp("2021-05-03T10:00:00Z").unwrap();
        let compact = parse_timestamp("2021-05-03T10:00:00+0000").unwrap();
        assert_eq!(rfc3339, compact);
    }

    #[test]
    fn test_format_publication_date() {
        let instant = parse_timestamp("2021-05-03T10:00:00Z").unwrap();
        assert_eq!(format_publication_date(&instant), "3 mai 2021");
        // Determinism: same instant, same rendering.
        assert_eq!(
            format_publication_date(&instant),
            format_publication_date(&instant),
        );
    }

    #[test]
    fn test_format_last_edited_includes_time() {
        let instant = parse_timestamp("2021-05-03T10:00:00Z").unwrap();
        assert_eq!(format_last_edited(&instant), "3 mai 2021, 10:00");
    }

    fn document(uid: &str, published: &str, data: serde_json::Value) -> Document {
        Document {
            uid: Some(uid.to_owned()),
            first_publication_date: published.to_owned(),
            last_publication_date: published.to_owned(),
            data,
        }
    }

    #[test]
    fn test_summary_from_document() {
        let summary = PostSummary::from_document(&document(
            "first-post",
            "2021-05-03T10:00:00Z",
            json!({
                "title": "First post",
                "subtitle": "On beginnings",
                "author": "Paloma",
            }),
        ))
        .unwrap();
        assert_eq!(summary.uid, "first-post");
        assert_eq!(summary.publication_date, "3 mai 2021");
        assert_eq!(summary.author, "Paloma");
    }

    #[test]
    fn test_summary_requires_uid() {
        let mut doc = document("x", "2021-05-03T10:00:00Z", json!({}));
        doc.uid = None;
        assert!(matches!(
            PostSummary::from_document(&doc),
            Err(Error::MissingUid)
        ));
    }

    #[test]
    fn test_assemble() {
        let doc = PostDocument {
            uid: "first-post".to_owned(),
            published: parse_timestamp("2021-05-03T10:00:00Z").unwrap(),
            edited: parse_timestamp("2021-05-04T15:30:00Z").unwrap(),
            title: "First post".to_owned(),
            subtitle: "On beginnings".to_owned(),
            banner_url: "https://example.org/banner.png".to_owned(),
            author: "Paloma".to_owned(),
            content: vec![block("A B", "C D E")],
        };
        let post = assemble(
            &doc,
            None,
            Some(NavigationNeighbor {
                uid: "second-post".to_owned(),
                title: "Second post".to_owned(),
            }),
            true,
        );
        assert_eq!(post.reading_time, 1);
        assert_eq!(post.publication_date, "3 mai 2021");
        assert_eq!(post.last_edited, "4 mai 2021, 15:30");
        assert_eq!(post.content[0].body, "<p>C D E</p>");
        assert!(post.previous.is_none());
        assert_eq!(post.next.unwrap().uid, "second-post");
        assert!(post.preview);
    }

    /// A scripted API with three posts published at t1 < t2 < t3, answering
    /// neighbor queries by their date bound.
    struct ThreePosts;

    impl ThreePosts {
        fn titled(uid: &str, published: &str) -> Document {
            document(uid, published, json!({ "title": uid }))
        }

        fn all() -> Vec<Document> {
            vec![
                Self::titled("t1", "2021-01-01T00:00:00Z"),
                Self::titled("t2", "2021-02-01T00:00:00Z"),
                Self::titled("t3", "2021-03-01T00:00:00Z"),
            ]
        }
    }

    impl ContentApi for ThreePosts {
        fn search(&self, query: &Query) -> api::Result<QueryResponse> {
            let mut candidates: Vec<Document> = Vec::new();
            for doc in Self::all() {
                let published = parse_timestamp(&doc.first_publication_date).unwrap();
                let keep = query.predicates.iter().all(|p| match p {
                    Predicate::At { .. } => true,
                    Predicate::DateBefore { instant, .. } => published < *instant,
                    Predicate::DateAfter { instant, .. } => published > *instant,
                });
                if keep {
                    candidates.push(doc);
                }
            }
            if let Some(ordering) = &query.ordering {
                candidates.sort_by_key(|d| parse_timestamp(&d.first_publication_date).unwrap());
                if ordering.direction == Direction::Descending {
                    candidates.reverse();
                }
            }
            candidates.truncate(query.page_size);
            Ok(QueryResponse {
                next_page: None,
                results: candidates,
            })
        }

        fn dereference(&self, _cursor: &url::Url) -> api::Result<QueryResponse> {
            unimplemented!("neighbor lookups never paginate")
        }

        fn by_uid(
            &self,
            _document_type: &str,
            uid: &str,
            _preview_ref: Option<&str>,
        ) -> api::Result<Document> {
            Self::all()
                .into_iter()
                .find(|d| d.uid.as_deref() == Some(uid))
                .ok_or(api::Error::NotFound {
                    uid: uid.to_owned(),
                })
        }
    }

    fn post_document(api: &ThreePosts, uid: &str) -> PostDocument {
        let doc = api.by_uid(DOCUMENT_TYPE, uid, None).unwrap();
        PostDocument {
            uid: uid.to_owned(),
            published: parse_timestamp(&doc.first_publication_date).unwrap(),
            edited: parse_timestamp(&doc.last_publication_date).unwrap(),
            title: uid.to_owned(),
            subtitle: String::new(),
            banner_url: String::new(),
            author: String::new(),
            content: Vec::new(),
        }
    }

    #[test]
    fn test_neighbors_of_middle_post() {
        let api = ThreePosts;
        let (previous, next) = resolve_neighbors(&api, &post_document(&api, "t2")).unwrap();
        assert_eq!(previous.unwrap().uid, "t1");
        assert_eq!(next.unwrap().uid, "t3");
    }

    #[test]
    fn test_newest_post_has_no_next_neighbor() {
        let api = ThreePosts;
        let (previous, next) = resolve_neighbors(&api, &post_document(&api, "t3")).unwrap();
        assert_eq!(previous.unwrap().uid, "t2");
        assert!(next.is_none());
    }

    #[test]
    fn test_oldest_post_has_no_previous_neighbor() {
        let api = ThreePosts;
        let (previous, next) = resolve_neighbors(&api, &post_document(&api, "t1")).unwrap();
        assert!(previous.is_none());
        assert_eq!(next.unwrap().uid, "t2");
    }
}
