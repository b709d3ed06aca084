//! Support for creating an Atom feed from the assembled posts.

use crate::config::Author;
use crate::post::RenderablePost;
use atom_syndication::{Entry, Error as AtomError, Feed, Link, Person};
use chrono::{FixedOffset, TimeZone, Utc};
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use url::Url;

/// Bundled configuration for creating a feed.
pub struct FeedConfig {
    pub title: String,
    pub id: String,
    pub author: Option<Author>,
    pub home_page: Url,

    /// The base URL for post pages, used for entry ids and links.
    pub posts_base_url: Url,
}

/// Creates a feed from some configuration ([`FeedConfig`]) and a list of
/// posts and writes the result to a [`std::io::Write`]. This function takes
/// ownership of the provided [`FeedConfig`].
pub fn write_feed<W: Write>(config: FeedConfig, posts: &[RenderablePost], w: W) -> Result<()> {
    feed(config, posts)?.write_to(w)?;
    Ok(())
}

fn feed(config: FeedConfig, posts: &[RenderablePost]) -> Result<Feed> {
    Ok(Feed {
        entries: feed_entries(&config, posts)?,
        title: config.title,
        id: config.id,
        updated: FixedOffset::east(0).from_utc_datetime(&Utc::now().naive_utc()),
        authors: author_to_people(config.author),
        categories: Vec::new(),
        contributors: Vec::new(),
        generator: None,
        icon: None,
        logo: None,
        rights: None,
        subtitle: None,
        extensions: HashMap::new(),
        namespaces: HashMap::new(),
        links: vec![Link {
            href: config.home_page.to_string(),
            rel: "alternate".to_string(),
            title: None,
            hreflang: None,
            mime_type: None,
            length: None,
        }],
    })
}

fn feed_entries(config: &FeedConfig, posts: &[RenderablePost]) -> Result<Vec<Entry>> {
    let mut entries: Vec<Entry> = Vec::with_capacity(posts.len());

    for post in posts {
        let url = config
            .posts_base_url
            .join(&format!("{}.html", post.uid))?;

        entries.push(Entry {
            id: url.to_string(),
            title: post.title.clone(),
            updated: post.edited,
            authors: author_to_people(config.author.clone()),
            links: vec![Link {
                href: url.to_string(),
                rel: "alternate".to_owned(),
                title: None,
                mime_type: None,
                hreflang: None,
                length: None,
            }],
            rights: None,
            summary: Some(post.subtitle.clone()),
            categories: Vec::new(),
            contributors: Vec::new(),
            published: Some(post.published),
            source: None,
            content: None,
            extensions: HashMap::new(),
        })
    }
    Ok(entries)
}

fn author_to_people(author: Option<Author>) -> Vec<Person> {
    match author {
        Some(author) => vec![Person {
            name: author.name,
            email: author.email,
            uri: None,
        }],
        None => Vec::new(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is a generic I/O error.
    Io(std::io::Error),

    /// Returned when there is an Atom-related error.
    Atom(AtomError),

    /// Returned when an entry URL cannot be built.
    Url(url::ParseError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Atom(err) => err.fmt(f),
            Error::Url(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Atom(err) => Some(err),
            Error::Url(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator in fallible feed operations.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<AtomError> for Error {
    /// Converts [`AtomError`]s into [`Error`]. This allows us to use the `?`
    /// operator in fallible feed operations.
    fn from(err: AtomError) -> Error {
        Error::Atom(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts [`url::ParseError`]s into [`Error`]. This allows us to use
    /// the `?` operator when building entry URLs.
    fn from(err: url::ParseError) -> Error {
        Error::Url(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::parse_timestamp;

    fn post(uid: &str, title: &str) -> RenderablePost {
        RenderablePost {
            uid: uid.to_owned(),
            title: title.to_owned(),
            subtitle: "a subtitle".to_owned(),
            author: "Paloma".to_owned(),
            banner_url: String::new(),
            published: parse_timestamp("2021-05-03T10:00:00Z").unwrap(),
            edited: parse_timestamp("2021-05-04T10:00:00Z").unwrap(),
            publication_date: "3 mai 2021".to_owned(),
            last_edited: "4 mai 2021, 10:00".to_owned(),
            reading_time: 1,
            content: Vec::new(),
            previous: None,
            next: None,
            preview: false,
        }
    }

    #[test]
    fn test_feed_entries() -> Result<()> {
        let config = FeedConfig {
            title: "spacetraveling".to_owned(),
            id: "https://example.org/".to_owned(),
            author: Some(Author {
                name: "Paloma".to_owned(),
                email: None,
            }),
            home_page: Url::parse("https://example.org/").unwrap(),
            posts_base_url: Url::parse("https://example.org/post/").unwrap(),
        };
        let posts = vec![post("first-post", "First post"), post("second", "Second")];
        let feed = feed(config, &posts)?;

        assert_eq!(feed.entries.len(), 2);
        assert_eq!(feed.entries[0].title, "First post");
        assert_eq!(feed.entries[0].id, "https://example.org/post/first-post.html");
        assert_eq!(feed.entries[0].summary.as_deref(), Some("a subtitle"));
        assert_eq!(feed.authors[0].name, "Paloma");
        Ok(())
    }
}
