//! Exports the [`build_site`] function which stitches together the
//! high-level steps of building the output site: seeding the post feed from
//! the content API and draining its pagination ([`crate::pagination`]),
//! fetching and assembling each full post ([`crate::post`]), rendering index
//! and post pages ([`crate::write`]), and generating the Atom feed.

use crate::api::{ContentApi, Direction, Error as ApiError, Query};
use crate::config::Config;
use crate::feed::{write_feed, Error as FeedError, FeedConfig};
use crate::pagination::{Advance, Error as PaginationError, PostFeed};
use crate::post::{
    assemble, resolve_neighbors, Error as PostError, PostDocument, RenderablePost, DOCUMENT_TYPE,
};
use crate::write::{Error as WriteError, Writer};
use gtmpl::Template;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// The fields the index needs from each post document.
const SUMMARY_FIELDS: [&str; 3] = ["posts.title", "posts.subtitle", "posts.author"];

/// Builds the site from a [`Config`] object and a [`ContentApi`] client.
pub fn build_site(config: &Config, api: &dyn ContentApi) -> Result<()> {
    // Seed the post feed from the first page of results, then drain the
    // pagination cursor one page at a time.
    let initial = api.search(
        &Query::document_type(DOCUMENT_TYPE)
            .fetch(&SUMMARY_FIELDS)
            .page_size(config.api_page_size)
            .order_by("document.first_publication_date", Direction::Descending),
    )?;
    let mut feed = PostFeed::from_response(&initial)?;
    while feed.advance(api)? == Advance::Appended {}
    log::info!("fetched {} post summaries", feed.posts().len());

    // Fetch each full document and derive its display fields. Preview
    // builds resolve documents against the draft revision.
    let preview_ref = config.preview_ref.as_deref();
    let mut posts: Vec<RenderablePost> = Vec::with_capacity(feed.posts().len());
    for summary in feed.posts() {
        let document = api.by_uid(DOCUMENT_TYPE, &summary.uid, preview_ref)?;
        let document = PostDocument::from_document(&document)?;
        let (previous, next) = resolve_neighbors(api, &document)?;
        log::debug!("assembled post '{}'", document.uid);
        posts.push(assemble(&document, previous, next, preview_ref.is_some()));
    }

    // Parse the template files.
    let index_template = parse_template(config.index_template.iter())?;
    let posts_template = parse_template(config.posts_template.iter())?;

    // Blow away the old output directories so we don't have any collisions.
    // We deliberately don't delete the whole root output directory in case
    // the user accidentally passes the wrong directory.
    rmdir(&config.index_output_directory)?;
    rmdir(&config.posts_output_directory)?;

    // Write the post and index pages.
    let writer = Writer {
        posts_template: &posts_template,
        index_template: &index_template,
        index_base_url: &config.index_url,
        posts_base_url: &config.posts_url,
        index_output_directory: &config.index_output_directory,
        posts_output_directory: &config.posts_output_directory,
        index_page_size: config.index_page_size,
        home_page: &config.home_page,
        comments: &config.comments,
        preview: preview_ref.is_some(),
    };
    writer.write_posts(feed.posts(), &posts)?;

    // Copy /pages/index.html to /index.html so the site root serves the
    // first index page.
    std::fs::create_dir_all(&config.root_output_directory)?;
    let _ = std::fs::copy(
        config.index_output_directory.join("index.html"),
        config.root_output_directory.join("index.html"),
    )?;

    // Create the atom feed.
    write_feed(
        FeedConfig {
            title: config.title.clone(),
            id: config.home_page.to_string(),
            author: config.author.clone(),
            home_page: config.home_page.clone(),
            posts_base_url: config.posts_url.clone(),
        },
        &posts,
        File::create(config.root_output_directory.join("feed.atom"))?,
    )?;

    log::info!(
        "wrote {} posts to {}",
        posts.len(),
        config.root_output_directory.display()
    );
    Ok(())
}

// Loads the template file contents, concatenates them, and parses the result
// into a template.
fn parse_template<P: AsRef<Path>>(template_files: impl Iterator<Item = P>) -> Result<Template> {
    let mut contents = String::new();
    for template_file in template_files {
        use std::io::Read;
        let template_file = template_file.as_ref();
        File::open(template_file)
            .map_err(|e| Error::OpenTemplateFile {
                path: template_file.to_owned(),
                err: e,
            })?
            .read_to_string(&mut contents)?;
        contents.push(' ');
    }

    let mut template = Template::default();
    template.parse(&contents).map_err(Error::ParseTemplate)?;
    Ok(template)
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can come from the content API,
/// pagination, post assembly, page writing, feed generation, template files,
/// and other I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors talking to the content API.
    Api(ApiError),

    /// Returned for errors draining the pagination cursor.
    Pagination(PaginationError),

    /// Returned for errors assembling posts.
    Post(PostError),

    /// Returned for errors writing pages to disk as HTML files.
    Write(WriteError),

    /// Returned for errors writing the feed.
    Feed(FeedError),

    /// Returned for I/O problems while cleaning output directories.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while opening template files.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing template files.
    ParseTemplate(String),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Api(err) => err.fmt(f),
            Error::Pagination(err) => err.fmt(f),
            Error::Post(err) => err.fmt(f),
            Error::Write(err) => err.fmt(f),
            Error::Feed(err) => err.fmt(f),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Api(err) => Some(err),
            Error::Pagination(err) => Some(err),
            Error::Post(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::Feed(err) => Some(err),
            Error::Clean { path: _, err } => Some(err),
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::ParseTemplate(_) => None,
            Error::Io(err) => Some(err),
        }
    }
}

impl From<ApiError> for Error {
    /// Converts [`ApiError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ApiError) -> Error {
        Error::Api(err)
    }
}

impl From<PaginationError> for Error {
    /// Converts [`PaginationError`]s into [`Error`]. This allows us to use
    /// the `?` operator.
    fn from(err: PaginationError) -> Error {
        Error::Pagination(err)
    }
}

impl From<PostError> for Error {
    /// Converts [`PostError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: PostError) -> Error {
        Error::Post(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

impl From<FeedError> for Error {
    /// Converts [`FeedError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: FeedError) -> Error {
        Error::Feed(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
