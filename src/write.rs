//! Responsible for templating and writing the output HTML tree: paginated
//! index pages built from the accumulated [`PostSummary`] sequence, and one
//! page per [`RenderablePost`].

use crate::comments::{CommentsConfig, Injector};
use crate::post::{NavigationNeighbor, PostSummary, RenderablePost};
use gtmpl::{Template, Value};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use url::Url;

/// Writes index and post pages to disk.
pub struct Writer<'a> {
    /// The template for post pages.
    pub posts_template: &'a Template,

    /// The template for index pages.
    pub index_template: &'a Template,

    /// The base URL for index pages. The first index page lives at
    /// `{index_base_url}index.html`, later ones at `{index_base_url}1.html`,
    /// `{index_base_url}2.html`, etc.
    pub index_base_url: &'a Url,

    /// The base URL for post pages: `{posts_base_url}{uid}.html`.
    pub posts_base_url: &'a Url,

    /// The directory in which the index HTML files will be written.
    pub index_output_directory: &'a Path,

    /// The directory in which the post HTML files will be written.
    pub posts_output_directory: &'a Path,

    /// The number of post summaries per index page.
    pub index_page_size: usize,

    /// The URL for the site's home page, made available to every template.
    pub home_page: &'a Url,

    /// Comment-widget settings; the snippet is embedded into post pages.
    pub comments: &'a CommentsConfig,

    /// Whether this build renders a draft revision. Exposed to templates so
    /// they can show an exit-preview affordance.
    pub preview: bool,
}

impl Writer<'_> {
    /// Takes a single [`Page`], templates it, and writes it to disk.
    fn write_page(&self, page: &Page) -> Result<()> {
        let mut value = page.to_value();
        if let Value::Object(obj) = &mut value {
            obj.insert(
                "home_page".to_owned(),
                Value::String(self.home_page.to_string()),
            );
            obj.insert("preview".to_owned(), Value::Bool(self.preview));
        }
        page.template.execute(
            &mut std::fs::File::create(&page.file_path)?,
            &gtmpl::Context::from(value)?,
        )?;
        Ok(())
    }

    /// Writes the whole site body: index pages for the accumulated summary
    /// sequence and one page per assembled post.
    pub fn write_posts(&self, summaries: &[PostSummary], posts: &[RenderablePost]) -> Result<()> {
        std::fs::create_dir_all(self.index_output_directory)?;
        std::fs::create_dir_all(self.posts_output_directory)?;
        for page in self.index_pages(summaries)? {
            self.write_page(&page)?;
        }
        for page in self.post_pages(posts)? {
            self.write_page(&page)?;
        }
        Ok(())
    }

    /// Chunks the summary sequence into index pages. Page `i` links `prev`
    /// and `next` to its sibling index pages.
    fn index_pages(&self, summaries: &[PostSummary]) -> Result<Vec<Page>> {
        let total_pages = match summaries.len() % self.index_page_size {
            0 => summaries.len() / self.index_page_size,
            _ => summaries.len() / self.index_page_size + 1,
        };

        summaries
            .chunks(self.index_page_size)
            .enumerate()
            .map(|(i, chunk)| {
                let file_name = match i > 0 {
                    false => String::from("index.html"),
                    true => format!("{}.html", i),
                };

                let items = chunk
                    .iter()
                    .map(|summary| self.summary_value(summary))
                    .collect::<Result<Vec<Value>>>()?;

                Ok(Page {
                    item: Value::Array(items),
                    file_path: self.index_output_directory.join(&file_name),
                    prev: match i {
                        0 => None,
                        1 => Some(self.index_base_url.join("index.html")?),
                        _ => Some(self.index_base_url.join(&format!("{}.html", i - 1))?),
                    },
                    next: match i + 1 < total_pages {
                        false => None,
                        true => Some(self.index_base_url.join(&format!("{}.html", i + 1))?),
                    },
                    template: self.index_template,
                })
            })
            .collect()
    }

    /// Creates one page per post. `prev`/`next` point at the chronological
    /// neighbors resolved during assembly; a missing neighbor renders as an
    /// inert placeholder because the template sees `Nil`.
    fn post_pages<'a>(&'a self, posts: &[RenderablePost]) -> Result<Vec<Page<'a>>> {
        let mut injector = Injector::default();
        posts
            .iter()
            .map(|post| {
                let snippet = injector
                    .ensure(self.comments, &post.uid)
                    .unwrap_or_default();
                Ok(Page {
                    item: self.post_value(post, &snippet)?,
                    file_path: self
                        .posts_output_directory
                        .join(format!("{}.html", post.uid)),
                    prev: self.neighbor_url(&post.previous)?,
                    next: self.neighbor_url(&post.next)?,
                    template: self.posts_template,
                })
            })
            .collect()
    }

    pub fn post_url(&self, uid: &str) -> Result<Url> {
        Ok(self.posts_base_url.join(&format!("{}.html", uid))?)
    }

    fn neighbor_url(&self, neighbor: &Option<NavigationNeighbor>) -> Result<Option<Url>> {
        match neighbor {
            None => Ok(None),
            Some(neighbor) => Ok(Some(self.post_url(&neighbor.uid)?)),
        }
    }

    fn summary_value(&self, summary: &PostSummary) -> Result<Value> {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("uid".to_owned(), Value::String(summary.uid.clone()));
        m.insert(
            "url".to_owned(),
            Value::String(self.post_url(&summary.uid)?.to_string()),
        );
        m.insert("title".to_owned(), Value::String(summary.title.clone()));
        m.insert(
            "subtitle".to_owned(),
            Value::String(summary.subtitle.clone()),
        );
        m.insert("author".to_owned(), Value::String(summary.author.clone()));
        m.insert(
            "publication_date".to_owned(),
            Value::String(summary.publication_date.clone()),
        );
        Ok(Value::Object(m))
    }

    fn post_value(&self, post: &RenderablePost, comments_snippet: &str) -> Result<Value> {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("uid".to_owned(), Value::String(post.uid.clone()));
        m.insert("title".to_owned(), Value::String(post.title.clone()));
        m.insert("subtitle".to_owned(), Value::String(post.subtitle.clone()));
        m.insert("author".to_owned(), Value::String(post.author.clone()));
        m.insert(
            "banner_url".to_owned(),
            Value::String(post.banner_url.clone()),
        );
        m.insert(
            "publication_date".to_owned(),
            Value::String(post.publication_date.clone()),
        );
        m.insert(
            "last_edited".to_owned(),
            Value::String(post.last_edited.clone()),
        );
        m.insert(
            "reading_time".to_owned(),
            Value::from(post.reading_time as u64),
        );
        m.insert(
            "content".to_owned(),
            Value::Array(
                post.content
                    .iter()
                    .map(|block| {
                        let mut b: HashMap<String, Value> = HashMap::new();
                        b.insert("heading".to_owned(), Value::String(block.heading.clone()));
                        b.insert("body".to_owned(), Value::String(block.body.clone()));
                        Value::Object(b)
                    })
                    .collect(),
            ),
        );
        m.insert(
            "previous".to_owned(),
            self.neighbor_value(&post.previous)?,
        );
        m.insert("next".to_owned(), self.neighbor_value(&post.next)?);
        m.insert(
            "comments".to_owned(),
            Value::String(comments_snippet.to_owned()),
        );
        Ok(Value::Object(m))
    }

    fn neighbor_value(&self, neighbor: &Option<NavigationNeighbor>) -> Result<Value> {
        match neighbor {
            None => Ok(Value::Nil),
            Some(neighbor) => {
                let mut m: HashMap<String, Value> = HashMap::new();
                m.insert("uid".to_owned(), Value::String(neighbor.uid.clone()));
                m.insert("title".to_owned(), Value::String(neighbor.title.clone()));
                m.insert(
                    "url".to_owned(),
                    Value::String(self.post_url(&neighbor.uid)?.to_string()),
                );
                Ok(Value::Object(m))
            }
        }
    }
}

/// An object representing an output HTML file. A [`Page`] can be converted
/// to a [`Value`] and thus rendered in a template via [`Page::to_value`].
struct Page<'a> {
    /// The main item for the page: an array of summaries for index pages, a
    /// post object for post pages.
    item: Value,

    /// The target location on disk for the output file.
    file_path: PathBuf,

    /// The URL for the previous page, if any.
    prev: Option<Url>,

    /// The URL for the next page, if any.
    next: Option<Url>,

    /// The template with which the page will be rendered.
    template: &'a Template,
}

impl Page<'_> {
    /// Converts a [`Page`] into a [`Value`]. The result is a
    /// [`Value::Object`] with fields `item`, `prev`, and `next`.
    fn to_value(&self) -> Value {
        let option_to_value = |opt: &Option<Url>| match opt {
            Some(url) => Value::String(url.to_string()),
            None => Value::Nil,
        };

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("item".to_owned(), self.item.clone());
        m.insert("prev".to_owned(), option_to_value(&self.prev));
        m.insert("next".to_owned(), option_to_value(&self.next));
        Value::Object(m)
    }
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An error during templating.
    Template(String),

    /// An error building a page URL.
    Url(url::ParseError),

    /// An error writing the output files.
    Io(io::Error),
}

impl From<io::Error> for Error {
    /// Converts an [`io::Error`] into an [`Error`]. This allows us to use
    /// the `?` operator for fallible I/O operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<String> for Error {
    /// Converts a template error message ([`String`]) into an [`Error`].
    /// This allows us to use the `?` operator for fallible template
    /// operations.
    fn from(err: String) -> Error {
        Error::Template(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. This allows us to
    /// use the `?` operator when joining page URLs.
    fn from(err: url::ParseError) -> Error {
        Error::Url(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template(err) => err.fmt(f),
            Error::Url(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template(_) => None,
            Error::Url(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::{assemble, parse_timestamp, ContentBlock, PostDocument};

    fn template(text: &str) -> Template {
        let mut template = Template::default();
        template.parse(text).unwrap();
        template
    }

    fn summary(uid: &str) -> PostSummary {
        PostSummary {
            uid: uid.to_owned(),
            published: parse_timestamp("2021-05-03T10:00:00Z").unwrap(),
            publication_date: "3 mai 2021".to_owned(),
            title: format!("Title of {}", uid),
            subtitle: String::new(),
            author: "Paloma".to_owned(),
        }
    }

    fn comments() -> CommentsConfig {
        CommentsConfig {
            repo: "example/comments".to_owned(),
            label: String::new(),
            theme: "github-dark".to_owned(),
            issue_term: "pathname".to_owned(),
            issue_number: false,
        }
    }

    fn writer<'a>(
        index_template: &'a Template,
        posts_template: &'a Template,
        urls: &'a (Url, Url, Url),
        output: &'a Path,
        comments: &'a CommentsConfig,
    ) -> Writer<'a> {
        Writer {
            posts_template,
            index_template,
            index_base_url: &urls.0,
            posts_base_url: &urls.1,
            index_output_directory: output,
            posts_output_directory: output,
            index_page_size: 2,
            home_page: &urls.2,
            comments,
            preview: false,
        }
    }

    fn urls() -> (Url, Url, Url) {
        (
            Url::parse("https://example.org/pages/").unwrap(),
            Url::parse("https://example.org/post/").unwrap(),
            Url::parse("https://example.org/").unwrap(),
        )
    }

    #[test]
    fn test_index_pages_chunking_and_sibling_links() -> Result<()> {
        let index_template = template("index");
        let posts_template = template("post");
        let urls = urls();
        let comments = comments();
        let dir = tempfile::tempdir()?;
        let writer = writer(&index_template, &posts_template, &urls, dir.path(), &comments);

        let summaries: Vec<PostSummary> =
            (0..5).map(|i| summary(&format!("post-{}", i))).collect();
        let pages = writer.index_pages(&summaries)?;

        // Five summaries at two per page make three pages.
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].file_path, dir.path().join("index.html"));
        assert_eq!(pages[1].file_path, dir.path().join("1.html"));
        assert!(pages[0].prev.is_none());
        assert_eq!(
            pages[1].prev.as_ref().unwrap().as_str(),
            "https://example.org/pages/index.html"
        );
        assert_eq!(
            pages[1].next.as_ref().unwrap().as_str(),
            "https://example.org/pages/2.html"
        );
        assert!(pages[2].next.is_none());
        Ok(())
    }

    #[test]
    fn test_write_posts_renders_templates() -> Result<()> {
        let index_template = template("{{len .item}} posts on this page");
        let posts_template =
            template("{{.item.title}} by {{.item.author}} ({{.item.reading_time}} min)");
        let urls = urls();
        let comments = comments();
        let dir = tempfile::tempdir()?;
        let writer = writer(&index_template, &posts_template, &urls, dir.path(), &comments);

        let document = PostDocument {
            uid: "first-post".to_owned(),
            published: parse_timestamp("2021-05-03T10:00:00Z").unwrap(),
            edited: parse_timestamp("2021-05-03T10:00:00Z").unwrap(),
            title: "First post".to_owned(),
            subtitle: String::new(),
            banner_url: String::new(),
            author: "Paloma".to_owned(),
            content: vec![ContentBlock {
                heading: "A B".to_owned(),
                body: Vec::new(),
            }],
        };
        let posts = vec![assemble(&document, None, None, false)];
        writer.write_posts(&[summary("first-post")], &posts)?;

        let index = std::fs::read_to_string(dir.path().join("index.html"))?;
        assert_eq!(index, "1 posts on this page");
        let post = std::fs::read_to_string(dir.path().join("first-post.html"))?;
        assert_eq!(post, "First post by Paloma (1 min)");
        Ok(())
    }

    #[test]
    fn test_post_page_neighbor_links() -> Result<()> {
        let index_template = template("index");
        let posts_template = template("post");
        let urls = urls();
        let comments = comments();
        let dir = tempfile::tempdir()?;
        let writer = writer(&index_template, &posts_template, &urls, dir.path(), &comments);

        let document = PostDocument {
            uid: "middle".to_owned(),
            published: parse_timestamp("2021-05-03T10:00:00Z").unwrap(),
            edited: parse_timestamp("2021-05-03T10:00:00Z").unwrap(),
            title: "Middle".to_owned(),
            subtitle: String::new(),
            banner_url: String::new(),
            author: "Paloma".to_owned(),
            content: Vec::new(),
        };
        let posts = vec![assemble(
            &document,
            Some(NavigationNeighbor {
                uid: "older".to_owned(),
                title: "Older".to_owned(),
            }),
            None,
            false,
        )];
        let pages = writer.post_pages(&posts)?;
        assert_eq!(
            pages[0].prev.as_ref().unwrap().as_str(),
            "https://example.org/post/older.html"
        );
        // The absent neighbor stays absent: an inert placeholder, not a
        // link.
        assert!(pages[0].next.is_none());
        Ok(())
    }
}
