use crate::comments::CommentsConfig;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

const PROJECT_FILE: &str = "spacetraveling.yaml";

#[derive(Deserialize)]
struct PageSize(usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(10)
    }
}

#[derive(Deserialize)]
struct ApiPageSize(usize);
impl Default for ApiPageSize {
    fn default() -> Self {
        // The upstream site fetches one post per page and grows the list one
        // click at a time; keep that granularity by default.
        ApiPageSize(1)
    }
}

/// The site author, used in the Atom feed.
#[derive(Clone, Deserialize)]
pub struct Author {
    pub name: String,

    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize)]
struct Project {
    api_url: Url,
    title: String,

    #[serde(default)]
    author: Option<Author>,

    site_root: Url,
    home_page: String,

    #[serde(default)]
    index_page_size: PageSize,

    #[serde(default)]
    api_page_size: ApiPageSize,

    comments: CommentsConfig,
}

#[derive(Deserialize)]
struct Theme {
    index_template: Vec<PathBuf>,
    posts_template: Vec<PathBuf>,
}

pub struct Config {
    pub api_url: Url,
    pub title: String,
    pub author: Option<Author>,
    pub home_page: Url,
    pub index_url: Url,
    pub posts_url: Url,
    pub index_template: Vec<PathBuf>,
    pub posts_template: Vec<PathBuf>,
    pub root_output_directory: PathBuf,
    pub index_output_directory: PathBuf,
    pub posts_output_directory: PathBuf,
    pub index_page_size: usize,
    pub api_page_size: usize,
    pub comments: CommentsConfig,

    /// The draft revision to build against, when generating a preview.
    pub preview_ref: Option<String>,
}

impl Config {
    /// Finds `spacetraveling.yaml` in `dir` or the nearest parent directory
    /// and loads the configuration from it.
    pub fn from_directory(
        dir: &Path,
        output_directory: &Path,
        preview_ref: Option<String>,
    ) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            Config::from_project_file(&path, output_directory, preview_ref)
                .context("Loading configuration")
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent, output_directory, preview_ref),
                None => Err(anyhow!(
                    "Could not find `{}` in any parent directory",
                    PROJECT_FILE
                )),
            }
        }
    }

    pub fn from_project_file(
        path: &Path,
        output_directory: &Path,
        preview_ref: Option<String>,
    ) -> Result<Config> {
        let project: Project = serde_yaml::from_reader(open(path, "project")?)?;
        match path.parent() {
            None => Err(anyhow!(
                "Can't get parent directory for provided project file path '{}'",
                path.display()
            )),
            Some(project_root) => {
                let theme_dir = project_root.join("theme");
                let theme_file = open(&theme_dir.join("theme.yaml"), "theme")?;
                let theme: Theme = serde_yaml::from_reader(theme_file)?;
                Ok(Config {
                    api_url: project.api_url,
                    title: project.title,
                    author: project.author,
                    home_page: project.site_root.join(&project.home_page)?,
                    // The trailing slashes matter: page URLs are joined onto
                    // these bases later.
                    index_url: project.site_root.join("pages/")?,
                    posts_url: project.site_root.join("post/")?,
                    index_template: theme
                        .index_template
                        .iter()
                        .map(|relpath| theme_dir.join(relpath))
                        .collect(),
                    posts_template: theme
                        .posts_template
                        .iter()
                        .map(|relpath| theme_dir.join(relpath))
                        .collect(),
                    root_output_directory: output_directory.to_owned(),
                    index_output_directory: output_directory.join("pages"),
                    posts_output_directory: output_directory.join("post"),
                    index_page_size: project.index_page_size.0,
                    api_page_size: project.api_page_size.0,
                    comments: project.comments,
                    preview_ref,
                })
            }
        }
    }
}

fn open(path: &Path, kind: &str) -> Result<std::fs::File> {
    std::fs::File::open(path)
        .map_err(|e| anyhow!("Opening {} file `{}`: {}", kind, path.display(), e))
}
