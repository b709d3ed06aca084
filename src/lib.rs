//! The library code for the `spacetraveling` blog generator. The
//! architecture can be generally broken down into three distinct steps:
//!
//! 1. Fetching post summaries from the content API and draining its
//!    cursor-based pagination ([`crate::api`], [`crate::pagination`])
//! 2. Assembling each full post document into a renderable page — formatted
//!    dates, estimated reading time, rendered rich-text body, chronological
//!    neighbors ([`crate::post`], [`crate::richtext`])
//! 3. Templating the pages and writing them to disk ([`crate::write`])
//!
//! The index pages are paginated: the accumulated summary sequence is
//! converted into groups of pages based on a configurable number of posts
//! per index page. Each post page additionally embeds a third-party comment
//! widget ([`crate::comments`]) and, when building a preview of a draft
//! revision, an exit-preview affordance.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod api;
pub mod build;
pub mod comments;
pub mod config;
pub mod feed;
pub mod pagination;
pub mod post;
pub mod richtext;
pub mod write;
