//! Web ingestion for the word index.
//!
//! - `fetcher`: HTTP/1.1 GET over a raw TCP (or TLS) stream, following
//!   redirects and refusing anything that is not HTML
//! - `html`: link extraction and markup stripping
//! - `engine`: the page-budgeted crawl that feeds the shared index

use thiserror::Error;

pub mod engine;
pub mod fetcher;
pub mod html;

pub use engine::{CrawlSummary, PageSource, WebCrawler, REDIRECT_LIMIT};
pub use fetcher::HtmlFetcher;

/// Why a single fetch produced no HTML.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unsupported url: {0}")]
    UnsupportedUrl(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("tls error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("not found")]
    NotFound,

    #[error("redirect limit reached at {0}")]
    TooManyRedirects(String),

    #[error("invalid redirect target {0:?}")]
    InvalidRedirect(String),

    #[error("content type {0:?} is not html")]
    NotHtml(Option<String>),
}

/// Errors that reject a crawl before anything is scheduled. Failures of
/// individual pages are never reported here.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid seed url: {0}")]
    InvalidUrl(String),
}
