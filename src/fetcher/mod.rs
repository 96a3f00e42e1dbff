pub mod http_fetcher;

use async_trait::async_trait;

use crate::app::Result;

pub use http_fetcher::HttpFetcher;

#[async_trait]
pub trait Fetcher {
    /// Fetch the raw feed document at `url`, sending `cookie` as the `Cookie` header.
    ///
    /// On success the bytes start at the XML prolog.
    async fn fetch(&self, url: &str, cookie: Option<&str>) -> Result<Vec<u8>>;
}
