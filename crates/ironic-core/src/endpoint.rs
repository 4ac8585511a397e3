//! Base endpoint handling and request path normalization.

use crate::error::{Error, Result};
use std::fmt;
use url::Url;

/// Join the path component of `base` with `path`.
///
/// The result has exactly one `/` between the two parts, whatever slashes
/// either side carries. Scheme and host of `base` are dropped. A base that
/// does not parse as a URL is used verbatim as the path prefix.
#[must_use]
pub fn connection_path(base: &str, path: &str) -> String {
    match Url::parse(base) {
        Ok(url) => join(url.path(), path),
        Err(_) => join(base, path),
    }
}

fn join(base_path: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_path.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// A parsed service endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: Url,
}

impl Endpoint {
    /// Parse a base endpoint such as `http://ironic.example.com:6385/baremetal`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the URL cannot be parsed or has no
    /// host to connect to.
    pub fn parse(base: impl AsRef<str>) -> Result<Self> {
        let base = base.as_ref();
        let url = Url::parse(base)
            .map_err(|err| Error::InvalidEndpoint(format!("`{base}`: {err}")))?;

        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(Error::InvalidEndpoint(format!(
                "`{base}` is not a usable base URL"
            )));
        }

        Ok(Self { base: url })
    }

    /// The base URL as configured.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.base
    }

    /// Request path for `path` below this endpoint.
    #[must_use]
    pub fn connection_path(&self, path: &str) -> String {
        join(self.base.path(), path)
    }

    /// Full request URL for `path`.
    ///
    /// A query string embedded in `path` is kept; the base's own query and
    /// fragment are not carried over.
    #[must_use]
    pub fn request_url(&self, path: &str) -> Url {
        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path, None),
        };

        let mut url = self.base.clone();
        url.set_path(&self.connection_path(path));
        url.set_query(query);
        url.set_fragment(None);
        url
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)
    }
}
