use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;

use crate::core::{LAUNCHER_NAME_SHORT, LAUNCHER_VERSION};

pub fn user_agent() -> String {
    format!("{}/{}", LAUNCHER_NAME_SHORT, LAUNCHER_VERSION)
}

/// Shared client for manifests, assets and libraries.
///
/// Identity encoding keeps `content_length` equal to the bytes written to
/// disk, which the batch progress math relies on.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(user_agent())
        .default_headers(default_headers)
        .build()
}
