use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use hyper::header::{self, HeaderMap};
use hyper::{Body, Method, Request, Response, StatusCode};
use jardoc_cache::{CachedArtifact, DocService};
use tokio::time::Instant;

use crate::files::{self, FileRequest};
use crate::response::{internal_error, not_found, redirect, set_header, text};

/// Browser caches never hold a page longer than this, whatever the artifact's TTL.
pub const MAX_BROWSER_CACHE: Duration = Duration::from_secs(10 * 60);

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(120);

/// Maps `/<version>/<path>` requests onto cached javadoc archives.
///
/// `/` and any path whose first segment is a legacy alias redirect to the same path
/// under the latest release.
#[derive(Debug)]
pub struct RequestRouter {
    service: Arc<DocService>,
    legacy_aliases: HashSet<String>,
    fetch_timeout: Duration,
}

impl RequestRouter {
    pub fn new(service: Arc<DocService>) -> Self {
        Self {
            service,
            legacy_aliases: HashSet::new(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_legacy_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.legacy_aliases
            .extend(aliases.into_iter().map(Into::into).filter(|alias| !alias.is_empty()));
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn service(&self) -> &Arc<DocService> {
        &self.service
    }

    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let method = request.method().clone();
        if method != Method::GET && method != Method::HEAD {
            let mut response = text(StatusCode::METHOD_NOT_ALLOWED, "405 method not allowed");
            set_header(&mut response, header::ALLOW, "GET, HEAD");
            return response;
        }

        let path = request.uri().path().to_string();
        let query = request.uri().query().map(str::to_string);
        let trimmed = path.strip_prefix('/').unwrap_or(&path);
        let (first, rest) = match trimmed.split_once('/') {
            Some((first, rest)) => (first, Some(rest)),
            None => (trimmed, None),
        };

        if first.is_empty() || self.legacy_aliases.contains(first) {
            return self.redirect_to_latest(&path, query.as_deref());
        }

        let Some(coordinate) = self.service.find_version(first) else {
            tracing::debug!(target = "jardoc.server", version = first, "unknown version");
            return not_found();
        };
        let Some(rest) = rest else {
            let location = with_query(format!("/{first}/"), query.as_deref());
            return redirect(StatusCode::MOVED_PERMANENTLY, &location);
        };

        let artifact = match tokio::time::timeout(
            self.fetch_timeout,
            self.service.get_or_fetch(&coordinate),
        )
        .await
        {
            Ok(Ok(artifact)) => artifact,
            Ok(Err(err)) if err.is_not_found() => {
                tracing::info!(target = "jardoc.server", %coordinate, error = %err, "artifact not found");
                return not_found();
            }
            Ok(Err(err)) => {
                tracing::error!(target = "jardoc.server", %coordinate, error = %err, "failed to load artifact");
                return internal_error();
            }
            Err(_) => {
                tracing::error!(
                    target = "jardoc.server",
                    %coordinate,
                    timeout_ms = self.fetch_timeout.as_millis() as u64,
                    "timed out loading artifact"
                );
                return internal_error();
            }
        };

        let file_request = FileRequest {
            path: format!("/{rest}"),
            prefix: format!("/{first}"),
            query,
            head: method == Method::HEAD,
            if_modified_since: header_string(request.headers(), header::IF_MODIFIED_SINCE),
            range: header_string(request.headers(), header::RANGE),
        };
        let CachedArtifact { fs, valid_until } = artifact;
        let served =
            tokio::task::spawn_blocking(move || files::serve(&fs, &file_request)).await;
        let mut response = match served {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(target = "jardoc.server", error = %err, "file serving task failed");
                return internal_error();
            }
        };
        set_cache_headers(&mut response, valid_until);
        response
    }

    fn redirect_to_latest(&self, path: &str, query: Option<&str>) -> Response<Body> {
        let Some(latest) = self.service.latest() else {
            tracing::warn!(target = "jardoc.server", path, "no eligible version to redirect to");
            return not_found();
        };
        let location = with_query(format!("/{}{}", latest.version, path), query);
        redirect(StatusCode::FOUND, &location)
    }
}

fn with_query(mut location: String, query: Option<&str>) -> String {
    if let Some(query) = query {
        location.push('?');
        location.push_str(query);
    }
    location
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// `Cache-Control` is capped at [`MAX_BROWSER_CACHE`]; `Surrogate-Control` carries the
/// full remaining validity for CDNs.
fn set_cache_headers(response: &mut Response<Body>, valid_until: Instant) {
    let remaining = valid_until.saturating_duration_since(Instant::now());
    let browser = remaining.min(MAX_BROWSER_CACHE).as_secs();
    set_header(response, header::CACHE_CONTROL, &format!("max-age={browser}"));
    set_header(
        response,
        header::HeaderName::from_static("surrogate-control"),
        &format!("max-age={}", remaining.as_secs()),
    );
}
