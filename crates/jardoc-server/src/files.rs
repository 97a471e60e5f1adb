//! Static-file serving over a [`VirtualFileSystem`].

use std::io::{self, Read, Seek, SeekFrom};

use chrono::NaiveDateTime;
use hyper::header;
use hyper::{Body, Response, StatusCode};
use jardoc_archive::{Handle, VfsError, VirtualDirectory, VirtualFile, VirtualFileSystem};

use crate::path::{clean_path, escape_html, percent_decode_utf8, percent_encode_segment};
use crate::range::RangeRequest;
use crate::response::{internal_error, not_found, redirect, set_header, text};

pub(crate) const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";
const LISTING_PAGE: usize = 64;
/// Upper bound on the buffer reserved up front; entry sizes come from the archive.
const MAX_PREALLOCATION: u64 = 1024 * 1024;

/// One request against an archive, with the version prefix already stripped.
#[derive(Clone, Debug, Default)]
pub(crate) struct FileRequest {
    /// Path below the prefix, still percent-encoded, starting with `/`.
    pub(crate) path: String,
    /// The stripped prefix (`/3.0`), prepended to redirect targets.
    pub(crate) prefix: String,
    pub(crate) query: Option<String>,
    pub(crate) head: bool,
    pub(crate) if_modified_since: Option<String>,
    pub(crate) range: Option<String>,
}

impl FileRequest {
    fn redirect_to(&self, target: &str) -> Response<Body> {
        let mut location = format!("{}{}", self.prefix, target);
        if let Some(query) = &self.query {
            location.push('?');
            location.push_str(query);
        }
        redirect(StatusCode::MOVED_PERMANENTLY, &location)
    }
}

/// Answer `request` from `fs`. Reads and decompresses on the calling thread.
pub(crate) fn serve(fs: &VirtualFileSystem, request: &FileRequest) -> Response<Body> {
    if let Some(dir) = request.path.strip_suffix("index.html") {
        if dir.ends_with('/') {
            return request.redirect_to(dir);
        }
    }

    let Some(decoded) = percent_decode_utf8(&request.path) else {
        return text(StatusCode::BAD_REQUEST, "400 bad request");
    };
    let name = clean_path(&decoded);

    match fs.open(&name) {
        Ok(Handle::Directory(dir)) => {
            if !request.path.ends_with('/') {
                return request.redirect_to(&format!("{}/", request.path));
            }
            serve_directory(fs, dir, &name, request)
        }
        Ok(Handle::File(file)) => {
            if request.path.ends_with('/') {
                return request.redirect_to(request.path.trim_end_matches('/'));
            }
            serve_file(file, request)
        }
        Err(err) => open_failed(&name, &err),
    }
}

fn open_failed(name: &str, err: &VfsError) -> Response<Body> {
    if err.is_not_found() {
        return not_found();
    }
    tracing::warn!(target = "jardoc.server", path = name, error = %err, "failed to open archive path");
    internal_error()
}

fn serve_directory(
    fs: &VirtualFileSystem,
    mut dir: VirtualDirectory,
    name: &str,
    request: &FileRequest,
) -> Response<Body> {
    let index = format!("{}/index.html", name.trim_end_matches('/'));
    match fs.open(&index) {
        Ok(Handle::File(file)) => return serve_file(file, request),
        Ok(Handle::Directory(_)) => {}
        Err(err) if err.is_not_found() => {}
        Err(err) => return open_failed(&index, &err),
    }

    let mut listing = String::from(
        "<!doctype html>\n<meta name=\"viewport\" content=\"width=device-width\">\n<pre>\n",
    );
    loop {
        let page = dir.read_dir(LISTING_PAGE);
        if page.is_empty() {
            break;
        }
        for entry in page {
            let suffix = if entry.is_dir() { "/" } else { "" };
            let href = escape_html(&percent_encode_segment(entry.name()));
            let label = escape_html(entry.name());
            listing.push_str(&format!("<a href=\"{href}{suffix}\">{label}{suffix}</a>\n"));
        }
    }
    listing.push_str("</pre>\n");

    let length = listing.len();
    let mut response = Response::new(if request.head {
        Body::empty()
    } else {
        Body::from(listing)
    });
    set_header(&mut response, header::CONTENT_TYPE, "text/html; charset=utf-8");
    set_header(&mut response, header::CONTENT_LENGTH, &length.to_string());
    response
}

fn serve_file(mut file: VirtualFile, request: &FileRequest) -> Response<Body> {
    let meta = file.stat();
    let size = meta.len();
    let last_modified = meta
        .modified()
        .map(|modified| modified.format(HTTP_DATE_FORMAT).to_string());

    if let (Some(modified), Some(since)) = (meta.modified(), request.if_modified_since.as_deref())
    {
        if not_modified_since(modified, since) {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::NOT_MODIFIED;
            if let Some(value) = &last_modified {
                set_header(&mut response, header::LAST_MODIFIED, value);
            }
            return response;
        }
    }

    let (status, start, len) = match RangeRequest::parse(request.range.as_deref(), size) {
        RangeRequest::Full => (StatusCode::OK, 0, size),
        RangeRequest::Partial { start, end } => (StatusCode::PARTIAL_CONTENT, start, end - start + 1),
        RangeRequest::Unsatisfiable => {
            let mut response =
                text(StatusCode::RANGE_NOT_SATISFIABLE, "416 requested range not satisfiable");
            set_header(&mut response, header::CONTENT_RANGE, &format!("bytes */{size}"));
            return response;
        }
    };

    let body = if request.head {
        Body::empty()
    } else {
        match read_span(&mut file, start, len) {
            Ok(bytes) => Body::from(bytes),
            Err(err) => {
                tracing::warn!(
                    target = "jardoc.server",
                    path = file.path(),
                    start,
                    len,
                    error = %err,
                    "failed to read archive entry"
                );
                return internal_error();
            }
        }
    };
    file.close();

    let mut response = Response::new(body);
    *response.status_mut() = status;
    set_header(&mut response, header::CONTENT_TYPE, content_type(meta.name()));
    set_header(&mut response, header::CONTENT_LENGTH, &len.to_string());
    set_header(&mut response, header::ACCEPT_RANGES, "bytes");
    if status == StatusCode::PARTIAL_CONTENT {
        let end = start + len - 1;
        set_header(
            &mut response,
            header::CONTENT_RANGE,
            &format!("bytes {start}-{end}/{size}"),
        );
    }
    if let Some(value) = &last_modified {
        set_header(&mut response, header::LAST_MODIFIED, value);
    }
    response
}

/// Read exactly `len` bytes starting at `start`. An entry that ends early is an
/// error rather than a short body.
fn read_span(file: &mut VirtualFile, start: u64, len: u64) -> io::Result<Vec<u8>> {
    if start > 0 {
        file.seek(SeekFrom::Start(start))?;
    }
    let capacity = usize::try_from(len.min(MAX_PREALLOCATION)).unwrap_or(0);
    let mut out = Vec::with_capacity(capacity);
    file.by_ref().take(len).read_to_end(&mut out)?;
    if out.len() as u64 != len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("{} ended after {} of {len} bytes", file.path(), out.len()),
        ));
    }
    Ok(out)
}

/// HTTP dates have second precision, so compare at that granularity.
fn not_modified_since(modified: NaiveDateTime, since: &str) -> bool {
    match NaiveDateTime::parse_from_str(since.trim(), HTTP_DATE_FORMAT) {
        Ok(since) => modified.and_utc().timestamp() <= since.and_utc().timestamp(),
        Err(_) => false,
    }
}

fn content_type(name: &str) -> &'static str {
    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "txt" | "md" => "text/plain; charset=utf-8",
        "xml" => "text/xml; charset=utf-8",
        "png" => "image/png",
        "gif" => "image/gif",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "jar" => "application/java-archive",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use hyper::body::to_bytes;
    use pretty_assertions::assert_eq;
    use zip::write::FileOptions;
    use zip::{CompressionMethod, DateTime};

    use super::*;

    fn fixture() -> VirtualFileSystem {
        let mut zip = zip::ZipWriter::new(io::Cursor::new(Vec::new()));
        let modified = DateTime::from_date_and_time(2021, 3, 4, 5, 6, 8).unwrap();
        let options = FileOptions::<()>::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(modified);
        for (name, body) in [
            ("index.html", "<html>root</html>"),
            ("api/Foo.html", "0123456789"),
            ("api/nested/Bar.css", "body {}"),
            ("api/a b.txt", "spaced"),
        ] {
            zip.start_file(name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        let bytes = zip.finish().unwrap().into_inner();
        VirtualFileSystem::from_bytes(bytes).unwrap()
    }

    fn get(path: &str) -> FileRequest {
        FileRequest {
            path: path.to_string(),
            prefix: "/1.0".to_string(),
            ..FileRequest::default()
        }
    }

    async fn body_string(response: Response<Body>) -> String {
        let bytes = to_bytes(response.into_body()).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(response: &Response<Body>) -> &str {
        response.headers()[header::LOCATION].to_str().unwrap()
    }

    #[tokio::test]
    async fn serves_files_with_type_length_and_modification_time() {
        let response = serve(&fixture(), &get("/api/Foo.html"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html; charset=utf-8");
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "10");
        assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");
        assert_eq!(
            response.headers()[header::LAST_MODIFIED],
            "Thu, 04 Mar 2021 05:06:08 GMT"
        );
        assert_eq!(body_string(response).await, "0123456789");
    }

    #[tokio::test]
    async fn root_directory_serves_its_index_page() {
        let response = serve(&fixture(), &get("/"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "<html>root</html>");
    }

    #[tokio::test]
    async fn directory_without_index_lists_children_in_archive_order() {
        let response = serve(&fixture(), &get("/api/"));
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert_eq!(
            body,
            "<!doctype html>\n<meta name=\"viewport\" content=\"width=device-width\">\n<pre>\n\
             <a href=\"Foo.html\">Foo.html</a>\n\
             <a href=\"nested/\">nested/</a>\n\
             <a href=\"a%20b.txt\">a b.txt</a>\n\
             </pre>\n"
        );
    }

    #[test]
    fn slash_mismatches_and_index_pages_redirect() {
        let fs = fixture();

        let response = serve(&fs, &get("/api"));
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(location(&response), "/1.0/api/");

        let response = serve(&fs, &get("/api/Foo.html/"));
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(location(&response), "/1.0/api/Foo.html");

        let mut request = get("/index.html");
        request.query = Some("q=1".to_string());
        let response = serve(&fs, &request);
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(location(&response), "/1.0/?q=1");
    }

    #[tokio::test]
    async fn percent_encoded_and_dotted_paths_resolve_inside_the_archive() {
        let fs = fixture();
        let response = serve(&fs, &get("/api/a%20b.txt"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "spaced");

        let response = serve(&fs, &get("/../../api/./nested/../Foo.html"));
        assert_eq!(response.status(), StatusCode::OK);

        let response = serve(&fs, &get("/api/%zz"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_paths_are_not_found() {
        let fs = fixture();
        assert_eq!(serve(&fs, &get("/nope.html")).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            serve(&fs, &get("/api/Foo.html/child")).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn single_ranges_are_served_partially() {
        let mut request = get("/api/Foo.html");
        request.range = Some("bytes=2-5".to_string());
        let response = serve(&fixture(), &request);
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 2-5/10");
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "4");
        assert_eq!(body_string(response).await, "2345");

        request.range = Some("bytes=-3".to_string());
        let response = serve(&fixture(), &request);
        assert_eq!(body_string(response).await, "789");
    }

    #[test]
    fn unsatisfiable_range_reports_the_size() {
        let mut request = get("/api/Foo.html");
        request.range = Some("bytes=10-".to_string());
        let response = serve(&fixture(), &request);
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */10");
    }

    #[test]
    fn if_modified_since_yields_not_modified() {
        let mut request = get("/api/Foo.html");
        request.if_modified_since = Some("Thu, 04 Mar 2021 05:06:08 GMT".to_string());
        assert_eq!(serve(&fixture(), &request).status(), StatusCode::NOT_MODIFIED);

        request.if_modified_since = Some("Wed, 03 Mar 2021 00:00:00 GMT".to_string());
        assert_eq!(serve(&fixture(), &request).status(), StatusCode::OK);

        request.if_modified_since = Some("yesterday".to_string());
        assert_eq!(serve(&fixture(), &request).status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn head_requests_carry_headers_without_a_body() {
        let mut request = get("/api/Foo.html");
        request.head = true;
        let response = serve(&fixture(), &request);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "10");
        assert_eq!(body_string(response).await, "");
    }

    /// One deflated `a.txt` whose central directory claims `claimed_size` bytes.
    fn overstated(claimed_size: u32) -> VirtualFileSystem {
        let mut zip = zip::ZipWriter::new(io::Cursor::new(Vec::new()));
        let options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);
        zip.start_file("a.txt", options).unwrap();
        zip.write_all(b"0123456789").unwrap();
        let mut bytes = zip.finish().unwrap().into_inner();

        let record = bytes
            .windows(4)
            .position(|window| window == b"PK\x01\x02")
            .unwrap();
        bytes[record + 24..record + 28].copy_from_slice(&claimed_size.to_le_bytes());
        VirtualFileSystem::from_bytes(bytes).unwrap()
    }

    #[test]
    fn entry_shorter_than_its_recorded_size_is_a_server_error() {
        let fs = overstated(1_000_000);
        assert_eq!(
            serve(&fs, &get("/a.txt")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let mut request = get("/a.txt");
        request.range = Some("bytes=5-99".to_string());
        assert_eq!(serve(&fs, &request).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn ranges_inside_the_real_data_of_a_lying_entry_still_serve() {
        let mut request = get("/a.txt");
        request.range = Some("bytes=2-4".to_string());
        let response = serve(&overstated(1_000_000), &request);
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(body_string(response).await, "234");
    }

    #[test]
    fn content_types_follow_the_extension() {
        assert_eq!(content_type("style.CSS"), "text/css; charset=utf-8");
        assert_eq!(content_type("logo.png"), "image/png");
        assert_eq!(content_type("package-list"), "application/octet-stream");
    }
}
