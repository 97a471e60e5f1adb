use hyper::header::{self, HeaderName, HeaderValue};
use hyper::{Body, Response, StatusCode};

/// Plain-text response with `status` and `message` as the body.
pub(crate) fn text(status: StatusCode, message: &str) -> Response<Body> {
    let mut response = Response::new(Body::from(format!("{message}\n")));
    *response.status_mut() = status;
    set_header(&mut response, header::CONTENT_TYPE, "text/plain; charset=utf-8");
    set_header(&mut response, header::X_CONTENT_TYPE_OPTIONS, "nosniff");
    response
}

pub(crate) fn not_found() -> Response<Body> {
    text(StatusCode::NOT_FOUND, "404 page not found")
}

pub(crate) fn internal_error() -> Response<Body> {
    text(StatusCode::INTERNAL_SERVER_ERROR, "500 internal server error")
}

pub(crate) fn redirect(status: StatusCode, location: &str) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    set_header(&mut response, header::LOCATION, location);
    response
}

/// Insert a header, dropping values that are not legal in HTTP.
pub(crate) fn set_header(response: &mut Response<Body>, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            response.headers_mut().insert(name, value);
        }
        Err(_) => {
            tracing::warn!(target = "jardoc.server", header = %name, value, "dropping invalid header value");
        }
    }
}
