//! Per-request identifiers carried in headers.

use axum::http::HeaderMap;

use gitclub_core::RequestId;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The caller's `x-request-id` when it is a UUID, otherwise a fresh one.
pub fn request_id_from(headers: &HeaderMap) -> RequestId {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn honours_a_well_formed_request_id() {
        let id = RequestId::new();
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        assert_eq!(request_id_from(&headers), id);
    }

    #[test]
    fn generates_one_otherwise() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        let a = request_id_from(&headers);
        let b = request_id_from(&HeaderMap::new());
        assert_ne!(a, b);
    }
}
