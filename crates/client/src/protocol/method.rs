use http::Method;

/// Methods a request can be generated for, anything else is rejected.
pub const KNOWN_METHODS: [Method; 8] =
    [Method::OPTIONS, Method::GET, Method::HEAD, Method::POST, Method::PUT, Method::DELETE, Method::TRACE, Method::CONNECT];

pub fn is_known_method(method: &Method) -> bool {
    KNOWN_METHODS.contains(method)
}
