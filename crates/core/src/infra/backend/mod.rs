mod http;

pub use http::HttpBackend;
