//! A minimal blocking HTTP/1.1 client.
//!
//! Build a [`Request`], hand it to an [`HttpClient`] and get back a
//! [`Response`] for `200`, or an [`Error`](crate::Error) for everything else.
//! Requests without a body are sent as `GET`, requests with one as `POST`.
//!
//! ```no_run
//! use android_app_utils::http::{HttpClient, HttpConfig, Request};
//! use android_app_utils::trust::TrustConfig;
//! use std::sync::Arc;
//!
//! let client = HttpClient::new(HttpConfig::default(), Arc::new(TrustConfig::trust_all()));
//! let request = Request::builder("https://example.com/login")
//!     .form([("user", "me"), ("password", "secret")], "UTF-8")
//!     .build()?;
//! let body = client.execute(request)?.text();
//! # Ok::<(), android_app_utils::Error>(())
//! ```

mod body;
mod client;
mod config;
mod connection;
mod headers;
mod request;
mod response;
mod wire;

pub use body::{RequestBody, FORM_MEDIA_TYPE, JSON_MEDIA_TYPE};
pub use client::{HttpClient, PendingCall, ResponseCallback};
pub use config::{
    HttpConfig, RedirectPolicy, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_REDIRECTS,
    DEFAULT_READ_TIMEOUT,
};
pub use headers::Headers;
pub use request::{Method, Request, RequestBuilder};
pub use response::{Response, ResponseBody};
