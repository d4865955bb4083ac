#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

mod context;
mod error;

pub mod cache;
pub mod executor;
pub mod http;
pub mod lifecycle;
pub mod permissions;
pub mod trust;

// Build the Android module when generating docs so that
// the Android-specific functions are included regardless of
// the host.
#[cfg(any(all(doc, docsrs), target_os = "android"))]
#[cfg_attr(docsrs, doc(cfg(target_os = "android")))]
pub mod android;

/// Local HTTP(S) servers and certificates for exercising the client.
#[cfg(test)]
mod tests;

pub use context::{AppContext, AppContextBuilder};
pub use error::{Error, ExecutorError};
