// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! aether-adapters: HTTP clients for the external pipeline peers.

pub mod convert;
pub mod dimp;
pub mod http;
pub mod torch;

#[cfg(any(test, feature = "test-support"))]
pub mod fakes;

pub use convert::{ConvertService, HttpConvert};
pub use dimp::{DimpService, HttpDimp};
pub use http::{build_client, extract_ndjson_links, Fetched, Fetcher, HttpFetcher};
pub use torch::{
    decode_submission, result_file_urls, submission_parameters, HttpTorch, PollOutcome,
    TorchService,
};
