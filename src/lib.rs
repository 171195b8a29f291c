#![doc = "cofftool: converts JaCoCo XML coverage into a Coveralls job and uploads it."]

//! Leaf modules first: [`digest`], [`source_index`], [`multipart`], the API clients
//! [`travis`] and [`coveralls`], then the [`pipeline`] that ties them together and the
//! [`cli`] glue.

pub mod cli;
pub mod config;
pub mod contract;
pub mod coveralls;
pub mod crawl;
pub mod digest;
pub mod error;
pub mod http;
pub mod load_config;
pub mod multipart;
pub mod pipeline;
pub mod report;
pub mod source_index;
pub mod travis;

pub use cli::{run, Cli, Commands};
