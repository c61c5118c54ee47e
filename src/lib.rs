#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod download;
pub mod embed;
pub mod logging;
pub mod markup;
pub mod page_store;
pub mod pipeline;
pub mod resolve;
pub mod run;
pub mod transport;
