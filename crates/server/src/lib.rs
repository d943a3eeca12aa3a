//! Serves the streaming pipeline over HTTP.
//!
//! `GET /?format=json|csv` streams every row of `source`.  The pipeline runs on a blocking thread and writes into a
//! bounded channel which the response body drains, so a slow client slows the cursor down and a client which goes away
//! stops it.
mod channel_writer;
mod config;
mod server;

pub use channel_writer::*;
pub use config::*;
pub use server::*;
