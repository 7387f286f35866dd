//! HTTP API for the trade journal.

mod error;
mod extract;
mod handlers;
mod server;

pub use server::JournalServer;
