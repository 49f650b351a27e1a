// Certificate generation engine.
// Pipeline: load student → resolve template → QR code → compose PDF → store on the student row.

pub mod assets;
pub mod errors;
pub mod handlers;
pub mod service;
pub mod store;
pub mod templates;
pub mod verification;

#[cfg(test)]
pub(crate) mod memory;
