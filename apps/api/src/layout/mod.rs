// Certificate layout: fixed page geometry, standard-font metrics, PDF composition.
// Composition is CPU-bound and must run inside tokio::task::spawn_blocking.

pub mod composer;
pub mod font_metrics;
pub mod page;

#[cfg(test)]
pub(crate) mod inspect;

// Re-export the public API consumed by the certificate pipeline.
pub use composer::LayoutEngine;
pub use font_metrics::{StandardFontMetrics, TextMeasurer};
