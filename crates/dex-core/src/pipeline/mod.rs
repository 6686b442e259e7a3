//! Profile ingestion pipeline components.
//!
//! - **acquire**: Download the first retrievable image of a profile
//! - **decode**: Validate image payloads and decode base64 probes
//! - **ingest**: Orchestrates acquire → decode → embed for a whole batch

pub mod acquire;
pub mod decode;
pub mod ingest;

// Re-exports for convenient access
pub use acquire::{HttpImageSource, ImageSource};
pub use decode::{decode_image_data, DecodedImage, ImageDecoder};
pub use ingest::{FailureReason, Ingestor, LoadReport, ProfileOutcome, ProfileStatus};
