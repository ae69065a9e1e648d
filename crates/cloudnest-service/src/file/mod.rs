//! Upload pipeline and the mutation gateway.

pub mod mutation;
pub mod upload;

pub use mutation::{Invalidation, MutationGateway, UploadOutcome};
pub use upload::{RejectedFile, UploadBatch, UploadHandle, UploadPipeline};
