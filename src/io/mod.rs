pub mod fasta;
pub mod store;

pub use store::{LocalPosition, RecordMetadata, SequenceStore};
