//! Bounded, indexed subject store with Jaccard similarity search (C10).

mod registry;
mod similarity;
mod types;

pub use registry::SubjectRegistry;
pub use similarity::{find_similar, SimilarityMatch};
pub use types::{ReferenceImageData, Subject, SubjectInput, SubjectQuery, SubjectType};
