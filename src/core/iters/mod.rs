mod indexer;
mod slicer;

pub(crate) use indexer::Indexer;
pub(crate) use slicer::Slicer;
