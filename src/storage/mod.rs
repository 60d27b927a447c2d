pub mod index;
pub mod markers;

pub use index::{GitIndexStager, WorkdirSource};
pub use markers::{MarkerFile, MarkerStore};
