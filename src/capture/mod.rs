pub mod edit;
pub mod reconstruct;
pub mod snapshot;
pub mod stage;
pub mod sync;

pub use edit::{adjust_rows, ContentChange, EditDescription};
pub use snapshot::ContentSnapshot;
pub use stage::{StagingCoordinator, StagingReport};
