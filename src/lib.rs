pub mod capture;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod utils;

pub use capture::edit::{adjust_rows, ContentChange, EditDescription};
pub use capture::reconstruct::{reconstruct, reconstruct_content};
pub use capture::stage::{
    DocumentSource, OperationKind, StagePrimitive, StageTrigger, StagingCoordinator,
    StagingReport,
};
pub use core::rows::{MarkedRowSet, Row, RowRange};
pub use core::session::{MarkOp, MarkerSession};
pub use core::store::RowStore;
pub use error::UnstageError;
pub use storage::index::{GitIndexStager, WorkdirSource};
pub use storage::markers::MarkerStore;
