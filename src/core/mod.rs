pub mod presentation;
pub mod rows;
pub mod session;
pub mod store;
