pub mod history;
pub mod rollback;
pub mod search;
pub mod snapshot;
pub mod stats;
pub mod store;
pub mod types;
