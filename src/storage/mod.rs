//! Persistence for dedup state.
//!
//! [`SeenStore`] keeps each feed's [`SeenKeys`](crate::feed::SeenKeys) on disk
//! between runs so entries are delivered once across process restarts.

mod seen;

pub use seen::{SeenStore, SeenStoreError};
