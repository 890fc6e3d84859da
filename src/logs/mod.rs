//! Log Retrieval Engine
//!
//! Given an actionable event about a pod, collect a tail of logs from each
//! of the pod's containers:
//!
//! - [`policy`]: whether the previous container instance is the right source
//! - [`fetcher`]: per-container retrieval with not-found fallback
//! - [`tail`]: validated tail-line count

pub mod fetcher;
pub mod policy;
pub mod tail;

pub use fetcher::{ContainerFailure, LogFetchError, LogFetcher};
pub use policy::RetrievalPolicy;
pub use tail::{TailLines, TailLinesError};
