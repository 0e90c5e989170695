//! Adapters to external collaborators.
//!
//! - [`ScoreSource`]: where score snapshots come from (HTTP by default)
//! - [`MessageSink`]: where published updates go (a stream REST proxy by default)
//! - [`UpdatePublisher`]: serializes snapshots and waits for sink acknowledgment

pub mod publisher;
pub mod rest_proxy;
pub mod score_fetcher;

pub use publisher::{Delivery, MessageSink, PublishError, UpdatePublisher};
pub use rest_proxy::RestProxySink;
pub use score_fetcher::{FetchError, HttpScoreFetcher, RetryPolicy, ScoreSource};
