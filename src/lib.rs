//! hnlive - follow newly submitted Hacker News stories as they arrive.
//!
//! The pipeline: [`stream`] reads id batches from the new-stories event
//! stream, [`dedup`] drops ids already handled, [`resolve`] turns the rest
//! into [`StoryRecord`]s (item API first, item page as fallback, both through
//! [`retry`]), and [`feed`] ties it together and decides what gets emitted.

pub mod config;
pub mod dedup;
pub mod error;
pub mod feed;
pub mod render;
pub mod resolve;
pub mod retry;
pub mod shutdown;
pub mod sse;
pub mod story;
pub mod stream;
pub mod transport;

pub use config::{Endpoints, FeedConfig};
pub use error::{StreamError, TransportError};
pub use feed::{Feed, Gate};
pub use render::Renderer;
pub use retry::RetryPolicy;
pub use shutdown::Shutdown;
pub use story::{FeedEvent, ItemId, Resolution, StoryRecord};
pub use transport::{EventSource, EventStream, HttpClient, HttpGet, HttpResponse, SseClient};
