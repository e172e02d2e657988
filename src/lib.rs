//! minisky: a small client for Bluesky and other AT Protocol XRPC services
//!
//! # Example
//!
//! ```rust,no_run
//! use minisky::{FetchAllOptions, Minisky, XrpcRequest};
//!
//! # async fn example() -> minisky::Result<()> {
//! // bluesky.json: {"id": "john.foo", "pass": "hunter2"}
//! let bsky = Minisky::from_file("bsky.social", "bluesky.json").await?;
//!
//! let posts = bsky
//!     .fetch_all(
//!         XrpcRequest::query("app.bsky.feed.getAuthorFeed").param("actor", "john.foo"),
//!         FetchAllOptions::new().field("feed").max_pages(5),
//!     )
//!     .await?;
//! println!("{} posts", posts.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use config_store::{ConfigMap, ConfigStore, JsonFileStore, MemoryStore, StoreError};
pub use minisky_client::{
    AccessState, Auth, Client, ClientConfig, Error, FetchAllOptions, Progress, QueryParams,
    QueryValue, RequestBody, ResponseError, Result, UserCredentials, XrpcRequest,
};

/// Client storing its credentials in a JSON file
pub type Minisky = Client<JsonFileStore>;
