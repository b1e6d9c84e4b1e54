//! # Filter Server - Rectangle Intersection Service
//!
//! A small HTTP service that receives a reference rectangle together with a
//! list of candidates, keeps the candidates that intersect the reference,
//! stamps them with the request time and appends them to a persistent log.
//! The whole log can be listed back at any time.
//!
//! ## Components
//!
//! * **Intersection filter** ([`filter_intersecting`]) - pure axis-aligned
//!   bounding box test; touching edges and corners count as intersecting
//! * **Rectangle log** ([`RectangleLog`]) - append-only store with a CSV file
//!   implementation ([`CsvRectangleLog`]) and an in-memory one
//!   ([`MemoryRectangleLog`])
//! * **Server** ([`FilterServer`]) - axum router exposing the two commands
//!
//! ## Message Flow
//!
//! 1. `POST /` with `{"Main": {...}, "Input": [{...}, ...]}`
//! 2. The body is decoded; a malformed body is rejected with `400`
//! 3. Intersecting candidates are tagged with one batch timestamp
//! 4. Matches are appended to the log
//!
//! `GET /` returns every stored rectangle as
//! `[{"x", "y", "width", "height", "time"}, ...]`, or the string
//! `"Data file not found."` while nothing has been stored.
//!
//! ## Error Handling
//!
//! Failures are reported through [`ServerError`] and affect only the request
//! that caused them. Storage failures map to `500`, decode failures to `400`.

pub use config::ServerConfig;
pub use error::{ServerError, StorageError};
pub use geometry::{
    batch_timestamp, filter_intersecting, FilterRequest, Rectangle, TaggedRectangle,
};
pub use server::{AppState, FilterServer, NO_DATA_MESSAGE};
pub use storage::{CsvRectangleLog, MemoryRectangleLog, RectangleLog};
pub use utils::{create_server, create_server_with_config};

pub mod config;
pub mod error;
pub mod geometry;
pub mod server;
pub mod storage;
pub mod utils;
