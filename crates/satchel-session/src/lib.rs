//! Session lifecycle state machine and per-request factory.
//!
//! This crate turns the opaque byte payloads persisted by `satchel-store`
//! into structured, bag-partitioned session state:
//! - [`SessionBag`] is the contract for an independently-owned slice of
//!   session data; [`AttributeBag`] and [`MetadataBag`] implement it.
//! - [`Session`] is the per-use state machine (start / mutate / save /
//!   destroy / regenerate) with a deep-equality dirty check that skips the
//!   durable write for unchanged sessions.
//! - [`SessionFactory`] guarantees at most one live [`Session`] handle per
//!   request, keyed by an explicit request-scope token.
//!
//! Storage faults and corrupt payloads never escape this crate as errors;
//! they degrade to an empty session. Protocol misuse (registering a bag
//! after start, fetching an unregistered bag) is surfaced as a hard error.

mod bag;
mod config;
mod error;
mod factory;
mod metadata;
mod request;
mod session;

pub use bag::{AttributeBag, SessionBag, ATTRIBUTES_BAG};
pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use factory::{SessionFactory, SessionHandle};
pub use metadata::{MetadataBag, METADATA_BAG};
pub use request::{MockRequest, RequestToken, SessionRequest};
pub use session::Session;
