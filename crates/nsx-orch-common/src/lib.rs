//! Common orchestration abstractions for the NSX operator.
//!
//! This crate provides the core types every NSX resource service is built on:
//!
//! - [`ResourceStore`]: keyed + indexed in-memory cache of realized NSX objects
//! - [`Backoff`]: exponential backoff parameters, with named per-kind policies
//! - [`RealizeStateService`]: turns NSX asynchronous realization into a
//!   synchronous verdict by polling the realized-entities API
//! - [`initialize_stores`]: one blocking bulk load of several stores
//! - [`run_garbage_collector`]: periodic garbage-collection runner
//!
//! # Architecture
//!
//! A resource service mutation follows one state machine:
//!
//! 1. Submit the desired-state patch through the remote client
//! 2. Poll realization with the backoff policy of the resource kind
//! 3. Fetch the confirmed object
//! 4. Apply it to the [`ResourceStore`]
//! 5. Recompute any aggregate derived from the store
//!
//! The store only ever holds realized state: nothing is written to it unless
//! step 2 succeeded.

mod backoff;
mod bootstrap;
mod client;
mod error;
mod gc;
mod realize;
mod store;

pub use backoff::{Backoff, ResourceKind, RetryPolicies};
pub use bootstrap::{initialize_stores, ListerLoader, StoreLoader};
pub use client::{ClientError, ClientResult, ListPage, RealizedEntitiesClient, ResourceLister};
pub use error::{NsxError, NsxResult, RealizeError};
pub use gc::{run_garbage_collector, GarbageCollector};
pub use realize::{classify, RealizeStateService, Verdict};
pub use store::{Indexed, ResourceStore, StoreError};
