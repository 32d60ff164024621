//! Depth-limit admission for proxied GraphQL operations.
//!
//! [`AdmissionController::admit`] decides whether a tenant session may run an
//! operation against an API, combining access rights, quota and per-field
//! depth policies into a single [`AdmissionOutcome`].

pub mod admission;
pub mod analyzer;
pub mod error;
pub mod operation;
pub mod outcome;
pub mod policy;
pub mod quota;
pub mod registry;
pub mod schema;
pub mod session;

pub use admission::AdmissionController;
pub use analyzer::{compute_depths, OperationDepths, RootFieldDepth};
pub use operation::{GraphQLRequest, OperationDocument};
pub use outcome::{AdmissionOutcome, Rejection};
pub use policy::{AccessGrant, DepthLimit, FieldLimitRule};
pub use quota::{QuotaTracker, QuotaVerdict, Unmetered};
pub use registry::Registry;
pub use schema::Schema;
pub use session::{ApiDefinition, SessionState};
