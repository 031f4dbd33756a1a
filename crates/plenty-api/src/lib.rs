// plenty-api: Async Rust client for the PlentyMarkets REST API
//
// Session login, a throttle-aware request dispatcher, page aggregation for
// collection endpoints, thin per-resource methods and the warehouse
// redistribution workflow.

pub mod auth;
pub mod client;
pub mod dates;
pub mod error;
pub mod pagination;
pub mod query;
pub mod redistribution;
pub mod resources;
pub mod route;
pub mod session;
pub mod transform;
pub mod transport;

pub use auth::{
    AuthMode, Credential, CredentialPrompt, CredentialStore, GpgDecryptor, LoginCredentials,
    MemoryCredentialStore, PasswordDecryptor, PasswordSource, TerminalPrompt,
};
pub use client::{Outcome, PlentyClient, Request};
pub use dates::{DateRange, OrderDateType};
pub use error::Error;
pub use pagination::{PageResponse, Record};
pub use query::{Filters, Query, QueryValue};
pub use redistribution::{
    RedistributionReport, RedistributionTemplate, StepOutcome, StepRecord, ValidationError,
    WorkflowStep,
};
pub use resources::{ImageTarget, OrderDate};
pub use route::{BaseUrl, Route};
pub use session::Session;
pub use transport::TransportConfig;
