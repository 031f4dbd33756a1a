//! Stock redistribution between two warehouses.
//!
//! A [`RedistributionTemplate`] describes which variations move from which
//! storage locations of the sender to which locations of the receiver.
//! [`PlentyClient::create_redistribution`](crate::PlentyClient::create_redistribution)
//! turns it into an order plus stock transactions and reports every step.

mod template;
mod transaction;
mod workflow;

pub use template::{
    LocationTransfer, RedistributionTemplate, TargetLocation, ValidationError, VariationTransfer,
    Violation,
};
pub use transaction::{
    Direction, PlannedTransaction, TRANSACTION_STATUS, TransactionRecord, derive_incoming,
    derive_outgoing, order_item_ids,
};
pub use workflow::{
    REDISTRIBUTION_ORDER_TYPE, RedistributionReport, StepOutcome, StepRecord, WorkflowStep,
};
