// Redistribution workflow
//
// Creates the redistribution order, then submits outgoing transactions,
// optionally books them, submits incoming transactions and optionally books
// those too. Steps run strictly one after another and every step's outcome
// is recorded in the returned report.
//
// Nothing is rolled back: once the order exists it stays, whatever happens
// later. Calling this twice creates two orders.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::template::RedistributionTemplate;
use super::transaction::{self, Direction, PlannedTransaction};
use crate::client::{Outcome, PlentyClient};
use crate::dates;
use crate::error::Error;
use crate::resources::OrderDate;

/// Order type id of a redistribution.
pub const REDISTRIBUTION_ORDER_TYPE: u32 = 15;

/// Order item type id of a variation.
const VARIATION_ITEM_TYPE: u32 = 1;

// ── Report ───────────────────────────────────────────────────────────

/// One step of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStep {
    CreateOrder,
    Transaction {
        direction: Direction,
        variation_id: u64,
        location_id: u64,
    },
    /// Initiation date (type 16), set before the outgoing booking.
    InitiateDate,
    BookOutgoing,
    BookIncoming,
    /// Finish date (type 18), set after the incoming booking.
    FinishDate,
}

/// What happened to a step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The server accepted the call; holds the response body.
    Succeeded(Value),
    Failed(String),
    /// The step was not attempted.
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub step: WorkflowStep,
    pub outcome: StepOutcome,
}

/// Everything a redistribution run did, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub struct RedistributionReport {
    pub order_id: u64,
    /// The created order as returned by the server.
    pub order: Value,
    pub steps: Vec<StepRecord>,
}

impl RedistributionReport {
    /// Whether every step succeeded.
    pub fn is_complete(&self) -> bool {
        self.steps
            .iter()
            .all(|record| matches!(record.outcome, StepOutcome::Succeeded(_)))
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps
            .iter()
            .filter(|record| matches!(record.outcome, StepOutcome::Failed(_)))
    }

    /// Transaction steps of one direction, in submission order.
    pub fn transactions(&self, direction: Direction) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(move |record| {
            matches!(record.step, WorkflowStep::Transaction { direction: d, .. } if d == direction)
        })
    }
}

// ── Order body ───────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderBody<'a> {
    type_id: u32,
    plenty_id: u64,
    order_items: Vec<OrderItemBody<'a>>,
    relations: [RelationBody; 2],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderItemBody<'a> {
    type_id: u32,
    item_variation_id: u64,
    quantity: u32,
    order_item_name: &'a str,
    amounts: [AmountBody<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AmountBody<'a> {
    currency: &'a str,
    price_original_gross: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RelationBody {
    reference_type: &'static str,
    reference_id: u64,
    relation: &'static str,
}

fn order_body(template: &RedistributionTemplate) -> OrderBody<'_> {
    OrderBody {
        type_id: REDISTRIBUTION_ORDER_TYPE,
        plenty_id: template.plenty_id,
        order_items: template
            .variations
            .iter()
            .map(|variation| OrderItemBody {
                type_id: VARIATION_ITEM_TYPE,
                item_variation_id: variation.variation_id,
                quantity: variation.total_quantity,
                order_item_name: &variation.name,
                amounts: [AmountBody {
                    currency: &template.currency,
                    price_original_gross: variation.price,
                }],
            })
            .collect(),
        relations: [
            RelationBody {
                reference_type: "warehouse",
                reference_id: template.sender,
                relation: "sender",
            },
            RelationBody {
                reference_type: "warehouse",
                reference_id: template.receiver,
                relation: "receiver",
            },
        ],
    }
}

// ── Workflow ─────────────────────────────────────────────────────────

/// Step recorder for one run.
struct Run<'a> {
    client: &'a PlentyClient,
    order_id: u64,
    steps: Vec<StepRecord>,
    /// Set by the first failed step; booking and date steps are skipped
    /// from then on.
    broken: bool,
}

impl Run<'_> {
    fn record(&mut self, step: WorkflowStep, outcome: StepOutcome) {
        match &outcome {
            StepOutcome::Succeeded(_) => debug!(?step, "step succeeded"),
            StepOutcome::Failed(reason) => {
                error!(order_id = self.order_id, ?step, %reason, "step failed");
                self.broken = true;
            }
            StepOutcome::Skipped(reason) => {
                warn!(order_id = self.order_id, ?step, %reason, "step skipped");
            }
        }
        self.steps.push(StepRecord { step, outcome });
    }

    fn record_result(&mut self, step: WorkflowStep, result: Result<Outcome, Error>) {
        let outcome = match result {
            Ok(Outcome::Success(body)) => StepOutcome::Succeeded(body),
            Ok(Outcome::ServerError { message, .. }) => StepOutcome::Failed(message),
            Err(e) => StepOutcome::Failed(e.to_string()),
        };
        self.record(step, outcome);
    }

    /// Submit every planned transaction; a failure does not stop the others.
    async fn submit(&mut self, planned: Vec<(u64, PlannedTransaction)>) {
        let client = self.client;
        for (variation_id, transaction) in planned {
            let step = WorkflowStep::Transaction {
                direction: transaction.direction(),
                variation_id,
                location_id: transaction.location_id(),
            };
            match transaction {
                PlannedTransaction::Ready(record) => {
                    let result = client.create_transaction(&record).await;
                    self.record_result(step, result);
                }
                PlannedTransaction::Unmatched { variation_id, .. } => self.record(
                    step,
                    StepOutcome::Failed(format!(
                        "order contains no item for variation {variation_id}"
                    )),
                ),
            }
        }
    }

    async fn book(&mut self, step: WorkflowStep) {
        if self.broken {
            self.record(step, StepOutcome::Skipped("an earlier step failed".into()));
            return;
        }
        let result = self.client.book_order(self.order_id).await;
        self.record_result(step, result);
    }

    async fn set_date(&mut self, step: WorkflowStep, date: OrderDate) {
        if self.broken {
            self.record(step, StepOutcome::Skipped("an earlier step failed".into()));
            return;
        }
        let result = self.client.update_order_dates(self.order_id, &[date]).await;
        self.record_result(step, result);
    }
}

impl PlentyClient {
    /// Move stock between two warehouses as described by `template`.
    ///
    /// The template is validated first; an invalid template fails with
    /// [`Error::Validation`] before any request is made. If creating the
    /// order fails the error is returned as is. After that point failures
    /// no longer abort the run: they are recorded in the report and every
    /// remaining transaction is still submitted. Booking and date steps run
    /// only while no earlier step has failed.
    ///
    /// With `book_immediately` the outgoing transactions are booked after an
    /// initiation date is set, and the incoming ones are booked before the
    /// finish date is set.
    pub async fn create_redistribution(
        &self,
        template: &RedistributionTemplate,
        book_immediately: bool,
    ) -> Result<RedistributionReport, Error> {
        template.validate()?;

        let order = self
            .create_redistribution_order(&order_body(template))
            .await?
            .into_result()?;
        let order_id = order
            .get("id")
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::UnexpectedShape {
                route: "/rest/redistributions".into(),
                message: "created order carries no id".into(),
            })?;
        info!(order_id, "redistribution order created");

        let order_items = transaction::order_item_ids(&order);
        let mut run = Run {
            client: self,
            order_id,
            steps: Vec::new(),
            broken: false,
        };
        run.record(WorkflowStep::CreateOrder, StepOutcome::Succeeded(order.clone()));

        run.submit(transaction::derive_outgoing(template, &order_items)).await;

        if book_immediately {
            let date = OrderDate::initiated(dates::now_w3c());
            run.set_date(WorkflowStep::InitiateDate, date).await;
            run.book(WorkflowStep::BookOutgoing).await;
        }

        run.submit(transaction::derive_incoming(template, &order_items)).await;

        if book_immediately {
            run.book(WorkflowStep::BookIncoming).await;
            let date = OrderDate::finished(dates::now_w3c());
            run.set_date(WorkflowStep::FinishDate, date).await;
        }

        let report = RedistributionReport {
            order_id,
            order,
            steps: run.steps,
        };
        if report.is_complete() {
            info!(order_id, steps = report.steps.len(), "redistribution finished");
        } else {
            warn!(
                order_id,
                failed = report.failures().count(),
                "redistribution finished with failed steps"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::redistribution::template::{LocationTransfer, VariationTransfer};

    #[test]
    fn order_body_carries_items_and_relations() {
        let template = RedistributionTemplate::new(10, 20, 1).variation(
            VariationTransfer::new(5, 3)
                .name("Tea")
                .price(4.5)
                .location(LocationTransfer::new(100, 3)),
        );

        let body = serde_json::to_value(order_body(&template)).unwrap();

        assert_eq!(
            body,
            json!({
                "typeId": 15,
                "plentyId": 1,
                "orderItems": [{
                    "typeId": 1,
                    "itemVariationId": 5,
                    "quantity": 3,
                    "orderItemName": "Tea",
                    "amounts": [{"currency": "EUR", "priceOriginalGross": 4.5}]
                }],
                "relations": [
                    {"referenceType": "warehouse", "referenceId": 10, "relation": "sender"},
                    {"referenceType": "warehouse", "referenceId": 20, "relation": "receiver"}
                ]
            })
        );
    }

    #[test]
    fn report_helpers_filter_steps() {
        let report = RedistributionReport {
            order_id: 1,
            order: json!({"id": 1}),
            steps: vec![
                StepRecord {
                    step: WorkflowStep::CreateOrder,
                    outcome: StepOutcome::Succeeded(json!({})),
                },
                StepRecord {
                    step: WorkflowStep::Transaction {
                        direction: Direction::Out,
                        variation_id: 5,
                        location_id: 100,
                    },
                    outcome: StepOutcome::Failed("nope".into()),
                },
                StepRecord {
                    step: WorkflowStep::BookOutgoing,
                    outcome: StepOutcome::Skipped("an earlier step failed".into()),
                },
            ],
        };

        assert!(!report.is_complete());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.transactions(Direction::Out).count(), 1);
        assert_eq!(report.transactions(Direction::In).count(), 0);
    }
}
