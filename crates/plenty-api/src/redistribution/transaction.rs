// Transaction derivation
//
// Turns a validated template plus the order items the server created into
// the stock movements to submit. Outgoing movements come from the source
// locations, incoming ones from their targets.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use super::template::{LocationTransfer, RedistributionTemplate};
use crate::dates;

/// Status every redistribution transaction is created with.
pub const TRANSACTION_STATUS: &str = "regular";

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Out,
    In,
}

/// Body of `POST /rest/orders/items/{orderItemId}/transactions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub order_item_id: u64,
    pub quantity: u32,
    pub direction: Direction,
    pub status: String,
    pub warehouse_location_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_before_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identification: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
}

/// A movement ready to submit, or one whose variation has no order item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedTransaction {
    Ready(TransactionRecord),
    Unmatched {
        variation_id: u64,
        location_id: u64,
        direction: Direction,
    },
}

impl PlannedTransaction {
    pub fn direction(&self) -> Direction {
        match self {
            Self::Ready(record) => record.direction,
            Self::Unmatched { direction, .. } => *direction,
        }
    }

    pub fn location_id(&self) -> u64 {
        match self {
            Self::Ready(record) => record.warehouse_location_id,
            Self::Unmatched { location_id, .. } => *location_id,
        }
    }
}

/// Variation id -> order item id, read from a created order.
///
/// Entries without `id` or `itemVariationId` are ignored. Relies on a
/// validated template, which lists each variation once.
pub fn order_item_ids(order: &Value) -> HashMap<u64, u64> {
    order
        .get("orderItems")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let variation = item.get("itemVariationId")?.as_u64()?;
                    let id = item.get("id")?.as_u64()?;
                    Some((variation, id))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// One outgoing movement per explicit source location, in template order.
pub fn derive_outgoing(
    template: &RedistributionTemplate,
    order_items: &HashMap<u64, u64>,
) -> Vec<(u64, PlannedTransaction)> {
    let mut planned = Vec::new();
    for variation in &template.variations {
        for location in &variation.locations {
            let stock = Stock::of(location);
            planned.push((
                variation.variation_id,
                plan(
                    template,
                    order_items,
                    variation.variation_id,
                    location.location_id,
                    location.quantity,
                    Direction::Out,
                    stock,
                ),
            ));
        }
    }
    planned
}

/// One incoming movement per target location, in template order.
pub fn derive_incoming(
    template: &RedistributionTemplate,
    order_items: &HashMap<u64, u64>,
) -> Vec<(u64, PlannedTransaction)> {
    let mut planned = Vec::new();
    for variation in &template.variations {
        for location in &variation.locations {
            let inherited = Stock::of(location);
            for target in &location.targets {
                let stock = Stock {
                    batch: target.batch.as_ref().or(inherited.batch),
                    best_before_date: target
                        .best_before_date
                        .as_ref()
                        .or(inherited.best_before_date),
                    identification: target
                        .identification
                        .as_ref()
                        .or(inherited.identification),
                };
                planned.push((
                    variation.variation_id,
                    plan(
                        template,
                        order_items,
                        variation.variation_id,
                        target.location_id,
                        target.quantity,
                        Direction::In,
                        stock,
                    ),
                ));
            }
        }
    }
    planned
}

/// Batch attributes carried by a movement.
#[derive(Clone, Copy)]
struct Stock<'a> {
    batch: Option<&'a String>,
    best_before_date: Option<&'a String>,
    identification: Option<&'a String>,
}

impl<'a> Stock<'a> {
    fn of(location: &'a LocationTransfer) -> Self {
        Self {
            batch: location.batch.as_ref(),
            best_before_date: location.best_before_date.as_ref(),
            identification: location.identification.as_ref(),
        }
    }
}

fn plan(
    template: &RedistributionTemplate,
    order_items: &HashMap<u64, u64>,
    variation_id: u64,
    location_id: u64,
    quantity: u32,
    direction: Direction,
    stock: Stock<'_>,
) -> PlannedTransaction {
    let Some(&order_item_id) = order_items.get(&variation_id) else {
        return PlannedTransaction::Unmatched {
            variation_id,
            location_id,
            direction,
        };
    };

    PlannedTransaction::Ready(TransactionRecord {
        order_item_id,
        quantity,
        direction,
        status: TRANSACTION_STATUS.to_owned(),
        warehouse_location_id: location_id,
        batch: stock.batch.cloned(),
        // Validated templates only carry parseable dates.
        best_before_date: stock
            .best_before_date
            .map(|raw| dates::parse_date(raw).unwrap_or_else(|_| raw.clone())),
        identification: stock.identification.cloned(),
        user_id: template.user_id,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::redistribution::template::{TargetLocation, VariationTransfer};

    fn order_items() -> HashMap<u64, u64> {
        order_item_ids(&json!({
            "id": 900,
            "orderItems": [
                {"id": 1001, "itemVariationId": 5},
                {"id": 1002, "itemVariationId": 6},
            ]
        }))
    }

    fn count(planned: &[(u64, PlannedTransaction)], variation: u64) -> usize {
        planned.iter().filter(|(v, _)| *v == variation).count()
    }

    #[test]
    fn derivation_counts_per_variation() {
        let template = RedistributionTemplate::new(10, 20, 1)
            .variation(
                VariationTransfer::new(5, 3)
                    .location(LocationTransfer::new(100, 1))
                    .location(LocationTransfer::new(101, 2)),
            )
            .variation(
                VariationTransfer::new(6, 4).location(
                    LocationTransfer::new(102, 4)
                        .target(TargetLocation::new(200, 3))
                        .target(TargetLocation::new(201, 1)),
                ),
            );
        let items = order_items();

        let outgoing = derive_outgoing(&template, &items);
        let incoming = derive_incoming(&template, &items);

        assert_eq!(count(&outgoing, 5), 2);
        assert_eq!(count(&incoming, 5), 0);
        assert_eq!(count(&outgoing, 6), 1);
        assert_eq!(count(&incoming, 6), 2);
        assert!(
            outgoing
                .iter()
                .chain(&incoming)
                .all(|(_, p)| matches!(p, PlannedTransaction::Ready(_)))
        );
    }

    #[test]
    fn outgoing_record_matches_order_item() {
        let template = RedistributionTemplate::new(10, 20, 1)
            .user_id(7)
            .variation(VariationTransfer::new(5, 3).location(LocationTransfer::new(100, 3)));

        let outgoing = derive_outgoing(&template, &order_items());

        assert_eq!(
            outgoing,
            vec![(
                5,
                PlannedTransaction::Ready(TransactionRecord {
                    order_item_id: 1001,
                    quantity: 3,
                    direction: Direction::Out,
                    status: "regular".into(),
                    warehouse_location_id: 100,
                    batch: None,
                    best_before_date: None,
                    identification: None,
                    user_id: Some(7),
                })
            )]
        );
    }

    #[test]
    fn targets_inherit_batch_data() {
        let template = RedistributionTemplate::new(10, 20, 1).variation(
            VariationTransfer::new(5, 2).location(
                LocationTransfer::new(100, 2)
                    .batch("B-1")
                    .best_before_date("2030-01-31T00:00:00+01:00")
                    .target(TargetLocation::new(200, 1))
                    .target(TargetLocation::new(201, 1).batch("B-2")),
            ),
        );

        let incoming = derive_incoming(&template, &order_items());
        let records: Vec<&TransactionRecord> = incoming
            .iter()
            .filter_map(|(_, p)| match p {
                PlannedTransaction::Ready(record) => Some(record),
                PlannedTransaction::Unmatched { .. } => None,
            })
            .collect();

        assert_eq!(records[0].batch.as_deref(), Some("B-1"));
        assert_eq!(records[1].batch.as_deref(), Some("B-2"));
        assert_eq!(
            records[1].best_before_date.as_deref(),
            Some("2030-01-31T00:00:00+01:00")
        );
        assert!(records.iter().all(|r| r.direction == Direction::In));
    }

    #[test]
    fn missing_order_item_is_unmatched() {
        let template = RedistributionTemplate::new(10, 20, 1)
            .variation(VariationTransfer::new(99, 1).location(LocationTransfer::new(100, 1)));

        let outgoing = derive_outgoing(&template, &order_items());
        assert_eq!(
            outgoing[0].1,
            PlannedTransaction::Unmatched {
                variation_id: 99,
                location_id: 100,
                direction: Direction::Out,
            }
        );
    }

    #[test]
    fn optional_fields_are_omitted_from_the_body() {
        let record = TransactionRecord {
            order_item_id: 1,
            quantity: 2,
            direction: Direction::In,
            status: TRANSACTION_STATUS.into(),
            warehouse_location_id: 3,
            batch: None,
            best_before_date: None,
            identification: None,
            user_id: None,
        };

        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "orderItemId": 1,
                "quantity": 2,
                "direction": "in",
                "status": "regular",
                "warehouseLocationId": 3,
            })
        );
    }
}
