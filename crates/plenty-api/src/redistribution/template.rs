// Redistribution template
//
// Declarative description of a stock transfer between two warehouses. A
// template is validated in full before any request is issued; every
// violation is collected so the caller can fix them in one go.

use std::collections::HashSet;
use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::dates;

fn default_currency() -> String {
    "EUR".to_owned()
}

/// A stock transfer from `sender` to `receiver` warehouse.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RedistributionTemplate {
    /// Sending warehouse id.
    pub sender: u64,
    /// Receiving warehouse id.
    pub receiver: u64,
    pub plenty_id: u64,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Attached to every transaction when set.
    #[serde(default)]
    pub user_id: Option<u64>,
    pub variations: Vec<VariationTransfer>,
}

/// One variation moved by the transfer. Becomes one order item.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VariationTransfer {
    pub variation_id: u64,
    #[serde(default)]
    pub name: String,
    pub total_quantity: u32,
    #[serde(default)]
    pub price: f64,
    /// Storage locations to book out of. Without locations the order item is
    /// created but no outgoing transaction is derived.
    #[serde(default)]
    pub locations: Vec<LocationTransfer>,
}

/// A storage location of the sending warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocationTransfer {
    pub location_id: u64,
    pub quantity: u32,
    #[serde(default)]
    pub batch: Option<String>,
    #[serde(default)]
    pub best_before_date: Option<String>,
    #[serde(default)]
    pub identification: Option<String>,
    /// Storage locations of the receiving warehouse.
    #[serde(default)]
    pub targets: Vec<TargetLocation>,
}

/// A storage location of the receiving warehouse.
///
/// Unset batch, best before date and identification are taken from the
/// source location.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TargetLocation {
    pub location_id: u64,
    pub quantity: u32,
    #[serde(default)]
    pub batch: Option<String>,
    #[serde(default)]
    pub best_before_date: Option<String>,
    #[serde(default)]
    pub identification: Option<String>,
}

// ── Builders ─────────────────────────────────────────────────────────

impl RedistributionTemplate {
    pub fn new(sender: u64, receiver: u64, plenty_id: u64) -> Self {
        Self {
            sender,
            receiver,
            plenty_id,
            currency: default_currency(),
            user_id: None,
            variations: Vec::new(),
        }
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn user_id(mut self, user_id: u64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn variation(mut self, variation: VariationTransfer) -> Self {
        self.variations.push(variation);
        self
    }
}

impl VariationTransfer {
    pub fn new(variation_id: u64, total_quantity: u32) -> Self {
        Self {
            variation_id,
            name: String::new(),
            total_quantity,
            price: 0.0,
            locations: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    pub fn location(mut self, location: LocationTransfer) -> Self {
        self.locations.push(location);
        self
    }
}

impl LocationTransfer {
    pub fn new(location_id: u64, quantity: u32) -> Self {
        Self {
            location_id,
            quantity,
            batch: None,
            best_before_date: None,
            identification: None,
            targets: Vec::new(),
        }
    }

    pub fn batch(mut self, batch: impl Into<String>) -> Self {
        self.batch = Some(batch.into());
        self
    }

    pub fn best_before_date(mut self, date: impl Into<String>) -> Self {
        self.best_before_date = Some(date.into());
        self
    }

    pub fn identification(mut self, identification: impl Into<String>) -> Self {
        self.identification = Some(identification.into());
        self
    }

    pub fn target(mut self, target: TargetLocation) -> Self {
        self.targets.push(target);
        self
    }
}

impl TargetLocation {
    pub fn new(location_id: u64, quantity: u32) -> Self {
        Self {
            location_id,
            quantity,
            batch: None,
            best_before_date: None,
            identification: None,
        }
    }

    pub fn batch(mut self, batch: impl Into<String>) -> Self {
        self.batch = Some(batch.into());
        self
    }
}

// ── Validation ───────────────────────────────────────────────────────

/// A single broken template rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    NoVariations,
    SameWarehouse { warehouse: u64 },
    /// A variation is listed more than once.
    DuplicateVariation { variation_id: u64 },
    /// Location quantities of a variation do not add up to its total.
    LocationSum {
        variation_id: u64,
        expected: u32,
        actual: u64,
    },
    /// Target quantities of a location do not add up to its quantity.
    TargetSum {
        variation_id: u64,
        location_id: u64,
        expected: u32,
        actual: u64,
    },
    InvalidBestBeforeDate { variation_id: u64, value: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoVariations => f.write_str("template contains no variations"),
            Self::SameWarehouse { warehouse } => {
                write!(f, "sender and receiver are both warehouse {warehouse}")
            }
            Self::DuplicateVariation { variation_id } => {
                write!(f, "variation {variation_id} is listed more than once")
            }
            Self::LocationSum {
                variation_id,
                expected,
                actual,
            } => write!(
                f,
                "variation {variation_id}: locations sum to {actual}, total quantity is {expected}"
            ),
            Self::TargetSum {
                variation_id,
                location_id,
                expected,
                actual,
            } => write!(
                f,
                "variation {variation_id}, location {location_id}: targets sum to {actual}, \
                 location quantity is {expected}"
            ),
            Self::InvalidBestBeforeDate {
                variation_id,
                value,
            } => write!(f, "variation {variation_id}: invalid best before date '{value}'"),
        }
    }
}

/// A template was rejected before any request was made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid redistribution template: {}", join(.violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

fn join(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl RedistributionTemplate {
    /// Check every quantity rule of the template.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut violations = Vec::new();

        if self.variations.is_empty() {
            violations.push(Violation::NoVariations);
        }
        if self.sender == self.receiver {
            violations.push(Violation::SameWarehouse {
                warehouse: self.sender,
            });
        }

        let mut seen = HashSet::new();
        let mut duplicates = HashSet::new();
        for variation in &self.variations {
            let variation_id = variation.variation_id;

            if !seen.insert(variation_id) && duplicates.insert(variation_id) {
                violations.push(Violation::DuplicateVariation { variation_id });
            }

            if !variation.locations.is_empty() {
                let actual: u64 = variation
                    .locations
                    .iter()
                    .map(|location| u64::from(location.quantity))
                    .sum();
                if actual != u64::from(variation.total_quantity) {
                    violations.push(Violation::LocationSum {
                        variation_id,
                        expected: variation.total_quantity,
                        actual,
                    });
                }
            }

            for location in &variation.locations {
                if !location.targets.is_empty() {
                    let actual: u64 = location
                        .targets
                        .iter()
                        .map(|target| u64::from(target.quantity))
                        .sum();
                    if actual != u64::from(location.quantity) {
                        violations.push(Violation::TargetSum {
                            variation_id,
                            location_id: location.location_id,
                            expected: location.quantity,
                            actual,
                        });
                    }
                }

                let best_before = location
                    .best_before_date
                    .iter()
                    .chain(location.targets.iter().filter_map(|t| t.best_before_date.as_ref()));
                for value in best_before {
                    if dates::parse(value).is_err() {
                        violations.push(Violation::InvalidBestBeforeDate {
                            variation_id,
                            value: value.clone(),
                        });
                    }
                }
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { violations })
        }
    }
}
