// Response reshaping helpers
//
// Pure functions over aggregated records. They never touch the network and
// tolerate missing fields by skipping the affected record.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::pagination::Record;

/// VAT configurations of one country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VatCountry {
    /// VAT configuration ids, in response order.
    pub config: Vec<String>,
    #[serde(rename = "TaxId")]
    pub tax_id: Option<String>,
}

/// Group `/rest/vat` entries by country id, optionally restricted to `subset`.
pub fn create_vat_mapping(
    entries: &[Record],
    subset: Option<&[u64]>,
) -> BTreeMap<String, VatCountry> {
    let mut mapping: BTreeMap<String, VatCountry> = BTreeMap::new();

    for entry in entries {
        let (Some(country), Some(id)) = (entry.get("countryId"), entry.get("id")) else {
            warn!("VAT entry without countryId or id skipped");
            continue;
        };
        if let Some(subset) = subset {
            if !country.as_u64().is_some_and(|c| subset.contains(&c)) {
                continue;
            }
        }

        let tax_id = entry
            .get("taxIdNumber")
            .and_then(Value::as_str)
            .map(str::to_owned);
        mapping
            .entry(scalar_key(country))
            .or_insert_with(|| VatCountry {
                config: Vec::new(),
                tax_id,
            })
            .config
            .push(scalar_key(id));
    }

    mapping
}

/// Attach `linked_variations` to every attribute value.
///
/// `variations` must have been fetched with `variationAttributeValues`;
/// `attributes` with `values`. If a variation lacks the attribute values the
/// attributes are returned unchanged.
pub fn attribute_variation_mapping(
    variations: &[Record],
    mut attributes: Vec<Record>,
) -> Vec<Record> {
    // attribute id -> value id -> variation ids
    let mut links: HashMap<String, HashMap<String, Vec<Value>>> = HashMap::new();

    for variation in variations {
        let Some(values) = variation
            .get("variationAttributeValues")
            .and_then(Value::as_array)
        else {
            warn!("variations without attribute values used for attribute mapping");
            return attributes;
        };
        let variation_id = variation.get("id").cloned().unwrap_or(Value::Null);

        for value in values {
            let (Some(attribute_id), Some(value_id)) =
                (value.get("attributeId"), value.get("valueId"))
            else {
                continue;
            };
            links
                .entry(scalar_key(attribute_id))
                .or_default()
                .entry(scalar_key(value_id))
                .or_default()
                .push(variation_id.clone());
        }
    }

    for attribute in &mut attributes {
        let Some(by_value) = attribute.get("id").and_then(|id| links.get(&scalar_key(id))) else {
            continue;
        };
        let Some(values) = attribute.get_mut("values").and_then(Value::as_array_mut) else {
            continue;
        };
        for value in values {
            let linked = value
                .get("id")
                .and_then(|id| by_value.get(&scalar_key(id)))
                .cloned();
            if let (Some(linked), Some(obj)) = (linked, value.as_object_mut()) {
                obj.insert("linked_variations".into(), Value::Array(linked));
            }
        }
    }

    attributes
}

/// Sales price configuration reduced to the ids that matter for pricing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceConfiguration {
    pub id: Value,
    #[serde(rename = "type")]
    pub price_type: Value,
    pub position: Value,
    /// Language code -> external name.
    pub names: BTreeMap<String, Value>,
    pub referrers: Vec<Value>,
    pub clients: Vec<Value>,
    pub countries: Vec<Value>,
    pub currencies: Vec<Value>,
    pub customer_classes: Vec<Value>,
}

/// Drop dates and nested mapping objects from a `/rest/items/sales_prices` entry.
pub fn shrink_price_configuration(entry: &Record) -> Option<PriceConfiguration> {
    let field = |key: &str| entry.get(key).cloned().unwrap_or(Value::Null);
    let ids = |key: &str, sub: &str| -> Vec<Value> {
        entry
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(|item| item.get(sub).cloned()).collect())
            .unwrap_or_default()
    };

    entry.get("id")?;

    let names = entry
        .get("names")
        .and_then(Value::as_array)
        .map(|names| {
            names
                .iter()
                .filter_map(|name| {
                    let lang = name.get("lang")?.as_str()?.to_owned();
                    Some((lang, name.get("nameExternal")?.clone()))
                })
                .collect()
        })
        .unwrap_or_default();

    Some(PriceConfiguration {
        id: field("id"),
        price_type: field("type"),
        position: field("position"),
        names,
        referrers: ids("referrers", "referrerId"),
        clients: ids("clients", "plentyId"),
        countries: ids("countries", "countryId"),
        currencies: ids("currencies", "currency"),
        customer_classes: ids("customerClasses", "customerClassId"),
    })
}

/// Ids arrive as numbers or strings depending on the endpoint.
fn scalar_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn records(value: Value) -> Vec<Record> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn vat_entries_group_by_country() {
        let entries = records(json!([
            {"id": 1, "countryId": 1, "taxIdNumber": "DE123"},
            {"id": 2, "countryId": 1, "taxIdNumber": "DE123"},
            {"id": 3, "countryId": 12, "taxIdNumber": "GB999"},
        ]));

        let mapping = create_vat_mapping(&entries, None);
        assert_eq!(mapping["1"].config, vec!["1", "2"]);
        assert_eq!(mapping["12"].tax_id.as_deref(), Some("GB999"));

        let subset = create_vat_mapping(&entries, Some([12].as_slice()));
        assert_eq!(subset.keys().collect::<Vec<_>>(), vec!["12"]);
    }

    #[test]
    fn attribute_values_get_linked_variations() {
        let variations = records(json!([
            {"id": 10, "variationAttributeValues": [{"attributeId": 1, "valueId": 5}]},
            {"id": 11, "variationAttributeValues": [{"attributeId": 1, "valueId": 5}]},
            {"id": 12, "variationAttributeValues": [{"attributeId": 1, "valueId": 6}]},
        ]));
        let attributes = records(json!([
            {"id": 1, "values": [{"id": 5}, {"id": 6}, {"id": 7}]},
        ]));

        let mapped = attribute_variation_mapping(&variations, attributes);
        let values = mapped[0]["values"].as_array().unwrap();
        assert_eq!(values[0]["linked_variations"], json!([10, 11]));
        assert_eq!(values[1]["linked_variations"], json!([12]));
        assert!(values[2].get("linked_variations").is_none());
    }

    #[test]
    fn variations_without_values_leave_attributes_untouched() {
        let variations = records(json!([{"id": 10}]));
        let attributes = records(json!([{"id": 1, "values": [{"id": 5}]}]));

        let mapped = attribute_variation_mapping(&variations, attributes.clone());
        assert_eq!(mapped, attributes);
    }

    #[test]
    fn price_configuration_is_shrunk() {
        let entry = records(json!([{
            "id": 1,
            "type": "default",
            "position": 0,
            "createdAt": "2020-01-01T00:00:00+01:00",
            "names": [{"lang": "de", "nameExternal": "Preis"}],
            "referrers": [{"referrerId": 1.0, "salesPriceId": 1}],
            "clients": [{"plentyId": 42}],
            "countries": [{"countryId": 1}],
            "currencies": [{"currency": "EUR"}],
            "customerClasses": [{"customerClassId": 0}],
        }]))
        .remove(0);

        let shrunk = shrink_price_configuration(&entry).unwrap();
        assert_eq!(shrunk.names["de"], json!("Preis"));
        assert_eq!(shrunk.referrers, vec![json!(1.0)]);
        assert_eq!(shrunk.clients, vec![json!(42)]);
        assert_eq!(shrunk.currencies, vec![json!("EUR")]);
        assert!(!serde_json::to_string(&shrunk).unwrap().contains("createdAt"));
    }
}
