//! `filter { name = ..., values = [...] }` handling for data sources
//!
//! Listed API objects are flattened into a JSON map and kept when every
//! filter matches: the value under `name` must equal one of `values`. Scalars
//! compare by their string form and arrays match when any element does.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tfplug::types::Config;
use tfplug::{AttributeBuilder, AttributeType, BlockBuilder};

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    #[error("no results were found")]
    NoResults,

    #[error("your search returned too many results. Please refine your search to be more specific")]
    TooManyResults,

    #[error("failed to flatten API object: {0}")]
    Flatten(String),
}

/// The `filter` set block every filtering data source carries
pub fn filter_schema() -> BlockBuilder {
    BlockBuilder::set("filter")
        .description("Query the API for one object by attribute value")
        .min_items(1)
        .attribute(
            AttributeBuilder::string("name")
                .required()
                .description("Attribute name to filter on"),
        )
        .attribute(
            AttributeBuilder::list("values", AttributeType::String)
                .required()
                .description("One or more values to match"),
        )
}

pub fn build_filters(config: &Config) -> Vec<Filter> {
    config
        .get_blocks("filter")
        .into_iter()
        .filter_map(|block| {
            Some(Filter {
                name: block.get_string("name")?,
                values: block.get_string_list("values"),
            })
        })
        .collect()
}

/// The JSON view of an API object, keyed by its serialized field names
pub fn struct_to_map<T: Serialize>(item: &T) -> Result<HashMap<String, Value>, FilterError> {
    match serde_json::to_value(item).map_err(|e| FilterError::Flatten(e.to_string()))? {
        Value::Object(fields) => Ok(fields.into_iter().collect()),
        other => Err(FilterError::Flatten(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

/// True when every filter matches the flattened object
pub fn filter_loop(filters: &[Filter], map: &HashMap<String, Value>) -> bool {
    filters.iter().all(|filter| {
        map.get(&filter.name)
            .is_some_and(|value| values_match(&filter.values, value))
    })
}

fn values_match(values: &[String], value: &Value) -> bool {
    match value {
        Value::Array(items) => items.iter().any(|item| values_match(values, item)),
        Value::Null | Value::Object(_) => false,
        scalar => {
            let text = scalar_text(scalar);
            values.iter().any(|v| *v == text)
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) => f.to_string(),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Selects the single listed object matching every filter
pub fn find_one<T: Serialize>(
    items: Vec<T>,
    filters: &[Filter],
    kind: &str,
) -> Result<T, FilterError> {
    let mut matches = Vec::new();
    for item in items {
        if filter_loop(filters, &struct_to_map(&item)?) {
            matches.push(item);
        }
    }

    tracing::debug!("{} {} objects matched {} filters", matches.len(), kind, filters.len());
    match matches.len() {
        0 => Err(FilterError::NoResults),
        1 => Ok(matches.remove(0)),
        _ => Err(FilterError::TooManyResults),
    }
}

/// Flattens a nested API struct into the object value of a
/// `list(object(...))` attribute
pub fn flatten_object<T: Serialize>(item: &T) -> Result<Map<String, Value>, FilterError> {
    Ok(struct_to_map(item)?.into_iter().collect())
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serde_json::json;
    use tfplug::types::{Dynamic, DynamicValue};

    #[derive(Serialize)]
    struct Plan {
        id: String,
        vcpu_count: i64,
        monthly_cost: f64,
        locations: Vec<String>,
        #[serde(rename = "type")]
        plan_type: String,
        dedicated: bool,
    }

    fn plan(id: &str, vcpus: i64, cost: f64, locations: &[&str]) -> Plan {
        Plan {
            id: id.to_string(),
            vcpu_count: vcpus,
            monthly_cost: cost,
            locations: locations.iter().map(|l| l.to_string()).collect(),
            plan_type: "vc2".to_string(),
            dedicated: false,
        }
    }

    fn filter(name: &str, values: &[&str]) -> Filter {
        Filter {
            name: name.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    #[test]
    fn struct_to_map_uses_serialized_names() {
        let map = struct_to_map(&plan("vc2-1c-1gb", 1, 5.0, &["ewr"])).unwrap();
        assert_eq!(map.get("type"), Some(&json!("vc2")));
        assert_eq!(map.get("vcpu_count"), Some(&json!(1)));
        assert!(!map.contains_key("plan_type"));
    }

    #[test]
    fn scalars_match_by_string_form() {
        let map = struct_to_map(&plan("vc2-2c-4gb", 2, 20.0, &["ewr"])).unwrap();

        assert!(filter_loop(&[filter("vcpu_count", &["2"])], &map));
        assert!(filter_loop(&[filter("monthly_cost", &["20"])], &map));
        assert!(filter_loop(&[filter("dedicated", &["false"])], &map));
        assert!(!filter_loop(&[filter("vcpu_count", &["4"])], &map));
    }

    #[test]
    fn arrays_match_when_any_element_matches() {
        let map = struct_to_map(&plan("vc2-1c-1gb", 1, 5.0, &["ewr", "ams"])).unwrap();
        assert!(filter_loop(&[filter("locations", &["sjc", "ams"])], &map));
        assert!(!filter_loop(&[filter("locations", &["sjc"])], &map));
    }

    #[test]
    fn every_filter_must_match_and_unknown_names_never_match() {
        let map = struct_to_map(&plan("vc2-1c-1gb", 1, 5.0, &["ewr"])).unwrap();
        assert!(filter_loop(
            &[filter("id", &["vc2-1c-1gb"]), filter("locations", &["ewr"])],
            &map
        ));
        assert!(!filter_loop(
            &[filter("id", &["vc2-1c-1gb"]), filter("locations", &["ams"])],
            &map
        ));
        assert!(!filter_loop(&[filter("no_such_field", &["x"])], &map));
    }

    #[test]
    fn find_one_requires_exactly_one_match() {
        let plans = || {
            vec![
                plan("vc2-1c-1gb", 1, 5.0, &["ewr"]),
                plan("vc2-1c-2gb", 1, 10.0, &["ewr"]),
                plan("vc2-2c-4gb", 2, 20.0, &["ams"]),
            ]
        };

        let found = find_one(plans(), &[filter("vcpu_count", &["2"])], "plan").unwrap();
        assert_eq!(found.id, "vc2-2c-4gb");

        assert_eq!(
            find_one(plans(), &[filter("vcpu_count", &["1"])], "plan").err(),
            Some(FilterError::TooManyResults)
        );
        assert_eq!(
            find_one(plans(), &[filter("vcpu_count", &["8"])], "plan").err(),
            Some(FilterError::NoResults)
        );
    }

    #[test]
    fn build_filters_reads_the_set_block() {
        let mut block = DynamicValue::new();
        block.set_string("name", "region");
        block.set_string_list("values", ["ewr", "ams"]);
        let mut config = DynamicValue::new();
        config.set("filter", Dynamic::List(vec![block.into_dynamic()]));

        assert_eq!(build_filters(&config), vec![filter("region", &["ewr", "ams"])]);
    }

    #[test]
    fn error_messages() {
        assert_eq!(FilterError::NoResults.to_string(), "no results were found");
        assert!(FilterError::TooManyResults
            .to_string()
            .starts_with("your search returned too many results"));
    }
}
