use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Exact-match predicates, field name -> expected value. Conjunctive.
pub type FilterSet = BTreeMap<String, String>;

/// Borrowing accessor for one searchable field of a record.
pub type FieldAccessor<R> = for<'a> fn(&'a R) -> &'a str;

/// Named-field access used by exact-match filtering. Returning `None` for an
/// unknown field makes the record non-matching for that predicate.
pub trait FieldLookup {
    fn field(&self, name: &str) -> Option<&str>;
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl QueryError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub query: Option<String>,
    pub filters: FilterSet,
}

/// Extracts the free-text query and the exact-match filter map from raw IPC
/// params. Blank or "ALL" values mean "no constraint"; null filter entries are
/// dropped; anything that is not a string is a caller error.
pub fn parse_list_query(raw: &serde_json::Value) -> Result<ListQuery, QueryError> {
    let query = match raw.get("query") {
        None => None,
        Some(v) if v.is_null() => None,
        Some(v) => {
            let Some(s) = v.as_str() else {
                return Err(QueryError::new("bad_params", "query must be a string"));
            };
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        }
    };

    let mut filters = FilterSet::new();
    match raw.get("filters") {
        None => {}
        Some(v) if v.is_null() => {}
        Some(v) => {
            let Some(obj) = v.as_object() else {
                return Err(QueryError::new("bad_params", "filters must be an object"));
            };
            for (name, value) in obj {
                if value.is_null() {
                    continue;
                }
                let Some(s) = value.as_str() else {
                    return Err(QueryError::new(
                        "bad_params",
                        format!("filters.{} must be a string or null", name),
                    ));
                };
                let t = s.trim();
                if t.is_empty() || t.eq_ignore_ascii_case("ALL") {
                    continue;
                }
                filters.insert(name.clone(), t.to_string());
            }
        }
    }

    Ok(ListQuery { query, filters })
}

/// Free-text search: a record matches when at least one field contains the
/// lower-cased query as a substring. An empty query selects everything, in
/// input order.
pub fn search<'r, R, I>(records: I, query: &str, fields: &[FieldAccessor<R>]) -> Vec<&'r R>
where
    I: IntoIterator<Item = &'r R>,
{
    if query.is_empty() {
        return records.into_iter().collect();
    }
    let needle = query.to_lowercase();
    records
        .into_iter()
        .filter(|&r| fields.iter().any(|f| f(r).to_lowercase().contains(&needle)))
        .collect()
}

/// Exact-match filtering: a record matches when every filter entry equals the
/// record's field value. A field the record does not have never matches.
pub fn apply_filters<'r, R, I>(records: I, filters: &FilterSet) -> Vec<&'r R>
where
    R: FieldLookup,
    I: IntoIterator<Item = &'r R>,
{
    records
        .into_iter()
        .filter(|&r| {
            filters
                .iter()
                .all(|(name, want)| r.field(name).map(|have| have == want).unwrap_or(false))
        })
        .collect()
}

pub fn count_where<R>(records: &[&R], predicate: impl Fn(&R) -> bool) -> usize {
    records.iter().copied().filter(|&r| predicate(r)).count()
}

pub fn sum_by<R>(records: &[&R], value: impl Fn(&R) -> f64) -> f64 {
    records.iter().copied().map(|r| value(r)).sum()
}

/// `(numerator / denominator) * 100`, defined as 0 when the denominator is 0
/// so rates over empty collections stay displayable.
pub fn percentage_of_total(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    (numerator / denominator) * 100.0
}

pub enum Reduction<'a, R> {
    CountWhere(&'a dyn Fn(&R) -> bool),
    Sum(&'a dyn Fn(&R) -> f64),
    PercentOfTotal { numerator: f64, denominator: f64 },
}

pub struct AggregationSpec<'a, R> {
    pub name: &'a str,
    pub reduction: Reduction<'a, R>,
}

/// A recomputed-on-demand bundle of named aggregates. Holds no state of its
/// own; serializes as a flat name -> number map.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Summary(pub BTreeMap<String, f64>);

pub fn summarize<'r, R, I>(records: I, specs: &[AggregationSpec<'_, R>]) -> Summary
where
    R: 'r,
    I: IntoIterator<Item = &'r R>,
{
    let rows: Vec<&R> = records.into_iter().collect();
    let mut out = BTreeMap::new();
    for spec in specs {
        let value = match &spec.reduction {
            Reduction::CountWhere(pred) => count_where(&rows, |r| pred(r)) as f64,
            Reduction::Sum(value) => sum_by(&rows, |r| value(r)),
            Reduction::PercentOfTotal {
                numerator,
                denominator,
            } => percentage_of_total(*numerator, *denominator),
        };
        out.insert(spec.name.to_string(), value);
    }
    Summary(out)
}
