//! A small document-store-shaped backend for the webhook service's
//! `installations`/`configurations`/`tasks`/`pull_requests` collections:
//! JSON documents keyed by id, queried with the same
//! `pageIndex`/`pageSize`/`sortField`/`sortOrder` shape a real document
//! database would expose, plus per-field equality filters.

use std::collections::BTreeMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    pub page_index: usize,
    pub page_size: usize,
    pub sort_field: Option<String>,
    pub sort_order: Option<SortOrder>,
    /// Equality filters, field name -> expected value.
    pub filters: Vec<(String, Value)>,
}

impl PageRequest {
    pub fn new(page_index: usize, page_size: usize) -> Self {
        Self {
            page_index,
            page_size: page_size.max(1),
            ..Default::default()
        }
    }

    pub fn sorted_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_field = Some(field.into());
        self.sort_order = Some(order);
        self
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: usize,
}

/// An in-process document collection. Persistence is in-memory; the
/// webhook service process keeps one of these per collection for the
/// lifetime of the process, matching the task engine's "persist before and
/// after execution" contract without pulling in a database driver.
pub struct Collection<T> {
    documents: RwLock<BTreeMap<String, T>>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<T: Clone + Serialize> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, id: impl Into<String>, document: T) {
        self.documents.write().unwrap().insert(id.into(), document);
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.documents.read().unwrap().get(id).cloned()
    }

    pub fn remove(&self, id: &str) -> Option<T> {
        self.documents.write().unwrap().remove(id)
    }

    pub fn len(&self) -> usize {
        self.documents.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Filters, sorts, then pages. Filtering and sorting compare through
    /// `serde_json::to_value`, so callers name fields the way they'd name a
    /// JSON key rather than a Rust field.
    pub fn query(&self, request: &PageRequest) -> Page<T> {
        let documents = self.documents.read().unwrap();
        let mut matched: Vec<&T> = documents
            .values()
            .filter(|doc| {
                let Ok(value) = serde_json::to_value(doc) else {
                    return false;
                };
                request.filters.iter().all(|(field, expected)| value.get(field) == Some(expected))
            })
            .collect();

        if let Some(field) = &request.sort_field {
            matched.sort_by(|a, b| {
                let av = serde_json::to_value(a).ok().and_then(|v| v.get(field).cloned());
                let bv = serde_json::to_value(b).ok().and_then(|v| v.get(field).cloned());
                compare_values(&av, &bv)
            });
            if request.sort_order == Some(SortOrder::Desc) {
                matched.reverse();
            }
        }

        let total_count = matched.len();
        let start = request.page_index.saturating_mul(request.page_size).min(total_count);
        let end = (start + request.page_size).min(total_count);
        Page {
            items: matched[start..end].iter().map(|doc| (*doc).clone()).collect(),
            total_count,
        }
    }
}

fn compare_values(a: &Option<Value>, b: &Option<Value>) -> std::cmp::Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(std::cmp::Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        _ => std::cmp::Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    struct Task {
        id: String,
        status: String,
        attempt: u32,
    }

    fn sample() -> Collection<Task> {
        let collection = Collection::new();
        collection.upsert("1", Task { id: "1".into(), status: "done".into(), attempt: 3 });
        collection.upsert("2", Task { id: "2".into(), status: "pending".into(), attempt: 1 });
        collection.upsert("3", Task { id: "3".into(), status: "pending".into(), attempt: 2 });
        collection
    }

    #[test]
    fn filter_by_field_value() {
        let collection = sample();
        let page = collection.query(&PageRequest::new(0, 10).filter("status", "pending"));
        assert_eq!(page.total_count, 2);
    }

    #[test]
    fn sort_and_page() {
        let collection = sample();
        let page = collection.query(&PageRequest::new(0, 2).sorted_by("attempt", SortOrder::Asc));
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].attempt, 1);
        assert_eq!(page.total_count, 3);
    }

    #[test]
    fn second_page_respects_page_size() {
        let collection = sample();
        let page = collection.query(&PageRequest::new(1, 2).sorted_by("attempt", SortOrder::Asc));
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].attempt, 3);
    }
}
