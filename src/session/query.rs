//! Lazy, filterable views over a table

use serde::Serialize;
use serde_json::Value;

use crate::models::Entity;

use super::table::Table;

type Predicate<'a, T> = Box<dyn Fn(&T) -> bool + 'a>;

/// A query over the live rows of a table
///
/// Filters are applied when the query is iterated, so a query always reflects
/// the table it borrows.
pub struct Query<'a, T: Entity> {
    table: &'a Table<T>,
    filters: Vec<Predicate<'a, T>>,
}

impl<'a, T: Entity> Query<'a, T> {
    pub(crate) fn new(table: &'a Table<T>) -> Self {
        Self {
            table,
            filters: Vec::new(),
        }
    }

    /// Keep rows matching `predicate`
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + 'a,
    {
        self.filters.push(Box::new(predicate));
        self
    }

    /// Keep rows whose serialized `field` equals `value`
    pub fn filter_eq<V: Serialize>(self, field: &'a str, value: V) -> Self {
        let expected = serde_json::to_value(value).ok();
        self.filter(move |entity| match &expected {
            Some(expected) => field_value(entity, field).as_ref() == Some(expected),
            None => false,
        })
    }

    /// Keep rows whose serialized `field` is one of `values`
    pub fn filter_in<V, I>(self, field: &'a str, values: I) -> Self
    where
        V: Serialize,
        I: IntoIterator<Item = V>,
    {
        let allowed: Vec<Value> = values
            .into_iter()
            .filter_map(|value| serde_json::to_value(value).ok())
            .collect();
        self.filter(move |entity| {
            field_value(entity, field).is_some_and(|value| allowed.contains(&value))
        })
    }

    fn matches(&self, entity: &T) -> bool {
        self.filters.iter().all(|predicate| predicate(entity))
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a T> + '_ {
        self.table.rows().filter(move |entity| self.matches(entity))
    }

    pub fn first(&self) -> Option<&'a T> {
        self.iter().next()
    }

    /// Look up a row by id, honouring the filters
    pub fn get(&self, id: T::Id) -> Option<&'a T> {
        self.table.get(id).filter(|entity| self.matches(entity))
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.first().is_none()
    }

    pub fn ids(&self) -> Vec<T::Id> {
        self.iter().filter_map(|entity| entity.id()).collect()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

fn field_value<T: Serialize>(entity: &T, field: &str) -> Option<Value> {
    match serde_json::to_value(entity).ok()? {
        Value::Object(mut map) => map.remove(field),
        _ => None,
    }
}
