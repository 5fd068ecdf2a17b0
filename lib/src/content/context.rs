use std::sync::Arc;

use crate::value::Value;

/// The variables visible to a template while it renders, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    vars: Vec<(Arc<str>, Value)>,
}

impl RenderContext {
    pub fn new() -> Self {
        RenderContext::default()
    }

    /// Sets `key` to `value`. An existing variable keeps its position.
    pub fn insert<K, V>(&mut self, key: K, value: V) -> Option<Value>
        where K: Into<Arc<str>>, V: Into<Value>
    {
        let (key, value) = (key.into(), value.into());
        match self.vars.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.vars.push((key, value));
                None
            }
        }
    }

    /// Returns a copy of `self` with `key` set to `value`.
    pub fn with<K, V>(&self, key: K, value: V) -> Self
        where K: Into<Arc<str>>, V: Into<Value>
    {
        let mut context = self.clone();
        context.insert(key, value);
        context
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.iter()
            .find(|(k, _)| &**k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.vars.iter().map(|(k, _)| &**k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.vars.iter().map(|(k, v)| (&**k, v))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
