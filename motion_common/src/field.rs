//! Field store with change notification.
//!
//! A [`FieldStore`] holds named, typed attribute values. Every update runs
//! the value-changed test and, when it passes, dispatches the field's
//! callbacks:
//!
//! | Value kind                 | Changed when                                |
//! |----------------------------|---------------------------------------------|
//! | numeric scalar             | `|new - last| > threshold`                  |
//! | 1-D numeric array          | length differs or any element exceeds it    |
//! | string, multi-dimensional  | always                                      |
//!
//! A manual override forces the next test to report "changed" once, then
//! clears itself. The first update of a field always counts as a change.

use crate::error::{MotorError, MotorResult};
use serde::Serialize;

/// Element type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Bool,
    Int,
    Double,
    String,
}

/// Value held by a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
    IntArray(Vec<i64>),
    DoubleArray(Vec<f64>),
    DoubleMatrix(Vec<Vec<f64>>),
}

impl FieldValue {
    pub fn datatype(&self) -> FieldType {
        match self {
            Self::Bool(_) => FieldType::Bool,
            Self::Int(_) | Self::IntArray(_) => FieldType::Int,
            Self::Double(_) | Self::DoubleArray(_) | Self::DoubleMatrix(_) => FieldType::Double,
            Self::Text(_) => FieldType::String,
        }
    }

    /// Number of dimensions: 0 for scalars, 1 for arrays and strings, 2 for matrices.
    pub fn dimensions(&self) -> usize {
        match self {
            Self::Bool(_) | Self::Int(_) | Self::Double(_) => 0,
            Self::Text(_) | Self::IntArray(_) | Self::DoubleArray(_) => 1,
            Self::DoubleMatrix(_) => 2,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Int(i) => Some(*i as f64),
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Handle returned by [`FieldStore::add_callback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

/// Callback fired with the field name and its new value.
pub type FieldCallback = Box<dyn FnMut(&str, &FieldValue) + Send>;

/// One named attribute.
pub struct Field {
    name: String,
    value: FieldValue,
    last_value: Option<FieldValue>,
    threshold: f64,
    manual_override: bool,
    callbacks: Vec<(CallbackId, FieldCallback)>,
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("last_value", &self.last_value)
            .field("threshold", &self.threshold)
            .field("manual_override", &self.manual_override)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl Field {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    pub fn datatype(&self) -> FieldType {
        self.value.datatype()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Runs the value-changed test against the last reported value.
    ///
    /// Consumes the manual override. Records the current value as the
    /// last reported value when the test passes.
    pub fn test_value_changed(&mut self) -> bool {
        let changed = if std::mem::take(&mut self.manual_override) {
            true
        } else {
            match &self.last_value {
                None => true,
                Some(last) => value_differs(last, &self.value, self.threshold),
            }
        };
        if changed {
            self.last_value = Some(self.value.clone());
        }
        changed
    }
}

fn value_differs(last: &FieldValue, new: &FieldValue, threshold: f64) -> bool {
    match (last, new) {
        (FieldValue::IntArray(a), FieldValue::IntArray(b)) => {
            a.len() != b.len()
                || a.iter()
                    .zip(b)
                    .any(|(x, y)| (*x as f64 - *y as f64).abs() > threshold)
        }
        (FieldValue::DoubleArray(a), FieldValue::DoubleArray(b)) => {
            a.len() != b.len() || a.iter().zip(b).any(|(x, y)| (x - y).abs() > threshold)
        }
        (FieldValue::Text(_), _) | (FieldValue::DoubleMatrix(_), _) => true,
        _ => match (last.as_f64(), new.as_f64()) {
            (Some(a), Some(b)) => (a - b).abs() > threshold,
            _ => true,
        },
    }
}

/// Collection of named fields.
#[derive(Debug, Default)]
pub struct FieldStore {
    fields: Vec<Field>,
    next_callback: u64,
}

impl FieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field. Fails if the name is taken.
    pub fn define(&mut self, name: &str, initial: FieldValue, threshold: f64) -> MotorResult<()> {
        if self.fields.iter().any(|f| f.name == name) {
            return Err(MotorError::IllegalArgument(format!(
                "Field '{name}' is already defined"
            )));
        }
        self.fields.push(Field {
            name: name.to_string(),
            value: initial,
            last_value: None,
            threshold: threshold.abs(),
            manual_override: false,
            callbacks: Vec::new(),
        });
        Ok(())
    }

    pub fn field(&self, name: &str) -> MotorResult<&Field> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| unknown_field(name))
    }

    fn field_mut(&mut self, name: &str) -> MotorResult<&mut Field> {
        self.fields
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| unknown_field(name))
    }

    pub fn value(&self, name: &str) -> MotorResult<&FieldValue> {
        self.field(name).map(Field::value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Stores `value` without running the change test.
    pub fn store(&mut self, name: &str, value: FieldValue) -> MotorResult<()> {
        let field = self.field_mut(name)?;
        if field.value.datatype() != value.datatype() {
            return Err(MotorError::TypeMismatch(format!(
                "Field '{name}' holds {:?} values, got {:?}",
                field.value.datatype(),
                value.datatype()
            )));
        }
        field.value = value;
        Ok(())
    }

    /// Stores `value`, runs the change test and dispatches callbacks on change.
    ///
    /// Returns whether the value counted as changed.
    pub fn update(&mut self, name: &str, value: FieldValue) -> MotorResult<bool> {
        self.store(name, value)?;
        self.notify_if_changed(name)
    }

    /// Runs the change test on the stored value and dispatches callbacks on change.
    pub fn notify_if_changed(&mut self, name: &str) -> MotorResult<bool> {
        let field = self.field_mut(name)?;
        if !field.test_value_changed() {
            return Ok(false);
        }
        let Field {
            name,
            value,
            callbacks,
            ..
        } = field;
        for (_, callback) in callbacks.iter_mut() {
            callback(name, value);
        }
        Ok(true)
    }

    /// Forces the next change test of `name` to pass.
    pub fn set_manual_override(&mut self, name: &str) -> MotorResult<()> {
        self.field_mut(name)?.manual_override = true;
        Ok(())
    }

    pub fn set_threshold(&mut self, name: &str, threshold: f64) -> MotorResult<()> {
        self.field_mut(name)?.threshold = threshold.abs();
        Ok(())
    }

    pub fn add_callback(&mut self, name: &str, callback: FieldCallback) -> MotorResult<CallbackId> {
        let id = CallbackId(self.next_callback);
        self.field_mut(name)?.callbacks.push((id, callback));
        self.next_callback += 1;
        Ok(id)
    }

    /// Removes a callback. Returns whether it was registered on `name`.
    pub fn remove_callback(&mut self, name: &str, id: CallbackId) -> MotorResult<bool> {
        let callbacks = &mut self.field_mut(name)?.callbacks;
        let before = callbacks.len();
        callbacks.retain(|(cb_id, _)| *cb_id != id);
        Ok(callbacks.len() != before)
    }

    /// JSON object of all current field values.
    pub fn snapshot_json(&self) -> serde_json::Value {
        let map = self
            .fields
            .iter()
            .map(|f| {
                (
                    f.name.clone(),
                    serde_json::to_value(&f.value).unwrap_or(serde_json::Value::Null),
                )
            })
            .collect();
        serde_json::Value::Object(map)
    }
}

fn unknown_field(name: &str) -> MotorError {
    MotorError::IllegalArgument(format!("No field named '{name}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn counting_store(initial: FieldValue, threshold: f64) -> (FieldStore, Arc<Mutex<Vec<FieldValue>>>) {
        let mut store = FieldStore::new();
        store.define("x", initial, threshold).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store
            .add_callback(
                "x",
                Box::new(move |_, value| sink.lock().unwrap().push(value.clone())),
            )
            .unwrap();
        (store, seen)
    }

    #[test]
    fn test_scalar_threshold() {
        let (mut store, seen) = counting_store(FieldValue::Double(0.0), 0.5);
        assert!(store.update("x", FieldValue::Double(0.0)).unwrap()); // first report
        assert!(!store.update("x", FieldValue::Double(0.4)).unwrap());
        assert!(store.update("x", FieldValue::Double(0.6)).unwrap());
        // Compared against the last reported value (0.6), not the last stored one.
        assert!(!store.update("x", FieldValue::Double(1.0)).unwrap());
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_one_dimensional_array() {
        let (mut store, _) = counting_store(FieldValue::DoubleArray(vec![0.0, 0.0]), 0.1);
        store.notify_if_changed("x").unwrap();
        assert!(!store.update("x", FieldValue::DoubleArray(vec![0.05, 0.0])).unwrap());
        assert!(store.update("x", FieldValue::DoubleArray(vec![0.05, 0.2])).unwrap());
        assert!(store.update("x", FieldValue::DoubleArray(vec![0.05])).unwrap());
    }

    #[test]
    fn test_strings_always_change() {
        let (mut store, seen) = counting_store(FieldValue::Text("a".into()), 100.0);
        assert!(store.update("x", FieldValue::Text("a".into())).unwrap());
        assert!(store.update("x", FieldValue::Text("a".into())).unwrap());
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_matrix_always_changes() {
        let (mut store, _) = counting_store(FieldValue::DoubleMatrix(vec![vec![1.0]]), 100.0);
        assert!(store.notify_if_changed("x").unwrap());
        assert!(store.notify_if_changed("x").unwrap());
    }

    #[test]
    fn test_manual_override_fires_once() {
        let (mut store, seen) = counting_store(FieldValue::Int(3), 0.0);
        store.notify_if_changed("x").unwrap();
        assert!(!store.notify_if_changed("x").unwrap());

        store.set_manual_override("x").unwrap();
        assert!(store.notify_if_changed("x").unwrap());
        assert!(!store.notify_if_changed("x").unwrap());
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let (mut store, _) = counting_store(FieldValue::Int(3), 0.0);
        let err = store.update("x", FieldValue::Text("no".into())).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_unknown_and_duplicate_fields() {
        let (mut store, _) = counting_store(FieldValue::Int(3), 0.0);
        assert!(store.value("missing").is_err());
        assert!(store.define("x", FieldValue::Int(0), 0.0).is_err());
    }

    #[test]
    fn test_remove_callback() {
        let mut store = FieldStore::new();
        store.define("x", FieldValue::Bool(false), 0.0).unwrap();
        let id = store.add_callback("x", Box::new(|_, _| {})).unwrap();
        assert!(store.remove_callback("x", id).unwrap());
        assert!(!store.remove_callback("x", id).unwrap());
    }

    #[test]
    fn test_snapshot_json() {
        let mut store = FieldStore::new();
        store.define("speed", FieldValue::Double(2.5), 0.0).unwrap();
        store.define("name", FieldValue::Text("theta".into()), 0.0).unwrap();
        let json = store.snapshot_json();
        assert_eq!(json["speed"], serde_json::json!(2.5));
        assert_eq!(json["name"], serde_json::json!("theta"));
    }
}
