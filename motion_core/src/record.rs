//! Field binding of a motor.
//!
//! A [`MotorRecord`] exposes a [`Motor`] as named fields of a
//! [`FieldStore`]:
//!
//! | Field             | Type   | Read                  | Write              |
//! |-------------------|--------|-----------------------|--------------------|
//! | `position`        | double | `get_position`        | `set_position`     |
//! | `destination`     | double | last commanded target | `move_absolute`    |
//! | `status`          | int    | `get_status`          | -                  |
//! | `speed`           | double | `speed`               | `set_speed`        |
//! | `extended_status` | string | `get_extended_status` | -                  |
//! | `busy`            | bool   | `is_busy`             | -                  |
//!
//! Reads process the motor before returning the field value. Writes
//! commit the value to the store, then process it and run the change
//! test.

use crate::motor::Motor;
use motion_common::error::{MotorError, MotorResult};
use motion_common::field::{FieldStore, FieldValue};
use motion_common::status::MoveFlags;
use tracing::debug;

pub const POSITION: &str = "position";
pub const DESTINATION: &str = "destination";
pub const STATUS: &str = "status";
pub const SPEED: &str = "speed";
pub const EXTENDED_STATUS: &str = "extended_status";
pub const BUSY: &str = "busy";

const WRITABLE: [&str; 3] = [POSITION, DESTINATION, SPEED];

/// A motor bound to its fields.
#[derive(Debug)]
pub struct MotorRecord {
    motor: Motor,
    fields: FieldStore,
}

impl MotorRecord {
    /// Defines the record's fields from the motor's cached values.
    ///
    /// The position threshold starts at the move deadband.
    pub fn new(motor: Motor) -> MotorResult<Self> {
        let state = motor.state();
        let mut fields = FieldStore::new();
        fields.define(POSITION, FieldValue::Double(state.position), state.move_deadband)?;
        fields.define(DESTINATION, FieldValue::Double(state.destination), 0.0)?;
        fields.define(STATUS, FieldValue::Int(i64::from(state.status.bits())), 0.0)?;
        fields.define(SPEED, FieldValue::Double(state.speed), 0.0)?;
        fields.define(
            EXTENDED_STATUS,
            FieldValue::Text(state.extended_status.clone()),
            0.0,
        )?;
        fields.define(BUSY, FieldValue::Bool(state.busy), 0.0)?;
        Ok(Self { motor, fields })
    }

    pub fn motor(&self) -> &Motor {
        &self.motor
    }

    pub fn motor_mut(&mut self) -> &mut Motor {
        &mut self.motor
    }

    pub fn fields(&self) -> &FieldStore {
        &self.fields
    }

    /// Store access for callbacks, thresholds and manual overrides.
    pub fn fields_mut(&mut self) -> &mut FieldStore {
        &mut self.fields
    }

    pub fn into_motor(self) -> Motor {
        self.motor
    }

    /// Reads the motor for `name` and returns the refreshed value.
    ///
    /// # Errors
    ///
    /// Returns `IllegalArgument` for an unknown field, or the motor
    /// operation's error.
    pub fn get_field(&mut self, name: &str) -> MotorResult<FieldValue> {
        let value = match name {
            POSITION => FieldValue::Double(self.motor.get_position()?),
            DESTINATION => FieldValue::Double(self.motor.state().destination),
            STATUS => FieldValue::Int(i64::from(self.motor.get_status()?.bits())),
            SPEED => FieldValue::Double(self.motor.speed()?),
            EXTENDED_STATUS => {
                self.motor.get_extended_status()?;
                FieldValue::Text(self.motor.state().extended_status.clone())
            }
            BUSY => FieldValue::Bool(self.motor.is_busy()?),
            other => return self.fields.value(other).cloned(),
        };
        self.fields.store(name, value.clone())?;
        Ok(value)
    }

    /// Commits `value` to `name` and acts on it.
    ///
    /// Returns whether the value counted as changed.
    ///
    /// # Errors
    ///
    /// - `IllegalArgument` for an unknown field.
    /// - `PermissionDenied` for a read-only field.
    /// - `TypeMismatch` if `value` is not a number.
    pub fn put_field(&mut self, name: &str, value: FieldValue) -> MotorResult<bool> {
        self.fields.field(name)?;
        if !WRITABLE.contains(&name) {
            return Err(MotorError::PermissionDenied(format!(
                "Field '{name}' of motor '{}' is read-only.",
                self.motor.name()
            )));
        }
        let number = value.as_f64().ok_or_else(|| {
            MotorError::TypeMismatch(format!("Field '{name}' takes a number, got {value:?}."))
        })?;
        self.fields.store(name, value)?;
        debug!(motor = %self.motor.name(), field = name, value = number, "Field written");

        match name {
            DESTINATION => self.motor.move_absolute(number, MoveFlags::empty())?,
            SPEED => self.motor.set_speed(number)?,
            _ => self.motor.set_position(number)?,
        }
        self.fields.notify_if_changed(name)
    }

    /// Re-reads position and status and notifies their callbacks when the
    /// change test passes. Returns the names of the changed fields.
    pub fn poll_changes(&mut self) -> MotorResult<Vec<&'static str>> {
        let (position, status) = self.motor.get_extended_status()?;
        self.fields.store(
            EXTENDED_STATUS,
            FieldValue::Text(self.motor.state().extended_status.clone()),
        )?;

        let mut changed = Vec::new();
        if self.fields.update(POSITION, FieldValue::Double(position))? {
            changed.push(POSITION);
        }
        if self
            .fields
            .update(STATUS, FieldValue::Int(i64::from(status.bits())))?
        {
            changed.push(STATUS);
        }
        Ok(changed)
    }
}
