//! Status aggregation, busy/limit queries and aborts.

use super::Motor;
use motion_common::error::MotorResult;
use motion_common::status::MotorStatus;
use tracing::warn;

/// Digits after the decimal point in the extended status position.
const EXTENDED_STATUS_PRECISION: usize = 6;

impl Motor {
    /// Reads the aggregated status word.
    ///
    /// Fallback order: `get_status`, `get_extended_status`, then the
    /// busy and limit-hit slots, then idle with no limits. Latched bits,
    /// the busy-start window and the derived `ERROR` bit are applied on
    /// top of whatever the driver reported.
    pub fn get_status(&mut self) -> MotorResult<MotorStatus> {
        if let Some(result) = self.driver.get_status(&mut self.state) {
            result?;
        } else if let Some(result) = self.driver.get_extended_status(&mut self.state) {
            result?;
            self.state.refresh_position();
        } else {
            self.derive_status_from_slots()?;
        }
        Ok(self.finish_status())
    }

    /// Status built from the busy and limit-hit slots. Missing slots count
    /// as "not busy" and "not hit".
    fn derive_status_from_slots(&mut self) -> MotorResult<()> {
        let mut status = MotorStatus::empty();
        if let Some(result) = self.driver.motor_is_busy(&mut self.state) {
            result?;
            status.set(MotorStatus::BUSY, self.state.busy);
        }
        if let Some(result) = self.driver.positive_limit_hit(&mut self.state) {
            result?;
            status.set(MotorStatus::POSITIVE_LIMIT_HIT, self.state.positive_limit_hit);
        }
        if let Some(result) = self.driver.negative_limit_hit(&mut self.state) {
            result?;
            status.set(MotorStatus::NEGATIVE_LIMIT_HIT, self.state.negative_limit_hit);
        }
        self.state.status = status;
        Ok(())
    }

    /// Applies latched bits, the busy-start window and `ERROR`, then
    /// mirrors the result into the boolean fields.
    fn finish_status(&mut self) -> MotorStatus {
        let mut status = self.state.status | self.state.latched_status;
        if self.check_busy_start_interval() {
            status |= MotorStatus::BUSY;
        }
        let status = status.with_derived_error();

        let state = &mut self.state;
        state.status = status;
        state.busy = status.is_busy();
        state.positive_limit_hit = status.contains(MotorStatus::POSITIVE_LIMIT_HIT);
        state.negative_limit_hit = status.contains(MotorStatus::NEGATIVE_LIMIT_HIT);
        if !state.busy {
            state.backlash_move_in_progress = false;
            state.home_search_in_progress = false;
        }
        status
    }

    /// Reads position and status together.
    ///
    /// Uses `get_extended_status` when present, otherwise the status chain
    /// followed by `get_position`. Also refreshes the `extended_status`
    /// text, `"<position> <status hex>"`.
    pub fn get_extended_status(&mut self) -> MotorResult<(f64, MotorStatus)> {
        if let Some(result) = self.driver.get_extended_status(&mut self.state) {
            result?;
        } else {
            self.get_status()?;
            let name = self.state.name.clone();
            super::required(
                self.driver.get_position(&mut self.state),
                &name,
                "get_extended_status",
            )?;
        }
        self.state.refresh_position();
        let status = self.finish_status();
        self.state.extended_status = format!(
            "{:.*e} {:x}",
            EXTENDED_STATUS_PRECISION,
            self.state.position,
            status.bits()
        );
        Ok((self.state.position, status))
    }

    /// Whether the motor is moving.
    ///
    /// Fallback order: `motor_is_busy`, `get_status`, `get_extended_status`,
    /// not busy. The busy-start window forces `true`.
    pub fn is_busy(&mut self) -> MotorResult<bool> {
        let reported = if let Some(result) = self.driver.motor_is_busy(&mut self.state) {
            result?;
            self.state.busy
        } else if let Some(result) = self.driver.get_status(&mut self.state) {
            result?;
            self.state.status.is_busy()
        } else if let Some(result) = self.driver.get_extended_status(&mut self.state) {
            result?;
            self.state.refresh_position();
            self.state.status.is_busy()
        } else {
            false
        };

        let busy = reported || self.check_busy_start_interval();
        self.state.busy = busy;
        if !busy {
            self.state.backlash_move_in_progress = false;
            self.state.home_search_in_progress = false;
        }
        Ok(busy)
    }

    /// Whether the positive hardware limit switch is active.
    pub fn positive_limit_hit(&mut self) -> MotorResult<bool> {
        let hit = if let Some(result) = self.driver.positive_limit_hit(&mut self.state) {
            result?;
            self.state.positive_limit_hit
        } else {
            self.limit_bit_from_status(MotorStatus::POSITIVE_LIMIT_HIT)?
        };
        self.state.positive_limit_hit = hit;
        self.record_limit_bit(MotorStatus::POSITIVE_LIMIT_HIT, hit);
        Ok(hit)
    }

    /// Whether the negative hardware limit switch is active.
    pub fn negative_limit_hit(&mut self) -> MotorResult<bool> {
        let hit = if let Some(result) = self.driver.negative_limit_hit(&mut self.state) {
            result?;
            self.state.negative_limit_hit
        } else {
            self.limit_bit_from_status(MotorStatus::NEGATIVE_LIMIT_HIT)?
        };
        self.state.negative_limit_hit = hit;
        self.record_limit_bit(MotorStatus::NEGATIVE_LIMIT_HIT, hit);
        Ok(hit)
    }

    fn limit_bit_from_status(&mut self, bit: MotorStatus) -> MotorResult<bool> {
        if let Some(result) = self.driver.get_status(&mut self.state) {
            result?;
        } else if let Some(result) = self.driver.get_extended_status(&mut self.state) {
            result?;
            self.state.refresh_position();
        } else {
            return Ok(false);
        }
        Ok(self.state.status.contains(bit))
    }

    fn record_limit_bit(&mut self, bit: MotorStatus, hit: bool) {
        if hit {
            self.state.status |= bit | MotorStatus::ERROR;
        } else {
            self.state.status.remove(bit);
        }
    }

    /// Whether the last home search succeeded.
    pub fn home_search_succeeded(&mut self) -> MotorResult<bool> {
        Ok(self
            .get_status()?
            .contains(MotorStatus::HOME_SEARCH_SUCCEEDED))
    }

    /// Clears latched status bits. Done at the start of every command.
    pub fn clear_latched_status(&mut self) {
        self.state.latched_status = MotorStatus::empty();
        self.state.status.remove(MotorStatus::LATCHED);
    }

    pub(crate) fn latch_status(&mut self, bits: MotorStatus) {
        let bits = bits & MotorStatus::LATCHED;
        self.state.latched_status |= bits;
        self.state.status |= bits;
    }

    // ─── Aborts ─────────────────────────────────────────────────────

    /// Stops the motor with deceleration.
    ///
    /// Falls back to `immediate_abort`; with neither slot present a
    /// warning is logged and the call succeeds.
    pub fn soft_abort(&mut self) -> MotorResult<()> {
        if let Some(result) = self.driver.soft_abort(&mut self.state) {
            return result;
        }
        if let Some(result) = self.driver.immediate_abort(&mut self.state) {
            warn!(
                motor = %self.state.name,
                "Soft abort not supported, performing an immediate abort instead"
            );
            return result;
        }
        warn!(motor = %self.state.name, "Motor cannot be aborted: no abort capability");
        Ok(())
    }

    /// Stops the motor as fast as possible.
    ///
    /// Falls back to `soft_abort`; with neither slot present a warning is
    /// logged and the call succeeds.
    pub fn immediate_abort(&mut self) -> MotorResult<()> {
        if let Some(result) = self.driver.immediate_abort(&mut self.state) {
            return result;
        }
        if let Some(result) = self.driver.soft_abort(&mut self.state) {
            warn!(
                motor = %self.state.name,
                "Immediate abort not supported, performing a soft abort instead"
            );
            return result;
        }
        warn!(motor = %self.state.name, "Motor cannot be aborted: no abort capability");
        Ok(())
    }
}
