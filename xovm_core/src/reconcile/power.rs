/*
* Power state gate.
*
* Without pv drivers nothing can be (un)plugged on a running guest:
* pending changes then require a stop, which must have been allowed.
*/
use crate::xo::{DesiredPowerState, PowerState};

use serde::Serialize;
use std::fmt;

// Error Handling
use xovm_error::{PolicyViolation, XovmError};

pub fn requires_power_off(power_state: &PowerState, pv_drivers: bool, change_pending: bool) -> bool {
    change_pending && power_state.is_running() && !pv_drivers
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GateDecision {
    /// Apply the plan as is.
    Proceed,
    /// Stop the vm before applying the plan.
    PowerOff { force: bool },
    /// A stop is needed but was not allowed.
    Refuse,
}
impl fmt::Display for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GateDecision::Proceed => write!(f, "proceed"),
            GateDecision::PowerOff { force: true } => write!(f, "forced power off"),
            GateDecision::PowerOff { force: false } => write!(f, "power off"),
            GateDecision::Refuse => write!(f, "refused"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerGate {
    pub power_state: PowerState,
    pub pv_drivers: bool,
    pub allow_stopping: bool,
}

impl PowerGate {
    pub fn decide(&self, change_pending: bool) -> GateDecision {
        if !requires_power_off(&self.power_state, self.pv_drivers, change_pending) {
            return GateDecision::Proceed;
        }
        if !self.allow_stopping {
            return GateDecision::Refuse;
        }
        GateDecision::PowerOff {
            force: !self.pv_drivers,
        }
    }
    /// Like decide, but a refusal is an error.
    pub fn check(&self, vm_id: &str, change_pending: bool) -> Result<GateDecision, XovmError> {
        match self.decide(change_pending) {
            GateDecision::Refuse => {
                let message = format!(
                    "vm {} must be stopped to apply the change but stopping it is not allowed",
                    vm_id
                );
                let err = PolicyViolation::builder()
                    .msg(&message)
                    .help("Set allow_stopping_for_update = true, or install pv drivers in the guest.")
                    .build();
                Err(err.into())
            }
            decision => Ok(decision),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PowerTransition {
    Start,
    Stop,
}

/*
 * The last power transition of an update.
 * A vm stopped for the update is started again unless a state was asked for.
 */
pub fn final_transition(
    stopped_for_update: bool,
    effective: &PowerState,
    desired: Option<DesiredPowerState>,
) -> Option<PowerTransition> {
    match desired {
        None if stopped_for_update => Some(PowerTransition::Start),
        None => None,
        Some(desired) => {
            let desired = PowerState::from(desired);
            if &desired == effective {
                None
            } else if desired.is_running() {
                Some(PowerTransition::Start)
            } else {
                Some(PowerTransition::Stop)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn gate(power_state: PowerState, pv_drivers: bool, allow_stopping: bool) -> PowerGate {
        PowerGate {
            power_state,
            pv_drivers,
            allow_stopping,
        }
    }

    #[test]
    fn power_off_only_for_running_vms_without_pv_drivers() {
        assert!(requires_power_off(&PowerState::Running, false, true));
        assert!(!requires_power_off(&PowerState::Running, true, true));
        assert!(!requires_power_off(&PowerState::Halted, false, true));
        assert!(!requires_power_off(&PowerState::Running, false, false));
    }

    #[test]
    fn gate_is_fail_closed() {
        let refused = gate(PowerState::Running, false, false);
        assert_eq!(refused.decide(true), GateDecision::Refuse);
        assert!(refused.check("vm-1", true).is_err());
        assert_eq!(refused.decide(false), GateDecision::Proceed);

        let allowed = gate(PowerState::Running, false, true);
        assert_eq!(allowed.decide(true), GateDecision::PowerOff { force: true });
    }

    #[test]
    fn restore_power_after_forced_stop() {
        assert_eq!(
            final_transition(true, &PowerState::Halted, None),
            Some(PowerTransition::Start)
        );
        assert_eq!(final_transition(false, &PowerState::Running, None), None);
        assert_eq!(
            final_transition(true, &PowerState::Halted, Some(DesiredPowerState::Halted)),
            None
        );
        assert_eq!(
            final_transition(false, &PowerState::Running, Some(DesiredPowerState::Halted)),
            Some(PowerTransition::Stop)
        );
        assert_eq!(
            final_transition(false, &PowerState::Halted, Some(DesiredPowerState::Running)),
            Some(PowerTransition::Start)
        );
    }
}
