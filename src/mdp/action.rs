use std::fmt;

/// The two controls available in every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Heater on.
    On,
    /// Heater off.
    Off,
}

impl Action {
    pub fn label(self) -> &'static str {
        match self {
            Action::On => "ON",
            Action::Off => "OFF",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the policy prescribes for a single state.
///
/// `TargetReached` is the sentinel held by the terminal state: once the
/// desired temperature is reached the thermostat stops acting, and that
/// state's value stays at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Act(Action),
    TargetReached,
}

impl Decision {
    pub fn label(self) -> &'static str {
        match self {
            Decision::Act(action) => action.label(),
            Decision::TargetReached => "DESIRED TEMPERATURE",
        }
    }

    pub fn action(self) -> Option<Action> {
        match self {
            Decision::Act(action) => Some(action),
            Decision::TargetReached => None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
