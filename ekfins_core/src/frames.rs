// ekfins_core/src/frames.rs

use std::fmt;

/// The width of the base navigation error state.
pub const N_BASE_STATES: usize = 7;

/// Every variable of the base navigation error state, in filter order.
///
/// Position and velocity errors are ordered East then North, followed by the two level
/// attitude errors and the heading error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavState {
    /// East position error.
    Dr1,
    /// North position error.
    Dr2,
    /// East velocity error.
    Dv1,
    /// North velocity error.
    Dv2,
    Phi1,
    Phi2,
    /// Heading error.
    Psi3,
}

impl NavState {
    /// The full layout, where a variable's position is its index.
    pub const LAYOUT: [NavState; N_BASE_STATES] = [
        NavState::Dr1,
        NavState::Dr2,
        NavState::Dv1,
        NavState::Dv2,
        NavState::Phi1,
        NavState::Phi2,
        NavState::Psi3,
    ];

    /// Returns the index of this variable in the navigation error vector.
    pub fn index(self) -> usize {
        match self {
            NavState::Dr1 => 0,
            NavState::Dr2 => 1,
            NavState::Dv1 => 2,
            NavState::Dv2 => 3,
            NavState::Phi1 => 4,
            NavState::Phi2 => 5,
            NavState::Psi3 => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            NavState::Dr1 => "DR1",
            NavState::Dr2 => "DR2",
            NavState::Dv1 => "DV1",
            NavState::Dv2 => "DV2",
            NavState::Phi1 => "PHI1",
            NavState::Phi2 => "PHI2",
            NavState::Psi3 => "PSI3",
        }
    }
}

impl fmt::Display for NavState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_matches_indices() {
        for (i, var) in NavState::LAYOUT.iter().enumerate() {
            assert_eq!(var.index(), i, "{} is out of place", var);
        }
    }
}
