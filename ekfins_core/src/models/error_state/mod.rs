// ekfins_core/src/models/error_state/mod.rs

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub mod inertial;

/// One of the three sensor axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Zero-based position of the axis inside a 3-wide block.
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    fn from_number(n: usize) -> Option<Axis> {
        Axis::ALL.get(n.checked_sub(1)?).copied()
    }
}

/// A symbolic sensor error state. Rendered as `BIAS_1`, `SCALE_2`, `CORR_3`, ...
/// where the number is the one-based axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorState {
    Bias(Axis),
    Scale(Axis),
    Corr(Axis),
}

impl ErrorState {
    pub fn axis(self) -> Axis {
        match self {
            ErrorState::Bias(a) | ErrorState::Scale(a) | ErrorState::Corr(a) => a,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            ErrorState::Bias(_) => "BIAS",
            ErrorState::Scale(_) => "SCALE",
            ErrorState::Corr(_) => "CORR",
        }
    }
}

impl fmt::Display for ErrorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.prefix(), self.axis().index() + 1)
    }
}

impl FromStr for ErrorState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, number) = s
            .split_once('_')
            .ok_or_else(|| format!("'{s}' is not a state name"))?;
        let axis = number
            .parse::<usize>()
            .ok()
            .and_then(Axis::from_number)
            .ok_or_else(|| format!("'{s}' has no valid axis"))?;
        match prefix {
            "BIAS" => Ok(ErrorState::Bias(axis)),
            "SCALE" => Ok(ErrorState::Scale(axis)),
            "CORR" => Ok(ErrorState::Corr(axis)),
            _ => Err(format!("'{s}' has an unknown prefix")),
        }
    }
}

/// Ordered mapping from error state to its index in the sensor's state vector.
///
/// States are only ever appended, and a state's index is the registry length at the
/// moment it was added, so the indices are always `0..len` without gaps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateRegistry {
    layout: Vec<ErrorState>,
    lookup: HashMap<ErrorState, usize>,
}

impl StateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a state and returns its index. A state already present keeps its index.
    pub(crate) fn push(&mut self, state: ErrorState) -> usize {
        if let Some(&idx) = self.lookup.get(&state) {
            return idx;
        }
        let idx = self.layout.len();
        self.layout.push(state);
        self.lookup.insert(state, idx);
        idx
    }

    pub fn len(&self) -> usize {
        self.layout.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layout.is_empty()
    }

    /// Finds the index of a specific state.
    pub fn find_idx(&self, state: &ErrorState) -> Option<usize> {
        self.lookup.get(state).copied()
    }

    /// Finds the index of a state by its rendered name, e.g. `"SCALE_2"`.
    pub fn find_idx_by_name(&self, name: &str) -> Option<usize> {
        name.parse::<ErrorState>()
            .ok()
            .and_then(|s| self.find_idx(&s))
    }

    /// Iterates `(state, index)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (ErrorState, usize)> + '_ {
        self.layout.iter().enumerate().map(|(i, s)| (*s, i))
    }

    /// The states in index order.
    pub fn layout(&self) -> &[ErrorState] {
        &self.layout
    }

    pub fn names(&self) -> Vec<String> {
        self.layout.iter().map(ToString::to_string).collect()
    }
}
