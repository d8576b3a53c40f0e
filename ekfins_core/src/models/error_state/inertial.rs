// ekfins_core/src/models/error_state/inertial.rs

use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::Deserialize;
use std::fmt;

use crate::error::ModelError;
use crate::models::error_state::{Axis, ErrorState, StateRegistry};

/// Parameters of an error source that starts with some uncertainty and then drifts as a
/// random walk.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RandomWalk {
    /// Initial standard deviation of the error.
    pub sigma: f64,
    /// Noise spectral density of the random walk.
    pub walk: f64,
}

/// Parameters of a first-order Gauss-Markov error source.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GaussMarkov {
    /// Steady-state standard deviation of the process.
    pub sigma: f64,
    /// Correlation time constant, in seconds.
    pub time: f64,
}

/// Which error sources of a 3-axis inertial sensor are modeled. Absent sources add no states.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InertialSensorConfig {
    #[serde(default)]
    pub bias: Option<RandomWalk>,
    #[serde(default)]
    pub scale: Option<RandomWalk>,
    #[serde(default)]
    pub corr: Option<GaussMarkov>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Bias,
    Scale,
    Corr,
}

impl BlockKind {
    fn state(self, axis: Axis) -> ErrorState {
        match self {
            BlockKind::Bias => ErrorState::Bias(axis),
            BlockKind::Scale => ErrorState::Scale(axis),
            BlockKind::Corr => ErrorState::Corr(axis),
        }
    }

    fn name(self) -> &'static str {
        match self {
            BlockKind::Bias => "bias",
            BlockKind::Scale => "scale",
            BlockKind::Corr => "corr",
        }
    }
}

/// Per-axis statistics shared by the three states of one block.
#[derive(Debug, Clone, Copy)]
struct Block {
    kind: BlockKind,
    variance: f64,
    noise: f64,
    decay: f64,
}

/// Width of every error block, one state per sensor axis.
const BLOCK_DIM: usize = 3;

/// The error-state model of one 3-axis inertial sensor (a gyro or an accelerometer).
///
/// States are laid out as the bias block, then the scale factor block, then the correlated
/// drift block, each present only if configured. Every state is driven by exactly one
/// noise input, so `n_noises == n_states` and `G` is the identity.
#[derive(Debug, Clone)]
pub struct InertialSensor {
    states: StateRegistry,
    blocks: Vec<Block>,
    p: DMatrix<f64>,
    q: DVector<f64>,
    f: DMatrix<f64>,
    g: DMatrix<f64>,
}

impl InertialSensor {
    /// Validates the configuration and assembles the model matrices.
    pub fn new(config: InertialSensorConfig) -> Result<Self, ModelError> {
        // --- 1. Decide the active blocks ---
        let mut blocks = Vec::with_capacity(3);
        if let Some(bias) = config.bias {
            blocks.push(random_walk_block(BlockKind::Bias, bias)?);
        }
        if let Some(scale) = config.scale {
            blocks.push(random_walk_block(BlockKind::Scale, scale)?);
        }
        if let Some(corr) = config.corr {
            blocks.push(gauss_markov_block(corr)?);
        }

        // --- 2. Allocate once at full width, then fill each block at its offset ---
        let n = BLOCK_DIM * blocks.len();
        let mut states = StateRegistry::new();
        let mut p = DMatrix::zeros(n, n);
        let mut q = DVector::zeros(n);
        let mut f = DMatrix::zeros(n, n);

        for (k, block) in blocks.iter().enumerate() {
            let offset = BLOCK_DIM * k;
            for axis in Axis::ALL {
                let idx = states.push(block.kind.state(axis));
                debug_assert_eq!(idx, offset + axis.index());
            }
            p.fixed_view_mut::<BLOCK_DIM, BLOCK_DIM>(offset, offset)
                .fill_diagonal(block.variance);
            q.fixed_rows_mut::<BLOCK_DIM>(offset).fill(block.noise);
            f.fixed_view_mut::<BLOCK_DIM, BLOCK_DIM>(offset, offset)
                .fill_diagonal(block.decay);
        }

        let sensor = Self {
            states,
            blocks,
            p,
            q,
            f,
            g: DMatrix::identity(n, n),
        };
        debug!("Built {}", sensor);
        Ok(sensor)
    }

    pub fn n_states(&self) -> usize {
        self.states.len()
    }

    pub fn n_noises(&self) -> usize {
        self.q.nrows()
    }

    /// The ordered state registry.
    pub fn states(&self) -> &StateRegistry {
        &self.states
    }

    pub fn state_index(&self, state: ErrorState) -> Option<usize> {
        self.states.find_idx(&state)
    }

    pub fn state_index_by_name(&self, name: &str) -> Option<usize> {
        self.states.find_idx_by_name(name)
    }

    /// Initial error covariance.
    pub fn p(&self) -> &DMatrix<f64> {
        &self.p
    }

    /// Noise spectral densities, one per noise input.
    pub fn q(&self) -> &DVector<f64> {
        &self.q
    }

    /// Continuous-time state matrix.
    pub fn f(&self) -> &DMatrix<f64> {
        &self.f
    }

    /// Noise input matrix.
    pub fn g(&self) -> &DMatrix<f64> {
        &self.g
    }

    fn has_scale(&self) -> bool {
        self.blocks.iter().any(|b| b.kind == BlockKind::Scale)
    }

    /// Builds the `3 x n_states` matrix mapping the error states onto the sensor output.
    ///
    /// Bias and correlated drift blocks contribute the identity, the scale factor block
    /// contributes `diag(reading)`. A reading is only required when scale factor states
    /// are modeled.
    pub fn output_matrix(&self, reading: Option<&DVector<f64>>) -> Result<DMatrix<f64>, ModelError> {
        if let Some(r) = reading {
            if r.nrows() != BLOCK_DIM {
                return Err(ModelError::ShapeMismatch {
                    expected: format!("reading of length {}", BLOCK_DIM),
                    found: format!("reading of length {}", r.nrows()),
                });
            }
        }
        if reading.is_none() && self.has_scale() {
            return Err(ModelError::MissingReading);
        }

        let mut h = DMatrix::zeros(BLOCK_DIM, self.n_states());
        for (k, block) in self.blocks.iter().enumerate() {
            let mut view = h.fixed_view_mut::<BLOCK_DIM, BLOCK_DIM>(0, BLOCK_DIM * k);
            match (block.kind, reading) {
                (BlockKind::Scale, Some(r)) => {
                    for i in 0..BLOCK_DIM {
                        view[(i, i)] = r[i];
                    }
                }
                (BlockKind::Scale, None) => return Err(ModelError::MissingReading),
                (BlockKind::Bias | BlockKind::Corr, _) => view.fill_diagonal(1.0),
            }
        }
        Ok(h)
    }

    /// Builds one output matrix per row of a `k x 3` stack of readings.
    pub fn output_matrices(&self, readings: &DMatrix<f64>) -> Result<Vec<DMatrix<f64>>, ModelError> {
        if readings.ncols() != BLOCK_DIM {
            return Err(ModelError::ShapeMismatch {
                expected: format!("readings with {} columns", BLOCK_DIM),
                found: format!("readings with {} columns", readings.ncols()),
            });
        }
        readings
            .row_iter()
            .map(|row| {
                let reading = DVector::from_iterator(BLOCK_DIM, row.iter().copied());
                self.output_matrix(Some(&reading))
            })
            .collect()
    }
}

impl fmt::Display for InertialSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.blocks.iter().map(|b| b.kind.name()).collect();
        write!(
            f,
            "InertialSensor(n_states: {}, blocks: [{}])",
            self.n_states(),
            names.join(", ")
        )
    }
}

fn random_walk_block(kind: BlockKind, params: RandomWalk) -> Result<Block, ModelError> {
    check_sigma(kind, params.sigma)?;
    if !(params.walk.is_finite() && params.walk >= 0.0) {
        return Err(ModelError::InvalidWalk {
            source_name: kind.name(),
            value: params.walk,
        });
    }
    Ok(Block {
        kind,
        variance: params.sigma.powi(2),
        noise: params.walk,
        decay: 0.0,
    })
}

fn gauss_markov_block(params: GaussMarkov) -> Result<Block, ModelError> {
    check_sigma(BlockKind::Corr, params.sigma)?;
    if !(params.time.is_finite() && params.time > 0.0) {
        return Err(ModelError::InvalidTimeConstant(params.time));
    }
    // Stationary variance of the process is q^2 * tau / 2.
    Ok(Block {
        kind: BlockKind::Corr,
        variance: params.sigma.powi(2),
        noise: params.sigma * (2.0 / params.time).sqrt(),
        decay: -1.0 / params.time,
    })
}

fn check_sigma(kind: BlockKind, sigma: f64) -> Result<(), ModelError> {
    if sigma.is_finite() && sigma > 0.0 {
        Ok(())
    } else {
        Err(ModelError::InvalidSigma {
            source_name: kind.name(),
            value: sigma,
        })
    }
}
