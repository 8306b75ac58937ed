// src/config.rs
/*!
Solver parameters, loadable from JSON.

```json
{ "max_iterations": 500, "tolerance": 1e-12, "preconditioning": "even_odd" }
```

Every field is optional; missing fields take the [`SolverParams::default`] value.
*/

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LatticeError, Result};

/// Which conjugate-gradient variant `solve` runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preconditioning {
    /// Plain CG on the full lattice.
    None,
    /// CG on the odd-site Schur complement; needs an even-odd layout.
    #[default]
    EvenOdd,
}

/// Iteration budget, stopping tolerance and variant of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverParams {
    /// Maximum number of CG iterations (`M`).
    pub max_iterations: usize,
    /// Stop once `sqrt(Re⟨r, r⟩) < tolerance`.
    pub tolerance: f64,
    pub preconditioning: Preconditioning,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-10,
            preconditioning: Preconditioning::EvenOdd,
        }
    }
}

impl SolverParams {
    /// # Errors
    /// `InvalidParameter` for a zero iteration budget or a tolerance that is
    /// not finite and positive.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(LatticeError::InvalidParameter {
                name: "max_iterations",
                reason: "must be at least 1".into(),
            });
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(LatticeError::InvalidParameter {
                name: "tolerance",
                reason: format!("must be finite and > 0; got {}", self.tolerance),
            });
        }
        Ok(())
    }

    /// Parse and validate.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let params: Self = serde_json::from_str(s)?;
        params.validate()?;
        Ok(params)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
