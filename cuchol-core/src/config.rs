use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{CholError, Result};

/// Ordering the device solver applies before factorizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceReorder {
    #[default]
    None,
    Symrcm,
    Symamd,
    Metis,
}

impl DeviceReorder {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceReorder::None => "none",
            DeviceReorder::Symrcm => "symrcm",
            DeviceReorder::Symamd => "symamd",
            DeviceReorder::Metis => "metis",
        }
    }

    /// Maps the integer `reorder` argument of the C entry points.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(DeviceReorder::None),
            1 => Ok(DeviceReorder::Symrcm),
            2 => Ok(DeviceReorder::Symamd),
            3 => Ok(DeviceReorder::Metis),
            other => Err(CholError::Config(format!("reorder code {other} is not in 0..=3"))),
        }
    }
}

impl fmt::Display for DeviceReorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceReorder {
    type Err = CholError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" | "0" => Ok(DeviceReorder::None),
            "symrcm" | "rcm" | "1" => Ok(DeviceReorder::Symrcm),
            "symamd" | "amd" | "2" => Ok(DeviceReorder::Symamd),
            "metis" | "csrmetisnd" | "3" => Ok(DeviceReorder::Metis),
            other => Err(CholError::Config(format!(
                "unknown reorder '{other}'. Supported: none, symrcm, symamd, metis"
            ))),
        }
    }
}

/// What to do when the factorization reports a non-positive pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SingularPolicy {
    /// Log a warning and hand back whatever the solver wrote.
    #[default]
    Warn,
    /// Fail the call.
    Error,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Pivot threshold below which a row is reported singular.
    pub tolerance: f64,
    pub reorder: DeviceReorder,
    /// Apply reverse Cuthill-McKee on the host before uploading
    /// (host round trip only).
    pub host_ordering: bool,
    pub on_singular: SingularPolicy,
    /// Verify with the runtime that caller pointers are device accessible.
    pub check_pointers: bool,
}

pub const DEFAULT_TOLERANCE: f64 = 1e-14;

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            reorder: DeviceReorder::None,
            host_ordering: true,
            on_singular: SingularPolicy::Warn,
            check_pointers: false,
        }
    }
}

impl SolverConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = if json.trim().is_empty() {
            Self::default()
        } else {
            serde_json::from_str(json)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(CholError::Config(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_reorder(mut self, reorder: DeviceReorder) -> Self {
        self.reorder = reorder;
        self
    }

    pub fn with_host_ordering(mut self, host_ordering: bool) -> Self {
        self.host_ordering = host_ordering;
        self
    }

    pub fn with_singular_policy(mut self, policy: SingularPolicy) -> Self {
        self.on_singular = policy;
        self
    }

    pub fn with_check_pointers(mut self, check_pointers: bool) -> Self {
        self.check_pointers = check_pointers;
        self
    }
}
