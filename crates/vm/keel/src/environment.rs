use crate::{
    constants::{CALL_DEPTH_LIMIT, MAX_CODE_SIZE, MAX_INITCODE_SIZE},
    gas_cost::GasSchedule,
    host::TxContext,
    revision::Revision,
};
use serde::{Deserialize, Serialize};

/// Engine limits that are not tied to a revision. The defaults are the
/// mainnet values.
///
/// ```json
/// { "max_code_size": 24576, "max_initcode_size": 49152, "call_depth_limit": 1024 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EVMConfig {
    /// Largest deployed code, enforced from SpuriousDragon (EIP-170).
    pub max_code_size: usize,
    /// Largest init code, enforced from Shanghai (EIP-3860).
    pub max_initcode_size: usize,
    /// Frames deeper than this are never entered.
    pub call_depth_limit: usize,
}

impl Default for EVMConfig {
    fn default() -> Self {
        Self {
            max_code_size: MAX_CODE_SIZE,
            max_initcode_size: MAX_INITCODE_SIZE,
            call_depth_limit: CALL_DEPTH_LIMIT,
        }
    }
}

impl EVMConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Everything fixed for the lifetime of one call tree.
#[derive(Debug, Clone)]
pub struct Environment {
    pub revision: Revision,
    pub config: EVMConfig,
    pub tx: TxContext,
    pub schedule: &'static GasSchedule,
}

impl Environment {
    pub fn new(revision: Revision, config: EVMConfig, tx: TxContext) -> Self {
        Self {
            revision,
            config,
            tx,
            schedule: GasSchedule::for_revision(revision),
        }
    }
}
