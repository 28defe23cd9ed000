//! VM Flavor catalog used by the Autoscaler's greedy selector.

use serde::{Deserialize, Serialize};

use crate::error::AutoscalerError;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct VmFlavor {
    pub name: String,
    pub cpu_cores: f64,
    pub memory_gib: f64,
    pub hourly_price: f64,
}

impl VmFlavor {
    fn is_valid(&self) -> bool {
        self.cpu_cores > 0.0 && self.memory_gib > 0.0 && self.hourly_price > 0.0
    }
}

/// Validates a flavor catalog at process start (§7, §8): an empty catalog,
/// or a flavor with non-positive price/cpu/memory (the selector's score
/// divides by `price` and normalizes against `cpu`/`memory`), is fatal.
pub fn validate_flavor_catalog(flavors: &[VmFlavor]) -> Result<(), AutoscalerError> {
    if flavors.is_empty() {
        return Err(AutoscalerError::EmptyFlavorCatalog);
    }
    for flavor in flavors {
        if !flavor.is_valid() {
            return Err(AutoscalerError::InvalidFlavor(flavor.name.clone()));
        }
    }
    Ok(())
}
