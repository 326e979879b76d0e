use serde::{Deserialize, Serialize};

/// Oracle-provided engagement discount tier, consumed verbatim from C6.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderTier {
    pub name: String,
    /// Fraction in `[0, 0.95]`, clamped by the caller before use.
    pub discount: f64,
}

impl HolderTier {
    pub const MAX_DISCOUNT: f64 = 0.95;

    pub fn none() -> Self {
        Self { name: "none".to_string(), discount: 0.0 }
    }

    pub fn clamped(name: impl Into<String>, discount: f64) -> Self {
        Self { name: name.into(), discount: discount.clamp(0.0, Self::MAX_DISCOUNT) }
    }
}

impl Default for HolderTier {
    fn default() -> Self {
        Self::none()
    }
}
