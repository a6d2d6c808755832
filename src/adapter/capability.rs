//! Capability descriptors
//!
//! Each concrete store declares which primitives it implements
//! natively. The dispatcher reads this descriptor to choose the native
//! or polyfilled path; there is no method-resolution-order fallback, so
//! "neither side implemented" is a construction-time error instead of
//! infinite mutual delegation at call time.

use super::errors::ConfigError;

/// Which raw primitives a store implements natively
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub find_one: bool,
    pub find_many: bool,
    pub insert_one: bool,
    pub insert_many: bool,
    pub update_one: bool,
    pub update_many: bool,
    pub delete_one: bool,
    pub delete_many: bool,
}

impl Capabilities {
    /// No native primitives (never valid on its own)
    pub fn none() -> Self {
        Self::default()
    }

    /// The four single-record primitives
    pub fn one_primitives() -> Self {
        Self {
            find_one: true,
            insert_one: true,
            update_one: true,
            delete_one: true,
            ..Self::default()
        }
    }

    /// The four multi-record primitives
    pub fn many_primitives() -> Self {
        Self {
            find_many: true,
            insert_many: true,
            update_many: true,
            delete_many: true,
            ..Self::default()
        }
    }

    /// Every primitive native
    pub fn all() -> Self {
        Self {
            find_one: true,
            find_many: true,
            insert_one: true,
            insert_many: true,
            update_one: true,
            update_many: true,
            delete_one: true,
            delete_many: true,
        }
    }

    /// Every CRUD pair must have at least one native side
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pairs: [(&'static str, bool); 4] = [
            ("find", self.find_one || self.find_many),
            ("insert", self.insert_one || self.insert_many),
            ("update", self.update_one || self.update_many),
            ("delete", self.delete_one || self.delete_many),
        ];
        for (pair, implemented) in pairs {
            if !implemented {
                return Err(ConfigError::IncompletePair { pair });
            }
        }
        Ok(())
    }
}
