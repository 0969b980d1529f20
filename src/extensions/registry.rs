//! Registered extension descriptors and reserved-bit bookkeeping.

use std::fmt;

use tracing::debug;

use crate::error::{Error, Result};
use crate::extensions::{Extension, RsvBits};
use crate::protocol::is_token;

/// Registry for the extensions this endpoint supports.
///
/// Registration order is significant: it is the order offers are generated
/// in and the precedence order when two extensions want the same RSV bit.
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: Vec<Box<dyn Extension>>,
}

impl ExtensionRegistry {
    /// Create a new empty extension registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an extension to the registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidExtension`] if the name is not a valid HTTP
    /// token or is already registered.
    pub fn add(&mut self, extension: Box<dyn Extension>) -> Result<()> {
        let name = extension.name();

        if !is_token(name) {
            return Err(Error::InvalidExtension(format!(
                "extension name \"{}\" is not a valid token",
                name
            )));
        }

        if self.get(name).is_some() {
            return Err(Error::InvalidExtension(format!(
                "An extension with name \"{}\" is already registered",
                name
            )));
        }

        debug!(extension = %name, rsv = ?extension.rsv_bits(), "registered extension");
        self.extensions.push(extension);
        Ok(())
    }

    /// Look up a registered extension by name.
    pub fn get(&self, name: &str) -> Option<&dyn Extension> {
        self.extensions
            .iter()
            .find(|ext| ext.name() == name)
            .map(|ext| ext.as_ref())
    }

    /// Iterate over extensions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Extension> {
        self.extensions.iter().map(|ext| ext.as_ref())
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.extensions.iter().map(|ext| ext.name()).collect()
    }

    /// Get the number of registered extensions.
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("extensions", &self.names())
            .finish()
    }
}

/// Which extension, if any, has claimed each reserved bit.
///
/// Claims only grow during one negotiation; [`RsvOwnership::reset`] starts
/// the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RsvOwnership {
    rsv1: Option<String>,
    rsv2: Option<String>,
    rsv3: Option<String>,
}

impl RsvOwnership {
    pub fn new() -> Self {
        Self::default()
    }

    /// First bit in `bits` already claimed, as `(bit number, owner)`.
    pub fn conflict(&self, bits: RsvBits) -> Option<(u8, &str)> {
        [
            (1, bits.rsv1, &self.rsv1),
            (2, bits.rsv2, &self.rsv2),
            (3, bits.rsv3, &self.rsv3),
        ]
        .into_iter()
        .find_map(|(bit, wanted, owner)| match owner {
            Some(owner) if wanted => Some((bit, owner.as_str())),
            _ => None,
        })
    }

    /// Claim every unclaimed bit in `bits` for `name`.
    pub fn claim(&mut self, name: &str, bits: RsvBits) {
        for (wanted, owner) in [
            (bits.rsv1, &mut self.rsv1),
            (bits.rsv2, &mut self.rsv2),
            (bits.rsv3, &mut self.rsv3),
        ] {
            if wanted && owner.is_none() {
                *owner = Some(name.to_string());
            }
        }
    }

    /// Owner of reserved bit `bit` (1, 2 or 3).
    pub fn owner(&self, bit: u8) -> Option<&str> {
        match bit {
            1 => self.rsv1.as_deref(),
            2 => self.rsv2.as_deref(),
            3 => self.rsv3.as_deref(),
            _ => None,
        }
    }

    /// Bits currently claimed by anyone.
    pub fn claimed(&self) -> RsvBits {
        RsvBits::new(self.rsv1.is_some(), self.rsv2.is_some(), self.rsv3.is_some())
    }

    /// Forget every claim.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
