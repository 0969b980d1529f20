//! Configuration and limits for extension negotiation.

use crate::error::{Error, Result};

/// Bounds on negotiation input.
///
/// The extension header comes straight from the peer, so its size and the
/// number of specs it lists are capped before any extension sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum length of an extension header value in bytes.
    ///
    /// Default: 8 KB (8192)
    pub max_header_size: usize,

    /// Maximum number of extension specs in one header value.
    ///
    /// Default: 64
    pub max_extension_specs: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_header_size: 8192,
            max_extension_specs: 64,
        }
    }
}

impl Limits {
    /// Create new limits with custom values.
    #[must_use]
    pub const fn new(max_header_size: usize, max_extension_specs: usize) -> Self {
        Self {
            max_header_size,
            max_extension_specs,
        }
    }

    /// Limits that accept any header.
    ///
    /// Warning: Use only with trusted peers.
    #[must_use]
    pub const fn unrestricted() -> Self {
        Self {
            max_header_size: usize::MAX,
            max_extension_specs: usize::MAX,
        }
    }

    /// Validate that a header value is within the size limit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HeaderTooLarge`] if `size` exceeds the configured maximum.
    pub const fn check_header_size(&self, size: usize) -> Result<()> {
        if size > self.max_header_size {
            Err(Error::HeaderTooLarge {
                size,
                max: self.max_header_size,
            })
        } else {
            Ok(())
        }
    }

    /// Validate the number of extension specs in a parsed header.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooManyExtensions`] if `count` exceeds the configured maximum.
    pub const fn check_extension_count(&self, count: usize) -> Result<()> {
        if count > self.max_extension_specs {
            Err(Error::TooManyExtensions {
                count,
                max: self.max_extension_specs,
            })
        } else {
            Ok(())
        }
    }
}

/// Negotiator configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Negotiation input limits.
    pub limits: Limits,
}

impl Config {
    /// Create a configuration with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the limits.
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}
