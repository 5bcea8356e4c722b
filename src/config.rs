/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Provisioning configuration for the sequencer.
//!
//! A [`SequencerConfig`] is the explicit, immutable bring-up description of
//! a sequencing pipeline: how many groups exist, which replicas each group
//! fans out to, which destination addresses map to which group, and where
//! every counter starts. It is built once, validated, and handed to
//! [`Sequencer::provision`](crate::sequencer::Sequencer::provision), which
//! derives the resolver and counter bank from it.
//!
//! # Examples
//!
//! ```
//! use oum_sequencer::config::SequencerConfig;
//!
//! let config = SequencerConfig::from_json_str(r#"{
//!     "num_groups": 1,
//!     "groups": [{ "id": 0, "replicas": ["10.0.0.2:7000", "10.0.0.3:7000"] }],
//!     "destinations": [{ "address": "10.0.0.1:7000", "group": 0 }]
//! }"#).unwrap();
//! assert_eq!(config.counter_bits, 32);
//! assert_eq!(config.start_value, 0);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Width of the sequence field carried on the wire.
pub const MAX_COUNTER_BITS: u8 = 32;

/// Upper bound on `num_groups`. Counters and fan-out tables are allocated
/// for every possible group up front.
pub const MAX_GROUPS: u32 = 1 << 16;

/// Errors raised while loading or validating a [`SequencerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid JSON or does not match the schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// `num_groups` is zero or no group is configured.
    #[error("configuration provisions no sequencing groups")]
    NoGroups,

    /// `num_groups` exceeds [`MAX_GROUPS`].
    #[error("num_groups {0} exceeds the limit of 65536")]
    TooManyGroups(u32),

    /// A group id lies outside `[0, num_groups)`.
    #[error("group {group} is out of range: num_groups is {num_groups}")]
    GroupOutOfRange {
        /// The offending group id.
        group: u32,
        /// Configured group bound.
        num_groups: u32,
    },

    /// The same group id is configured twice.
    #[error("group {0} is configured more than once")]
    DuplicateGroup(u32),

    /// A group has no replicas to fan out to.
    #[error("group {0} has an empty fan-out set")]
    EmptyFanOut(u32),

    /// A replica endpoint appears twice in one group's fan-out.
    #[error("replica {replica} is listed twice in group {group}")]
    DuplicateReplica {
        /// Group the duplicate was found in.
        group: u32,
        /// The duplicated endpoint.
        replica: SocketAddr,
    },

    /// The same destination address is mapped more than once.
    #[error("destination {0} is mapped more than once")]
    DuplicateDestination(SocketAddr),

    /// A destination maps to a group that is not configured.
    #[error("destination {destination} maps to unconfigured group {group}")]
    UnknownGroup {
        /// The destination address.
        destination: SocketAddr,
        /// The group it refers to.
        group: u32,
    },

    /// `counter_bits` is outside `1..=32`.
    #[error("counter width of {0} bits is not supported (expected 1..=32)")]
    InvalidCounterBits(u8),

    /// A start value does not fit the configured counter width.
    #[error("start value {value} for group {group} exceeds the {bits}-bit counter")]
    StartValueOutOfRange {
        /// Group the start value belongs to.
        group: u32,
        /// The start value.
        value: u32,
        /// Configured counter width.
        bits: u8,
    },
}

/// Fan-out description of one sequencing group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Group id in `[0, num_groups)`.
    pub id: u32,

    /// Replica endpoints receiving every stamped request of this group.
    pub replicas: Vec<SocketAddr>,

    /// Starting counter value overriding [`SequencerConfig::start_value`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_value: Option<u32>,
}

/// Mapping of one destination address to its sequencing group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Destination identity clients send requests to.
    pub address: SocketAddr,

    /// Group the destination is sequenced in.
    pub group: u32,
}

/// Complete bring-up description of a sequencing pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencerConfig {
    /// Upper bound on group ids.
    pub num_groups: u32,

    /// Width of every counter in bits.
    #[serde(default = "default_counter_bits")]
    pub counter_bits: u8,

    /// Default starting value for every counter.
    #[serde(default)]
    pub start_value: u32,

    /// Session number used for the first provisioning.
    #[serde(default)]
    pub session: u16,

    /// Configured groups and their fan-out sets.
    pub groups: Vec<GroupConfig>,

    /// Destination to group mapping.
    pub destinations: Vec<DestinationConfig>,
}

fn default_counter_bits() -> u8 {
    MAX_COUNTER_BITS
}

impl SequencerConfig {
    /// Creates a configuration with `num_groups` and no groups or destinations.
    ///
    /// Use [`with_group`](Self::with_group) and
    /// [`with_destination`](Self::with_destination) to fill it in.
    #[must_use]
    pub fn new(num_groups: u32) -> Self {
        Self {
            num_groups,
            counter_bits: MAX_COUNTER_BITS,
            start_value: 0,
            session: 0,
            groups: Vec::new(),
            destinations: Vec::new(),
        }
    }

    /// Adds a group with the given replicas.
    #[must_use]
    pub fn with_group(mut self, id: u32, replicas: impl IntoIterator<Item = SocketAddr>) -> Self {
        self.groups.push(GroupConfig {
            id,
            replicas: replicas.into_iter().collect(),
            start_value: None,
        });
        self
    }

    /// Maps `address` to `group`.
    #[must_use]
    pub fn with_destination(mut self, address: SocketAddr, group: u32) -> Self {
        self.destinations.push(DestinationConfig { address, group });
        self
    }

    /// Sets the counter width.
    #[must_use]
    pub fn with_counter_bits(mut self, bits: u8) -> Self {
        self.counter_bits = bits;
        self
    }

    /// Sets the default starting counter value.
    #[must_use]
    pub fn with_start_value(mut self, value: u32) -> Self {
        self.start_value = value;
        self
    }

    /// Sets the initial session number.
    #[must_use]
    pub fn with_session(mut self, session: u16) -> Self {
        self.session = session;
        self
    }

    /// Parses and validates a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and any validation
    /// error reported by [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise
    /// the same errors as [`from_json_str`](Self::from_json_str).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Largest value a counter can hold at the configured width.
    #[inline]
    #[must_use]
    pub fn max_sequence(&self) -> u32 {
        max_for_bits(self.counter_bits)
    }

    /// Returns the effective starting value of `group`.
    #[must_use]
    pub fn start_value_for(&self, group: u32) -> u32 {
        self.groups
            .iter()
            .find(|g| g.id == group)
            .and_then(|g| g.start_value)
            .unwrap_or(self.start_value)
    }

    /// Checks every provisioning invariant.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant as a [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.counter_bits == 0 || self.counter_bits > MAX_COUNTER_BITS {
            return Err(ConfigError::InvalidCounterBits(self.counter_bits));
        }
        if self.num_groups == 0 || self.groups.is_empty() {
            return Err(ConfigError::NoGroups);
        }
        if self.num_groups > MAX_GROUPS {
            return Err(ConfigError::TooManyGroups(self.num_groups));
        }

        let max = self.max_sequence();
        let mut seen_groups = HashSet::with_capacity(self.groups.len());
        for group in &self.groups {
            if group.id >= self.num_groups {
                return Err(ConfigError::GroupOutOfRange {
                    group: group.id,
                    num_groups: self.num_groups,
                });
            }
            if !seen_groups.insert(group.id) {
                return Err(ConfigError::DuplicateGroup(group.id));
            }
            if group.replicas.is_empty() {
                return Err(ConfigError::EmptyFanOut(group.id));
            }
            let mut seen_replicas = HashSet::with_capacity(group.replicas.len());
            for replica in &group.replicas {
                if !seen_replicas.insert(*replica) {
                    return Err(ConfigError::DuplicateReplica {
                        group: group.id,
                        replica: *replica,
                    });
                }
            }
            let start = group.start_value.unwrap_or(self.start_value);
            if start > max {
                return Err(ConfigError::StartValueOutOfRange {
                    group: group.id,
                    value: start,
                    bits: self.counter_bits,
                });
            }
        }

        let mut seen_destinations = HashSet::with_capacity(self.destinations.len());
        for destination in &self.destinations {
            if !seen_destinations.insert(destination.address) {
                return Err(ConfigError::DuplicateDestination(destination.address));
            }
            if !seen_groups.contains(&destination.group) {
                return Err(ConfigError::UnknownGroup {
                    destination: destination.address,
                    group: destination.group,
                });
            }
        }

        Ok(())
    }
}

/// Largest value representable in `bits` bits (`bits` in `1..=32`).
#[inline]
pub(crate) fn max_for_bits(bits: u8) -> u32 {
    if bits >= MAX_COUNTER_BITS {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    }
}
