/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Destination to sequencing-group resolution.
//!
//! The [`GroupResolver`] is an immutable lookup table built from a validated
//! [`SequencerConfig`]. It is never edited in place: re-provisioning builds a
//! new resolver and swaps it in.

use crate::config::SequencerConfig;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;

/// Shared, immutable fan-out set of a group.
pub type FanOut = Arc<[SocketAddr]>;

/// Errors returned by [`GroupResolver::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The destination was not provisioned.
    #[error("destination {0} is not provisioned")]
    NotFound(SocketAddr),
}

/// Result of resolving a destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Sequencing group of the destination.
    pub group_id: u32,

    /// Replicas of that group.
    pub fan_out: FanOut,
}

/// Immutable destination → `(group, fan-out)` table.
#[derive(Debug, Clone)]
pub struct GroupResolver {
    num_groups: u32,
    routes: HashMap<SocketAddr, u32>,
    fan_outs: Vec<Option<FanOut>>,
}

impl GroupResolver {
    /// Builds a resolver from `config`.
    ///
    /// The configuration is expected to have passed
    /// [`SequencerConfig::validate`]; destinations pointing at unconfigured
    /// groups are skipped.
    #[must_use]
    pub fn from_config(config: &SequencerConfig) -> Self {
        let mut fan_outs: Vec<Option<FanOut>> = vec![None; config.num_groups as usize];
        for group in &config.groups {
            if let Some(slot) = fan_outs.get_mut(group.id as usize) {
                *slot = Some(Arc::from(group.replicas.as_slice()));
            }
        }

        let routes = config
            .destinations
            .iter()
            .filter(|d| {
                fan_outs
                    .get(d.group as usize)
                    .is_some_and(|slot| slot.is_some())
            })
            .map(|d| (d.address, d.group))
            .collect();

        Self {
            num_groups: config.num_groups,
            routes,
            fan_outs,
        }
    }

    /// Resolves `destination` to its group and fan-out set.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NotFound`] for destinations that were not
    /// provisioned.
    #[inline]
    pub fn resolve(&self, destination: &SocketAddr) -> Result<Resolution, ResolveError> {
        let group_id = *self
            .routes
            .get(destination)
            .ok_or(ResolveError::NotFound(*destination))?;
        let fan_out = self
            .fan_out(group_id)
            .ok_or(ResolveError::NotFound(*destination))?;
        Ok(Resolution { group_id, fan_out })
    }

    /// Returns the fan-out set of `group_id`, if the group is configured.
    #[must_use]
    pub fn fan_out(&self, group_id: u32) -> Option<FanOut> {
        self.fan_outs.get(group_id as usize)?.clone()
    }

    /// Upper bound on group ids.
    #[inline]
    #[must_use]
    pub fn num_groups(&self) -> u32 {
        self.num_groups
    }

    /// Iterates over every provisioned destination address.
    pub fn destinations(&self) -> impl Iterator<Item = &SocketAddr> + '_ {
        self.routes.keys()
    }

    /// Iterates over the ids of every configured group.
    pub fn groups(&self) -> impl Iterator<Item = u32> + '_ {
        self.fan_outs
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(id, _)| id as u32)
    }
}
