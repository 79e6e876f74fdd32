use crate::error::ConfigError;
use crate::types::Proxy;
use rand::seq::SliceRandom;

/// Where the first proxy of a retry loop comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxySource {
    /// Position-correlated primary slot, falling back to the reserve.
    Primary(usize),
    /// Random reserve proxy.
    Reserve,
}

/// Primary slots plus a reserve that is sampled with replacement.
///
/// The pool is immutable after construction; workers share it read-only and
/// the same reserve proxy may be handed to several workers at once.
#[derive(Debug, Clone, Default)]
pub struct ProxyPool {
    primary: Vec<Option<Proxy>>,
    reserve: Vec<Proxy>,
}

impl ProxyPool {
    pub fn new(primary: Vec<Option<Proxy>>, reserve: Vec<Proxy>) -> Self {
        Self { primary, reserve }
    }

    /// Every wallet has a primary proxy at the same position.
    pub fn from_primary(primary: Vec<Proxy>, reserve: Vec<Proxy>) -> Self {
        Self::new(primary.into_iter().map(Some).collect(), reserve)
    }

    /// Primary proxy for the wallet at `wallet_index`, or a random reserve one
    /// when the slot is missing.
    pub fn next(&self, wallet_index: usize) -> Result<Proxy, ConfigError> {
        match self.primary.get(wallet_index) {
            Some(Some(proxy)) => Ok(proxy.clone()),
            _ => self.random_reserve(),
        }
    }

    pub fn random_reserve(&self) -> Result<Proxy, ConfigError> {
        self.reserve
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(ConfigError::NoReserveProxies)
    }

    pub fn select(&self, source: ProxySource) -> Result<Proxy, ConfigError> {
        match source {
            ProxySource::Primary(index) => self.next(index),
            ProxySource::Reserve => self.random_reserve(),
        }
    }

    pub fn primary_len(&self) -> usize {
        self.primary.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn reserve_len(&self) -> usize {
        self.reserve.len()
    }
}
