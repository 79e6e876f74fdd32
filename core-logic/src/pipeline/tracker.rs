//! Per-wallet lifecycle tracking.
//!
//! ```text
//! Pending -> InFlight -> Success
//!                     -> Exhausted -> InFlight (reconcile, once) -> Success
//!                                                                -> PermanentlyFailed
//! ```
//!
//! Slots are keyed by input position: the list is not deduplicated, so two
//! entries with the same address are two independent lifecycles.

use crate::error::CoreError;
use crate::types::Wallet;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletState {
    Pending,
    InFlight,
    Success,
    Exhausted,
    PermanentlyFailed,
}

impl WalletState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletState::Pending => "Pending",
            WalletState::InFlight => "InFlight",
            WalletState::Success => "Success",
            WalletState::Exhausted => "Exhausted",
            WalletState::PermanentlyFailed => "PermanentlyFailed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WalletState::Success | WalletState::PermanentlyFailed)
    }
}

#[derive(Debug)]
struct Slot {
    wallet: Wallet,
    state: WalletState,
    attempts: u32,
    reconciled: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerCounts {
    pub pending: usize,
    pub in_flight: usize,
    pub success: usize,
    pub exhausted: usize,
    pub permanently_failed: usize,
}

#[derive(Debug)]
pub struct WalletTracker {
    slots: Mutex<Vec<Slot>>,
}

impl WalletTracker {
    pub fn new(wallets: &[Wallet]) -> Self {
        let slots = wallets
            .iter()
            .map(|wallet| Slot {
                wallet: wallet.clone(),
                state: WalletState::Pending,
                attempts: 0,
                reconciled: false,
            })
            .collect();
        Self {
            slots: Mutex::new(slots),
        }
    }

    fn with_slot<T>(
        &self,
        index: usize,
        f: impl FnOnce(&mut Slot) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let mut slots = self
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let total = slots.len();
        let slot = slots.get_mut(index).ok_or_else(|| CoreError::Unknown {
            message: format!("wallet index {} out of bounds (total: {})", index, total),
        })?;
        f(slot)
    }

    fn reject(index: usize, slot: &Slot, to: WalletState) -> CoreError {
        CoreError::InvalidTransition {
            index,
            wallet: slot.wallet.to_string(),
            from: slot.state.as_str(),
            to: to.as_str(),
        }
    }

    /// Scheduler pass: `Pending -> InFlight`. Rejects a second owner.
    pub fn begin(&self, index: usize) -> Result<(), CoreError> {
        self.with_slot(index, |slot| match slot.state {
            WalletState::Pending => {
                slot.state = WalletState::InFlight;
                Ok(())
            }
            _ => Err(Self::reject(index, slot, WalletState::InFlight)),
        })
    }

    /// Reconcile pass: `Exhausted -> InFlight`, allowed once.
    pub fn begin_reconcile(&self, index: usize) -> Result<(), CoreError> {
        self.with_slot(index, |slot| match slot.state {
            WalletState::Exhausted if !slot.reconciled => {
                slot.state = WalletState::InFlight;
                slot.reconciled = true;
                Ok(())
            }
            _ => Err(Self::reject(index, slot, WalletState::InFlight)),
        })
    }

    /// `InFlight -> Success | Exhausted | PermanentlyFailed`.
    pub fn complete(&self, index: usize, success: bool, attempts: u32) -> Result<WalletState, CoreError> {
        self.with_slot(index, |slot| {
            let next = match (success, slot.reconciled) {
                (true, _) => WalletState::Success,
                (false, false) => WalletState::Exhausted,
                (false, true) => WalletState::PermanentlyFailed,
            };
            if slot.state != WalletState::InFlight {
                return Err(Self::reject(index, slot, next));
            }
            slot.state = next;
            slot.attempts += attempts;
            Ok(next)
        })
    }

    pub fn state(&self, index: usize) -> Option<WalletState> {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(index)
            .map(|slot| slot.state)
    }

    /// Attempts across both passes.
    pub fn attempts(&self, index: usize) -> u32 {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(index)
            .map(|slot| slot.attempts)
            .unwrap_or(0)
    }

    pub fn counts(&self) -> TrackerCounts {
        let slots = self
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut counts = TrackerCounts::default();
        for slot in slots.iter() {
            match slot.state {
                WalletState::Pending => counts.pending += 1,
                WalletState::InFlight => counts.in_flight += 1,
                WalletState::Success => counts.success += 1,
                WalletState::Exhausted => counts.exhausted += 1,
                WalletState::PermanentlyFailed => counts.permanently_failed += 1,
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
