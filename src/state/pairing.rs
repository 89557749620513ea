/// Pairing confirmations
///
/// Pending-confirmation map: device address → (timer, request sequence).
/// A confirmation request starts a timer whose expiry comes back through the
/// event queue as [`CoreEvent::ConfirmationExpired`] and auto-rejects the
/// device. Answering first cancels the timer.
///
/// The timer may already have fired when the user answers; the device then
/// sees a second answer, which the hardware manager ignores. The request
/// sequence keeps a stale expiry from touching a newer request for the same
/// address.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

use parking_lot::Mutex;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::PairingError;
use crate::messaging::{CommandCode, CoreEvent, HardwareCommand, NotificationInfo, SignalSender};
use crate::timer::{TimerId, TimerService};

pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_millis(30_000);

fn address_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[0-9A-F]{2}(:[0-9A-F]{2}){1,7}$").ok())
        .as_ref()
}

/// Canonical (trimmed, uppercase) form of a colon-separated device address
pub fn normalize_address(raw: &str) -> Option<String> {
    let address = raw.trim().to_ascii_uppercase();
    match address_pattern() {
        Some(pattern) if !pattern.is_match(&address) => None,
        _ if address.is_empty() => None,
        _ => Some(address),
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingConfirmation {
    timer: TimerId,
    request: u64,
}

pub struct PairingConfirmations {
    timers: TimerService<CoreEvent>,
    hardware: SignalSender<HardwareCommand>,
    timeout: Duration,
    pending: Mutex<HashMap<String, PendingConfirmation>>,
    next_request: AtomicU64,
}

impl PairingConfirmations {
    pub fn new(
        timers: TimerService<CoreEvent>,
        hardware: SignalSender<HardwareCommand>,
        timeout: Duration,
    ) -> Self {
        Self {
            timers,
            hardware,
            timeout,
            pending: Mutex::new(HashMap::new()),
            next_request: AtomicU64::new(1),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start waiting for the user to confirm pairing with `address`.
    ///
    /// A repeated request for the same address replaces the previous one.
    pub fn request(&self, address: &str) -> Result<TimerId, PairingError> {
        let Some(address) = normalize_address(address) else {
            return Err(PairingError::InvalidAddress(address.to_string()));
        };

        let request = self.next_request.fetch_add(1, Ordering::SeqCst);
        let mut pending = self.pending.lock();

        let timer = self.timers.start_timer(
            self.timeout,
            CoreEvent::ConfirmationExpired {
                address: address.clone(),
                request,
            },
        )?;

        if let Some(previous) = pending.insert(address.clone(), PendingConfirmation { timer, request }) {
            self.timers.stop_timer(previous.timer);
            debug!("Replaced pending confirmation #{} for {}", previous.request, address);
        }

        info!(
            "Waiting for pairing confirmation of {} (#{}, {:?})",
            address, request, self.timeout
        );
        Ok(timer)
    }

    /// User accepted pairing with `address`
    pub fn accept(&self, address: &str) -> bool {
        self.answer(address, HardwareCommand::AcceptPairing)
    }

    /// User rejected pairing with `address`
    pub fn reject(&self, address: &str) -> bool {
        self.answer(address, HardwareCommand::RejectPairing)
    }

    fn answer(&self, address: &str, command: HardwareCommand) -> bool {
        let Some(address) = normalize_address(address) else {
            warn!("{}: invalid address '{}'", command.description(), address);
            return false;
        };

        let removed = {
            let mut pending = self.pending.lock();
            let removed = pending.remove(&address);
            if let Some(entry) = removed {
                self.timers.stop_timer(entry.timer);
            }
            removed
        };

        match removed {
            Some(entry) => {
                debug!("Answering confirmation #{} for {}", entry.request, address);
                self.send(command, &address)
            }
            None => {
                warn!("No pending confirmation for {}, ignoring", address);
                false
            }
        }
    }

    /// Timer expiry: auto-reject if `request` is still the live one.
    pub fn expire(&self, address: &str, request: u64) -> bool {
        let matched = {
            let mut pending = self.pending.lock();
            match pending.get(address) {
                Some(entry) if entry.request == request => pending.remove(address).is_some(),
                _ => false,
            }
        };

        if !matched {
            debug!("Stale expiry #{} for {}, ignoring", request, address);
            return false;
        }

        info!("Pairing confirmation for {} timed out, rejecting", address);
        self.send(HardwareCommand::RejectPairing, address)
    }

    /// Drop every pending confirmation without answering
    pub fn clear(&self) {
        let mut pending = self.pending.lock();
        for (_, entry) in pending.drain() {
            self.timers.stop_timer(entry.timer);
        }
    }

    /// Addresses waiting for an answer, sorted
    pub fn pending(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self.pending.lock().keys().cloned().collect();
        addresses.sort();
        addresses
    }

    pub fn timer_for(&self, address: &str) -> Option<TimerId> {
        let address = normalize_address(address)?;
        self.pending.lock().get(&address).map(|entry| entry.timer)
    }

    fn send(&self, command: HardwareCommand, address: &str) -> bool {
        self.hardware
            .send_with_info(command, NotificationInfo::new().with_address(address))
    }
}
