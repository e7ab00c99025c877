//! Bank selection
//!
//! A recorder holds two removable disk packs, one per bank. Selecting a bank is asynchronous on
//! the device: `bank_set=<id>` starts the switch and `bank_set?` reports progress until the
//! bank is settled. Depending on the firmware version, a switch in progress is reported with
//! status 5 or 6; both mean "still switching".

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::codec::Reply;
use crate::error::{Error, Result};
use crate::link::DeviceLink;
use crate::transport::Transport;

/// Status accepted from `bank_set?` while a switch is in progress
pub const BANK_POLL_ACCEPTED: &[&str] = &["0", "1", "5", "6"];

/// Status reported once the bank is settled
const SETTLED: &str = "0";

/// Marker the recorder uses for an empty bank slot
const EMPTY_SLOT: &str = "-";

/// Default interval between `bank_set?` polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default time allowed for a bank switch
pub const DEFAULT_SWITCH_TIMEOUT: Duration = Duration::from_secs(5);

/// A recorder bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum BankId {
    /// Bank A
    A,
    /// Bank B
    B,
}

impl fmt::Display for BankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BankId::A => write!(f, "A"),
            BankId::B => write!(f, "B"),
        }
    }
}

impl FromStr for BankId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(BankId::A),
            "B" => Ok(BankId::B),
            other => Err(format!("Unknown bank '{}'. Use: A or B", other)),
        }
    }
}

/// A disk pack mounted in one of the banks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountedBank {
    /// Bank holding the pack
    pub bank: BankId,
    /// Volume serial number of the pack
    pub vsn: String,
    /// Whether this is the currently selected bank
    pub active: bool,
}

/// Progress of one bank switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SwitchState {
    Requested,
    Switching,
    Settled,
}

/// Selects banks and waits for them to settle
#[derive(Debug, Clone)]
pub struct BankController<C: Clock = SystemClock> {
    clock: C,
    poll_interval: Duration,
    timeout: Duration,
}

impl BankController<SystemClock> {
    /// Create a controller polling on the wall clock with default timings
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for BankController<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> BankController<C> {
    /// Create a controller polling on `clock` with default timings
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_SWITCH_TIMEOUT,
        }
    }

    /// Set the interval between status polls
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the time allowed for a switch to settle
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The clock this controller polls on
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Select `bank` and block until the recorder reports it settled
    pub fn set_bank<T: Transport>(&self, link: &mut DeviceLink<T>, bank: BankId) -> Result<()> {
        link.send_query(&format!("bank_set={}", bank))?;

        let start = self.clock.now();
        let mut state = SwitchState::Requested;
        let mut polls = 0u32;

        while self.clock.now().duration_since(start) < self.timeout {
            let reply = link.send_query_accepting("bank_set?", BANK_POLL_ACCEPTED)?;
            polls += 1;

            if reply.status() == Some(SETTLED) {
                state = SwitchState::Settled;
                break;
            }
            if state == SwitchState::Requested {
                tracing::debug!("Bank {} switching (status {:?})", bank, reply.status());
            }
            state = SwitchState::Switching;
            self.clock.sleep(self.poll_interval);
        }

        let elapsed = self.clock.now().duration_since(start);
        if state != SwitchState::Settled {
            return Err(Error::BankSwitchTimeout { bank, elapsed });
        }

        tracing::debug!("Bank {} settled after {} poll(s), {:?}", bank, polls, elapsed);
        Ok(())
    }

    /// List the disk packs currently mounted, active bank first
    pub fn mounted_banks<T: Transport>(&self, link: &mut DeviceLink<T>) -> Result<Vec<MountedBank>> {
        let reply = link.send_query("bank_set?")?;
        parse_mounted_banks(&reply)
    }
}

fn parse_mounted_banks(reply: &Reply) -> Result<Vec<MountedBank>> {
    let mut banks = Vec::with_capacity(2);

    for (slot, active) in [(2, true), (4, false)] {
        let Some(id) = reply.field(slot) else {
            continue;
        };
        if id.is_empty() || id == EMPTY_SLOT {
            // Nothing selected means nothing mounted at all
            if active {
                break;
            }
            continue;
        }

        let bank = id
            .parse::<BankId>()
            .map_err(|reason| reply.malformed(reason))?;
        let vsn = reply.field(slot + 1).unwrap_or_default().to_string();
        banks.push(MountedBank { bank, vsn, active });
    }

    Ok(banks)
}
