//! Erase and conditioning of one bank
//!
//! An erase is a single batched `protect=off;reset=erase`. Conditioning additionally runs a full
//! read/write cycle over the pack (`reset=condition`) which can take many hours; the controller
//! polls `tstat=` until the transfer is gone and, when asked to, samples the byte position to
//! report progress and throughput.
//!
//! If anything goes wrong while the conditioning transfer is running, the recorder is told to
//! stop with a single `reset=abort` before the error is returned. A conditioning pass left
//! running would keep the recorder busy long after the operator has moved on.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};

use crate::bank::{BankController, BankId};
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::link::DeviceLink;
use crate::stats::{collect_disk_stats, DiskSerials, DiskStatVector, DiskStats, DriveKey};
use crate::transport::Transport;

/// Default time between progress samples while conditioning
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(60);

/// Default time between `tstat=` polls when progress is not sampled
pub const DEFAULT_TRANSFER_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Smallest histogram threshold, in seconds
const THRESHOLD_BASE_SECS: f64 = 0.001125;

/// Number of histogram thresholds configured before conditioning
const THRESHOLD_COUNT: i32 = 7;

/// Transfer state reported by `tstat=` once conditioning has finished
const NO_TRANSFER: &str = "no_transfer";

/// Histogram thresholds used for the drive statistics during conditioning
pub fn stat_thresholds() -> Vec<f64> {
    (0..THRESHOLD_COUNT)
        .map(|i| THRESHOLD_BASE_SECS * 2f64.powi(i))
        .collect()
}

/// Format thresholds as the argument list of `start_stats=`
pub fn format_thresholds(thresholds: &[f64]) -> String {
    thresholds
        .iter()
        .map(|t| format!("{:.6}s", t))
        .collect::<Vec<_>>()
        .join(" : ")
}

/// Configuration for erase operations
#[derive(Debug, Clone)]
pub struct EraseConfig {
    /// Run a read/write conditioning cycle after the erase
    pub condition: bool,

    /// Sample the byte position while conditioning
    pub sample_progress: bool,

    /// Time between progress samples
    pub sample_interval: Duration,

    /// Time between transfer polls when not sampling
    pub transfer_poll_interval: Duration,
}

impl Default for EraseConfig {
    fn default() -> Self {
        Self {
            condition: false,
            sample_progress: false,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            transfer_poll_interval: DEFAULT_TRANSFER_POLL_INTERVAL,
        }
    }
}

impl EraseConfig {
    /// Create a new config with defaults (plain erase)
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable conditioning
    pub fn condition(mut self, condition: bool) -> Self {
        self.condition = condition;
        self
    }

    /// Enable progress sampling (only used when conditioning)
    pub fn sample_progress(mut self, sample: bool) -> Self {
        self.sample_progress = sample;
        self
    }

    /// Set the time between progress samples
    pub fn sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    /// Set the time between transfer polls when not sampling
    pub fn transfer_poll_interval(mut self, interval: Duration) -> Self {
        self.transfer_poll_interval = interval;
        self
    }
}

/// Outcome of one erase or conditioning run
#[derive(Debug, Clone, Serialize)]
pub struct EraseResult {
    /// Time from the erase command until statistics were collected
    #[serde(serialize_with = "serialize_secs")]
    pub duration: Duration,

    /// Statistics per drive
    #[serde(serialize_with = "serialize_disk_stats")]
    pub disk_stats: DiskStats,

    /// Slowest sampled read rate in bytes per second
    pub min_data_rate: Option<f64>,

    /// Fastest sampled read rate in bytes per second
    pub max_data_rate: Option<f64>,

    /// Histogram thresholds in seconds (conditioning only)
    pub stat_thresholds: Option<Vec<f64>>,
}

impl EraseResult {
    /// Fixed result used by the CLI's test mode
    pub fn simulated() -> Self {
        let mut values: DiskStatVector = Default::default();
        for (i, value) in values.iter_mut().enumerate() {
            *value = i as u64;
        }

        let disk_stats = (0..8)
            .map(|disk| {
                (
                    DriveKey {
                        index: disk,
                        serial: format!("disk{}", disk),
                    },
                    values,
                )
            })
            .collect();

        Self {
            duration: Duration::from_secs(2 * 60 * 60),
            disk_stats,
            min_data_rate: Some(255e6),
            max_data_rate: Some(257e6),
            stat_thresholds: Some((0..7).map(f64::from).collect()),
        }
    }
}

fn serialize_secs<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

fn serialize_disk_stats<S: Serializer>(
    stats: &DiskStats,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    struct Drive<'a> {
        drive: usize,
        serial: &'a str,
        stats: &'a DiskStatVector,
    }

    serializer.collect_seq(stats.iter().map(|(key, values)| Drive {
        drive: key.index,
        serial: &key.serial,
        stats: values,
    }))
}

/// Which half of the conditioning cycle is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConditionPass {
    /// Reading the pack back
    Read,
    /// Writing the pack
    Write,
}

impl fmt::Display for ConditionPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionPass::Read => write!(f, "Read"),
            ConditionPass::Write => write!(f, "Write"),
        }
    }
}

/// One conditioning progress sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionProgress {
    /// Bank being conditioned
    pub bank: BankId,

    /// Current pass
    pub pass: ConditionPass,

    /// Bytes left in this pass, summed over all busses
    pub bytes_to_go: u64,

    /// Capacity of the pack in bytes
    pub pack_size: u64,

    /// Read rate since the previous sample, in bytes per second
    pub data_rate: Option<f64>,
}

impl ConditionProgress {
    /// Bytes to go as a percentage of the pack size
    pub fn percentage(&self) -> f64 {
        if self.pack_size == 0 {
            0.0
        } else {
            (self.bytes_to_go as f64 / self.pack_size as f64) * 100.0
        }
    }
}

/// Progress callback type
pub type ProgressCallback = Box<dyn Fn(&ConditionProgress) + Send + Sync>;

/// Turns successive position readings into a pass and a data rate
///
/// The position counts down while the pack is read. A rising position means the write pass has
/// started; no rate is derived from those samples.
#[derive(Debug, Clone)]
pub struct ProgressSampler {
    last: Option<(u64, Instant)>,
    pass: ConditionPass,
    min_rate: Option<f64>,
    max_rate: Option<f64>,
}

impl ProgressSampler {
    /// Create a sampler that has seen nothing yet
    pub fn new() -> Self {
        Self {
            last: None,
            pass: ConditionPass::Read,
            min_rate: None,
            max_rate: None,
        }
    }

    /// Record a position reading taken at `at`, returning the rate since the previous one
    pub fn sample(&mut self, bytes: u64, at: Instant) -> Option<f64> {
        let mut rate = None;

        if let Some((prev_bytes, prev_at)) = self.last {
            if bytes > prev_bytes {
                self.pass = ConditionPass::Write;
            } else {
                let secs = at.saturating_duration_since(prev_at).as_secs_f64();
                if secs > 0.0 {
                    let r = (prev_bytes - bytes) as f64 / secs;
                    self.min_rate = Some(self.min_rate.map_or(r, |m| m.min(r)));
                    self.max_rate = Some(self.max_rate.map_or(r, |m| m.max(r)));
                    rate = Some(r);
                }
            }
        }

        self.last = Some((bytes, at));
        rate
    }

    /// Current pass
    pub fn pass(&self) -> ConditionPass {
        self.pass
    }

    /// Slowest rate seen so far
    pub fn min_rate(&self) -> Option<f64> {
        self.min_rate
    }

    /// Fastest rate seen so far
    pub fn max_rate(&self) -> Option<f64> {
        self.max_rate
    }
}

impl Default for ProgressSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Sends one `reset=abort` when dropped, unless disarmed first
struct AbortGuard<'a, T: Transport> {
    link: &'a mut DeviceLink<T>,
    armed: bool,
}

impl<'a, T: Transport> AbortGuard<'a, T> {
    fn new(link: &'a mut DeviceLink<T>) -> Self {
        Self { link, armed: true }
    }

    fn link(&mut self) -> &mut DeviceLink<T> {
        &mut *self.link
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<T: Transport> Drop for AbortGuard<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        tracing::warn!("Conditioning interrupted, aborting transfer");
        if let Err(e) = self.link.send_query("reset=abort") {
            tracing::warn!("Failed to abort conditioning: {}", e);
        }
    }
}

/// Runs erase and conditioning on a recorder
pub struct EraseController<C: Clock = SystemClock> {
    config: EraseConfig,
    banks: BankController<C>,
    progress_callback: Option<ProgressCallback>,
    cancel_flag: Arc<AtomicBool>,
}

impl EraseController<SystemClock> {
    /// Create a controller with default configuration
    pub fn new() -> Self {
        Self::with_config(EraseConfig::default())
    }

    /// Create a controller with custom configuration
    pub fn with_config(config: EraseConfig) -> Self {
        Self::with_bank_controller(config, BankController::new())
    }
}

impl Default for EraseController<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> EraseController<C> {
    /// Create a controller that settles banks (and keeps time) through `banks`
    pub fn with_bank_controller(config: EraseConfig, banks: BankController<C>) -> Self {
        Self {
            config,
            banks,
            progress_callback: None,
            cancel_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set a progress callback, called once per conditioning sample
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ConditionProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    /// Get a handle to cancel the run
    ///
    /// Once set, no further erase or condition command is sent; a conditioning pass already
    /// under way is aborted.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel_flag)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel_flag.load(Ordering::SeqCst) {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Erase (and optionally condition) `bank`, then collect drive statistics
    pub fn run<T: Transport>(&self, link: &mut DeviceLink<T>, bank: BankId) -> Result<EraseResult> {
        self.check_cancelled()?;
        self.banks.set_bank(link, bank)?;

        let thresholds = if self.config.condition {
            let thresholds = stat_thresholds();
            link.send_query(&format!("start_stats={}", format_thresholds(&thresholds)))?;
            Some(thresholds)
        } else {
            None
        };

        let bus_count = if self.config.condition && self.config.sample_progress {
            let busses = DiskSerials::query(link)?.bus_count();
            tracing::debug!("{} bus(ses) with a master drive", busses);
            Some(busses)
        } else {
            None
        };

        let pack_size: u64 = link
            .send_query("dir_info?")?
            .parse_field(4, "pack size")?;

        self.check_cancelled()?;
        let clock = self.banks.clock();
        let started = clock.now();

        tracing::info!("Erasing bank {}", bank);
        link.send_queries(&["protect=off", "reset=erase"])?;

        let sampler = if self.config.condition {
            self.check_cancelled()?;
            tracing::info!("Conditioning bank {}", bank);
            link.send_queries(&["protect=off", "reset=condition"])?;
            Some(self.condition(link, bank, pack_size, bus_count)?)
        } else {
            None
        };

        let disk_stats = collect_disk_stats(link)?;
        let duration = clock.now().saturating_duration_since(started);
        tracing::info!("Bank {} done in {:?}", bank, duration);

        Ok(EraseResult {
            duration,
            disk_stats,
            min_data_rate: sampler.as_ref().and_then(ProgressSampler::min_rate),
            max_data_rate: sampler.as_ref().and_then(ProgressSampler::max_rate),
            stat_thresholds: thresholds,
        })
    }

    fn condition<T: Transport>(
        &self,
        link: &mut DeviceLink<T>,
        bank: BankId,
        pack_size: u64,
        bus_count: Option<u64>,
    ) -> Result<ProgressSampler> {
        let clock = self.banks.clock();
        let position_query = link.device_type().position_query();
        let mut sampler = ProgressSampler::new();
        let mut guard = AbortGuard::new(link);

        loop {
            self.check_cancelled()?;

            let transfer = guard.link().send_query("tstat=")?;
            if transfer.require(3, "transfer state")? == NO_TRANSFER {
                break;
            }

            let Some(busses) = bus_count else {
                clock.sleep(self.config.transfer_poll_interval);
                continue;
            };

            let position: u64 = guard
                .link()
                .send_query(position_query)?
                .parse_field(2, "position")?;
            let bytes_to_go = position.saturating_mul(busses);
            let data_rate = sampler.sample(bytes_to_go, clock.now());

            let progress = ConditionProgress {
                bank,
                pass: sampler.pass(),
                bytes_to_go,
                pack_size,
                data_rate,
            };
            tracing::debug!(
                "Bank {} {} pass: {} bytes to go ({:.0}%)",
                bank,
                progress.pass,
                bytes_to_go,
                progress.percentage()
            );
            if let Some(ref callback) = self.progress_callback {
                callback(&progress);
            }

            clock.sleep(self.config.sample_interval);
        }

        guard.disarm();
        Ok(sampler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::transport::{ScriptedTransport, SentLog};
    use std::io;
    use std::sync::Mutex;

    /// Recorder double: `busy_polls` `tstat=` polls report a running transfer, `positions` are
    /// handed out by the position query, and a position of `None` is rejected by the device.
    fn recorder(busy_polls: usize, positions: Vec<Option<u64>>) -> ScriptedTransport {
        let mut tstat_calls = 0;
        let mut positions = positions.into_iter();
        let mut next_drive = 0;

        ScriptedTransport::new(move |line| {
            let reply = match line {
                "dts_id?" => "!dts_id? 0 : mark5b ;".to_string(),
                "bank_set=A" | "bank_set=B" => "!bank_set= 1 ;".to_string(),
                "bank_set?" => "!bank_set? 0 : A : VSN-1 : - :  ;".to_string(),
                "disk_serial?" => "!disk_serial? 0 : M0 : S0 : M1 :  ;".to_string(),
                "dir_info?" => "!dir_info? 0 : 0 : 0 : 1000 ;".to_string(),
                "protect=off;reset=erase" => "!protect= 0 ;!reset= 0 ;".to_string(),
                "protect=off;reset=condition" => "!protect= 0 ;!reset= 1 ;".to_string(),
                "reset=abort" => "!reset= 0 ;".to_string(),
                "tstat=" => {
                    tstat_calls += 1;
                    let state = if tstat_calls > busy_polls {
                        NO_TRANSFER
                    } else {
                        "Condition"
                    };
                    format!("!tstat= 0 : 12.5 : {} ;", state)
                }
                "pointers?" => match positions.next().flatten() {
                    Some(position) => format!("!pointers? 0 : {} : 0 ;", position),
                    None => "!pointers? 6 : not available ;".to_string(),
                },
                "get_stats?" => {
                    let drive = next_drive;
                    next_drive = (next_drive + 1) % 3;
                    format!("!get_stats? 0 : {} : 1 : 2 : 3 : 4 : 5 : 6 : 7 : 8 : 9 ;", drive)
                }
                other if other.starts_with("start_stats=") => "!start_stats= 0 ;".to_string(),
                other => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("unexpected query '{}'", other),
                    ))
                }
            };
            Ok(reply)
        })
    }

    fn connect(transport: ScriptedTransport) -> (DeviceLink<ScriptedTransport>, SentLog) {
        let log = transport.sent_log();
        (DeviceLink::with_transport(transport).unwrap(), log)
    }

    fn controller(config: EraseConfig, clock: &ManualClock) -> EraseController<ManualClock> {
        EraseController::with_bank_controller(config, BankController::with_clock(clock.clone()))
    }

    #[test]
    fn test_thresholds_format() {
        let thresholds = stat_thresholds();
        assert_eq!(thresholds.len(), 7);
        assert_eq!(
            format_thresholds(&thresholds),
            "0.001125s : 0.002250s : 0.004500s : 0.009000s : 0.018000s : 0.036000s : 0.072000s"
        );
    }

    #[test]
    fn test_erase_only_sequence() {
        let (mut link, log) = connect(recorder(0, vec![]));
        let clock = ManualClock::new();

        let result = controller(EraseConfig::new(), &clock)
            .run(&mut link, BankId::A)
            .unwrap();

        let lines = log.lines();
        assert_eq!(
            &lines[..5],
            &["dts_id?", "bank_set=A", "bank_set?", "dir_info?", "protect=off;reset=erase"]
        );
        assert_eq!(log.count("reset=condition"), 0);
        assert_eq!(log.count("tstat="), 0);
        assert_eq!(log.count("reset=abort"), 0);
        assert_eq!(result.disk_stats.len(), 3);
        assert!(result.stat_thresholds.is_none());
        assert!(result.min_data_rate.is_none());
    }

    #[test]
    fn test_condition_without_sampling() {
        let (mut link, log) = connect(recorder(3, vec![]));
        let clock = ManualClock::new();

        let result = controller(EraseConfig::new().condition(true), &clock)
            .run(&mut link, BankId::B)
            .unwrap();

        let queries = log.queries();
        let erase = queries.iter().position(|q| q == "reset=erase").unwrap();
        let condition = queries.iter().position(|q| q == "reset=condition").unwrap();
        assert!(erase < condition);
        assert_eq!(log.count("tstat="), 4);
        assert_eq!(log.count("pointers?"), 0);
        assert_eq!(log.count("disk_serial?"), 1);
        assert_eq!(result.duration, Duration::from_secs(3));
        assert_eq!(result.stat_thresholds.as_ref().map(Vec::len), Some(7));
        assert!(result.max_data_rate.is_none());
    }

    #[test]
    fn test_condition_with_sampling() {
        let positions = vec![Some(400), Some(300), Some(100), Some(300)];
        let (mut link, log) = connect(recorder(4, positions));
        let clock = ManualClock::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let config = EraseConfig::new().condition(true).sample_progress(true);
        let result = controller(config, &clock)
            .on_progress(move |progress| sink.lock().unwrap().push(progress.clone()))
            .run(&mut link, BankId::A)
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        // Two busses with a master drive
        assert_eq!(seen[0].bytes_to_go, 800);
        assert_eq!(seen[0].percentage(), 80.0);
        assert!(seen[0].data_rate.is_none());
        assert_eq!(seen[2].pass, ConditionPass::Read);
        assert_eq!(seen[3].pass, ConditionPass::Write);
        assert!(seen[3].data_rate.is_none());

        let min = result.min_data_rate.unwrap();
        let max = result.max_data_rate.unwrap();
        assert!((min - 200.0 / 60.0).abs() < 1e-9);
        assert!((max - 400.0 / 60.0).abs() < 1e-9);
        assert_eq!(result.duration, Duration::from_secs(240));
        assert_eq!(log.count("disk_serial?"), 2);
        assert_eq!(log.count("reset=abort"), 0);
    }

    #[test]
    fn test_sampling_failure_aborts_once() {
        let (mut link, log) = connect(recorder(10, vec![Some(400), None]));
        let clock = ManualClock::new();

        let config = EraseConfig::new().condition(true).sample_progress(true);
        let err = controller(config, &clock)
            .run(&mut link, BankId::A)
            .unwrap_err();

        assert!(matches!(err, Error::CommandRejected { ref query, .. } if query == "pointers?"));
        assert_eq!(log.count("reset=abort"), 1);
        assert_eq!(log.lines().last().map(String::as_str), Some("reset=abort"));
        assert_eq!(log.count("get_stats?"), 0);
    }

    #[test]
    fn test_failed_abort_keeps_original_error() {
        let mut inner = recorder(10, vec![Some(400), None]);
        let transport = ScriptedTransport::new(move |line| {
            if line == "reset=abort" {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
            }
            inner.send(line)?;
            inner.receive()
        });
        let (mut link, log) = connect(transport);

        let config = EraseConfig::new().condition(true).sample_progress(true);
        let err = controller(config, &ManualClock::new())
            .run(&mut link, BankId::A)
            .unwrap_err();

        assert!(matches!(err, Error::CommandRejected { .. }));
        assert_eq!(log.count("reset=abort"), 1);
    }

    #[test]
    fn test_cancel_before_run_sends_nothing() {
        for config in [EraseConfig::new(), EraseConfig::new().condition(true)] {
            let (mut link, log) = connect(recorder(10, vec![]));
            let controller = controller(config, &ManualClock::new());
            controller.cancel_handle().store(true, Ordering::SeqCst);

            let err = controller.run(&mut link, BankId::A).unwrap_err();

            assert!(matches!(err, Error::Cancelled));
            assert_eq!(log.lines(), vec!["dts_id?"]);
        }
    }

    #[test]
    fn test_cancel_before_erase_sends_no_reset() {
        let controller = controller(EraseConfig::new().condition(true), &ManualClock::new());
        let cancel = controller.cancel_handle();

        // Operator interrupts while the pack size is being read
        let transport = ScriptedTransport::new(move |line| {
            let reply = match line {
                "dts_id?" => "!dts_id? 0 : mark5b ;",
                "bank_set=A" => "!bank_set= 1 ;",
                "bank_set?" => "!bank_set? 0 : A : VSN-1 : - :  ;",
                "dir_info?" => {
                    cancel.store(true, Ordering::SeqCst);
                    "!dir_info? 0 : 0 : 0 : 1000 ;"
                }
                other if other.starts_with("start_stats=") => "!start_stats= 0 ;",
                _ => "!reset= 0 ;",
            };
            Ok(reply.to_string())
        });
        let (mut link, log) = connect(transport);

        let err = controller.run(&mut link, BankId::A).unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(log.lines().last().unwrap(), "dir_info?");
        assert!(log.queries().iter().all(|q| !q.starts_with("reset=")));
    }

    #[test]
    fn test_cancel_during_conditioning_aborts() {
        let clock = ManualClock::new();
        let (mut link, log) = connect(recorder(10, vec![Some(400), Some(300), Some(200)]));
        let controller = controller(
            EraseConfig::new().condition(true).sample_progress(true),
            &clock,
        );
        let cancel = controller.cancel_handle();
        let controller = controller.on_progress(move |_| cancel.store(true, Ordering::SeqCst));

        let err = controller.run(&mut link, BankId::A).unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(log.count("tstat="), 1);
        assert_eq!(log.count("reset=condition"), 1);
        assert_eq!(log.count("reset=abort"), 1);
        assert_eq!(log.lines().last().unwrap(), "reset=abort");
        assert_eq!(log.count("get_stats?"), 0);
    }

    #[test]
    fn test_sampler_rates() {
        let start = Instant::now();
        let mut sampler = ProgressSampler::new();

        assert_eq!(sampler.sample(1000, start), None);
        assert_eq!(sampler.sample(400, start + Duration::from_secs(2)), Some(300.0));
        assert_eq!(sampler.sample(300, start + Duration::from_secs(3)), Some(100.0));
        assert_eq!(sampler.pass(), ConditionPass::Read);
        assert_eq!(sampler.sample(900, start + Duration::from_secs(4)), None);
        assert_eq!(sampler.pass(), ConditionPass::Write);
        assert_eq!(sampler.min_rate(), Some(100.0));
        assert_eq!(sampler.max_rate(), Some(300.0));
    }

    #[test]
    fn test_sampler_same_instant() {
        let now = Instant::now();
        let mut sampler = ProgressSampler::new();
        sampler.sample(100, now);
        assert_eq!(sampler.sample(50, now), None);
        assert!(sampler.min_rate().is_none());
    }

    #[test]
    fn test_simulated_result_json() {
        let value = serde_json::to_value(EraseResult::simulated()).unwrap();
        assert_eq!(value["duration"], 7200.0);
        assert_eq!(value["disk_stats"].as_array().unwrap().len(), 8);
        assert_eq!(value["disk_stats"][3]["serial"], "disk3");
        assert_eq!(value["disk_stats"][3]["stats"][8], 8);
        assert_eq!(value["min_data_rate"], 255e6);
        assert_eq!(value["stat_thresholds"].as_array().unwrap().len(), 7);
    }

    #[test]
    fn test_config_builder() {
        let config = EraseConfig::new()
            .condition(true)
            .sample_progress(true)
            .sample_interval(Duration::from_secs(5))
            .transfer_poll_interval(Duration::from_millis(200));
        assert!(config.condition);
        assert!(config.sample_progress);
        assert_eq!(config.sample_interval, Duration::from_secs(5));
        assert_eq!(config.transfer_poll_interval, Duration::from_millis(200));
        assert!(!EraseConfig::default().condition);
    }
}
