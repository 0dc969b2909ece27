//! The synchronization cycle.
//!
//! One [`Synchronizer::run_cycle`] call per scheduler tick: check the target
//! is still alive (or find it), resolve its addresses once per instance,
//! sample, classify against the previous observation and publish when the
//! status transition asks for it.

mod event;
mod inspect;
mod service;
mod state;

pub use event::SyncEvent;
pub use inspect::{Inspection, inspect};
pub use service::SyncService;
pub use state::{PlaybackState, SynchronizerState, TargetProcess};

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{Level, debug, error, info, warn};

use crate::config::{Config, MetadataConfig};
use crate::error::{Error, Result};
use crate::layout::LayoutCatalog;
use crate::metadata::{LocalFileSource, MetadataCache, MetadataSource, default_webdata_dir};
use crate::presence::{Activity, DiscordIpcClient, PresencePublisher};
use crate::process::{ProcessBackend, ProcessLocator, SystemProcessBackend, TARGET_MODULE};
use crate::sampler::{MemorySampler, Sample, SampleOutcome, format_position};
use crate::scheduler::{DEFAULT_INTERVAL, Tick};
use crate::status::{
    DEFAULT_IDLE_TIMEOUT, DEFAULT_TOLERANCE_SECS, Effect, PlaybackStatus, StatusClassifier, plan,
};

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub executable: String,
    pub module: String,
    pub interval: Duration,
    pub tolerance_secs: f64,
    pub idle_timeout: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            executable: crate::process::TARGET_EXECUTABLE.to_string(),
            module: TARGET_MODULE.to_string(),
            interval: DEFAULT_INTERVAL,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

impl SyncOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            executable: config.target.executable.clone(),
            module: config.target.module.clone(),
            interval: config.sync.interval(),
            tolerance_secs: config.sync.tolerance_secs,
            idle_timeout: config.sync.idle_timeout(),
        }
    }
}

/// Result of one cycle
#[derive(Debug, Default)]
pub struct CycleOutcome {
    pub events: Vec<SyncEvent>,
    /// Scheduling must stop
    pub stop: bool,
}

/// Build the metadata chain: local history, local queue, then the web API.
pub fn metadata_sources(config: &MetadataConfig) -> Vec<Box<dyn MetadataSource>> {
    let mut sources: Vec<Box<dyn MetadataSource>> = Vec::new();
    let webdata_dir = config.webdata_dir.clone().or_else(default_webdata_dir);

    match &webdata_dir {
        Some(dir) => {
            if config.history {
                sources.push(Box::new(LocalFileSource::history(dir)));
            }
            if config.queue {
                sources.push(Box::new(LocalFileSource::queue(dir)));
            }
        }
        None => warn!("Could not determine the local data directory, skipping local metadata"),
    }

    if config.remote {
        #[cfg(feature = "api")]
        sources.push(Box::new(crate::metadata::RemoteApiSource::new()));
        #[cfg(not(feature = "api"))]
        warn!("Remote metadata requested but the `api` feature is disabled");
    }

    sources
}

pub struct Synchronizer {
    backend: Box<dyn ProcessBackend>,
    locator: ProcessLocator,
    module: String,
    catalog: LayoutCatalog,
    classifier: StatusClassifier,
    metadata: MetadataCache,
    publisher: PresencePublisher,
    interval: Duration,
    state: SynchronizerState,
    events: Vec<SyncEvent>,
}

impl Synchronizer {
    pub fn new(
        backend: Box<dyn ProcessBackend>,
        catalog: LayoutCatalog,
        metadata: MetadataCache,
        publisher: PresencePublisher,
        options: SyncOptions,
    ) -> Self {
        Self {
            backend,
            locator: ProcessLocator::new(options.executable),
            module: options.module,
            catalog,
            classifier: StatusClassifier::new(options.tolerance_secs),
            metadata,
            publisher,
            interval: options.interval,
            state: SynchronizerState::new(options.idle_timeout),
            events: Vec::new(),
        }
    }

    /// Wire the real process backend, Discord client and metadata chain.
    pub fn from_config(config: &Config) -> Result<Self> {
        let catalog = LayoutCatalog::with_signatures(config.signature_set()?);
        let metadata = MetadataCache::new(metadata_sources(&config.metadata));
        let client = DiscordIpcClient::new(config.presence.client_id.clone());

        Ok(Self::new(
            Box::new(SystemProcessBackend::new()),
            catalog,
            metadata,
            PresencePublisher::new(Box::new(client)),
            SyncOptions::from_config(config),
        ))
    }

    pub fn state(&self) -> &SynchronizerState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        self.publisher.is_connected()
    }

    /// Run one cycle, applying the failure policy.
    ///
    /// Only an unsupported target version stops scheduling. Everything else
    /// is logged (transient failures and repeats at debug level) and retried
    /// on the next tick.
    pub fn run_cycle(&mut self, tick: Tick) -> CycleOutcome {
        let stop = match self.tick(tick) {
            Ok(()) => {
                self.state.last_failure = None;
                false
            }
            Err(e) => self.handle_failure(e),
        };
        CycleOutcome {
            events: std::mem::take(&mut self.events),
            stop,
        }
    }

    fn handle_failure(&mut self, e: Error) -> bool {
        if e.is_fatal() {
            error!("{}", e);
            self.state.target = None;
            self.publisher.disconnect();
            self.events.push(SyncEvent::Fatal(e.to_string()));
            return true;
        }

        let message = e.to_string();
        let repeated = self.state.last_failure.as_deref() == Some(message.as_str());
        if failure_level(&e, repeated) == Level::WARN {
            warn!("Update failed: {}", message);
        } else {
            debug!("Update failed{}: {}", if repeated { " again" } else { "" }, message);
        }
        if !repeated && e.is_user_facing() {
            self.events.push(SyncEvent::Warning(message.clone()));
        }
        self.state.last_failure = Some(message);
        false
    }

    /// One cycle without the failure policy.
    pub fn tick(&mut self, tick: Tick) -> Result<()> {
        if !self.ensure_target()? {
            return Ok(());
        }
        let Some(target) = self.state.target.as_mut() else {
            return Ok(());
        };

        let pointers = match target.pointers {
            Some(pointers) => pointers,
            None => {
                let pointers = target.layout.resolve(target.reader.as_ref())?;
                info!(
                    "Resolved addresses: position {:#x}, song {:?}",
                    pointers.position_address, pointers.song
                );
                target.pointers = Some(pointers);
                pointers
            }
        };

        let pid = target.pid;
        let sample = match MemorySampler::sample(target.reader.as_ref(), &pointers)? {
            SampleOutcome::Ready(sample) => sample,
            SampleOutcome::NotReady { token } => {
                debug!("Song id not ready yet (token {:?})", token);
                return Ok(());
            }
        };

        self.apply(pid, sample, tick.scheduled)
    }

    /// Make sure a live target is attached. Returns `false` if there is none.
    fn ensure_target(&mut self) -> Result<bool> {
        if let Some(pid) = self.state.target.as_ref().map(|t| t.pid) {
            if self.locator.is_alive(self.backend.as_mut(), pid) {
                return Ok(true);
            }
            self.detach(pid);
        }

        let Some(located) = self.locator.locate(self.backend.as_mut())? else {
            return Ok(false);
        };

        let layout = self.catalog.resolve(&located.version)?;
        let reader = match self.backend.attach(located.pid, &self.module) {
            Ok(reader) => reader,
            Err(e) if e.is_process_race() => {
                debug!("Process {} went away while attaching: {}", located.pid, e);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        info!(
            "Found process {} (version {}, {})",
            located.pid,
            located.version,
            layout.describe()
        );
        self.events.push(SyncEvent::Attached {
            pid: located.pid,
            version: located.version.clone(),
            layout: layout.describe(),
        });

        self.state.playback.reset_for_attach();
        self.state.idle.reset();
        self.state.target = Some(TargetProcess {
            pid: located.pid,
            version: located.version,
            executable: located.executable,
            reader,
            layout,
            pointers: None,
        });
        Ok(true)
    }

    fn detach(&mut self, pid: u32) {
        info!("Process {} is gone", pid);
        self.state.target = None;
        self.state.idle.reset();
        self.publisher.disconnect();
        self.events.push(SyncEvent::Detached { pid });
    }

    fn apply(&mut self, pid: u32, sample: Sample, at: Instant) -> Result<()> {
        let playback = &self.state.playback;
        let elapsed = playback.elapsed_since_sample(at, self.interval);
        let status = self.classifier.classify(playback.previous(), &sample, elapsed);
        let effect = plan(playback.status, status);
        debug!(
            "{} {} -> {} ({}) at {}",
            sample.song_id,
            playback.status,
            status,
            effect,
            format_position(sample.position_seconds)
        );

        match effect {
            Effect::Advance => {}
            Effect::HoldPaused => {
                if self.state.idle.poll(at) {
                    self.state.playback.record(&sample.song_id, sample.position_seconds, status, at);
                    info!("Paused for too long, clearing presence");
                    self.publisher.clear(pid)?;
                    self.events.push(SyncEvent::Cleared);
                    return Ok(());
                }
            }
            Effect::Pause | Effect::Resume | Effect::Change => {
                self.publish(pid, &sample, status)?;
                if effect == Effect::Pause {
                    self.state.idle.start(at);
                } else {
                    self.state.idle.reset();
                }
            }
        }

        self.state.playback.record(&sample.song_id, sample.position_seconds, status, at);
        Ok(())
    }

    /// Publish the current sample. Unknown songs are skipped silently.
    fn publish(&mut self, pid: u32, sample: &Sample, status: PlaybackStatus) -> Result<()> {
        let Some(metadata) = self.metadata.get(&sample.song_id) else {
            debug!("No metadata for {}, not publishing", sample.song_id);
            return Ok(());
        };

        let paused = status == PlaybackStatus::Paused;
        let activity = Activity::for_track(
            &sample.song_id,
            &metadata,
            sample.position_seconds,
            paused,
            Utc::now(),
        );
        self.publisher.publish(pid, &activity)?;

        if paused {
            info!("Paused: {}", metadata.title);
            self.events.push(SyncEvent::Paused {
                song_id: sample.song_id.clone(),
                title: metadata.title,
            });
        } else {
            info!(
                "{} - {}, {}",
                metadata.title,
                metadata.artist,
                format_position(sample.position_seconds)
            );
            self.events.push(SyncEvent::NowPlaying {
                song_id: sample.song_id.clone(),
                title: metadata.title,
                artist: metadata.artist,
                position_seconds: sample.position_seconds,
            });
        }
        Ok(())
    }

    /// Release the target and close the presence connection.
    pub fn shutdown(&mut self) {
        self.state.target = None;
        self.publisher.disconnect();
    }
}

/// Level for a non-fatal cycle failure. Repeats and transient failures stay
/// at debug; anything else is a warning the first time it is seen.
fn failure_level(error: &Error, repeated: bool) -> Level {
    if repeated || error.is_transient() {
        Level::DEBUG
    } else {
        Level::WARN
    }
}
