//! The tailer: follows one log file on a dedicated thread.
//!
//! Control calls (`set_path`, `set_paused`, `restart`, `close`) run on the
//! caller's thread and talk to the loop through a mutex-guarded state block
//! and a condition variable. Each pass re-opens the file, so a log replaced
//! under the same name is picked up by the next pass. A file that shrank
//! below the high-water mark, or whose inode or leading bytes changed since
//! the previous pass, is read again from the start.

use crate::config::TailerConfig;
use crate::error::{Error, Result};
use crate::event::TailEvent;
use crate::parser::StreamParser;
use crate::reader::{
    FileIdentity, detect_file_truncation, feed_range, measure_file, open_file, start_offset,
};
use crate::stream::{EventBus, EventStream};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default)]
struct TailerState {
    path: PathBuf,
    file_size: u64,
    paused: bool,
    /// High-water mark; `None` until the first pass of a session.
    read_offset: Option<u64>,
    /// The file as seen by the previous pass of this session.
    identity: Option<FileIdentity>,
    stopping: bool,
}

impl TailerState {
    fn reset_session(&mut self) {
        self.read_offset = None;
        self.identity = None;
    }
}

struct Shared {
    state: Mutex<TailerState>,
    /// Signalled on resume and on stop requests.
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, TailerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stop_requested(&self) -> bool {
        self.lock().stopping
    }
}

type ParserFactory<P> = Arc<dyn Fn() -> P + Send + Sync>;

/// Follows a single log file, handing appended bytes to a [`StreamParser`]
/// and broadcasting the results as [`TailEvent`]s.
///
/// The loop starts when a non-empty path is set and stops when the path
/// changes, on [`close`](Tailer::close), or when the tailer is dropped.
///
/// ```no_run
/// use log_tailer::{LineParser, TailEvent, Tailer};
///
/// let tailer = Tailer::new(LineParser::default);
/// let mut events = tailer.subscribe();
/// tailer.set_path("/var/log/app.log")?;
///
/// while let Some(event) = events.blocking_next() {
///     if let TailEvent::NewEntry(line) = event {
///         println!("{line}");
///     }
/// }
/// # Ok::<(), log_tailer::Error>(())
/// ```
pub struct Tailer<P: StreamParser> {
    shared: Arc<Shared>,
    events: Arc<EventBus<P::Entry>>,
    new_parser: ParserFactory<P>,
    config: TailerConfig,
    /// Held for the whole of every start/stop so at most one loop runs.
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<P: StreamParser> Tailer<P> {
    /// Creates an idle tailer with the default configuration.
    ///
    /// `new_parser` is called once per session to get a fresh parser.
    pub fn new<F>(new_parser: F) -> Self
    where
        F: Fn() -> P + Send + Sync + 'static,
    {
        Self::build(TailerConfig::default(), Arc::new(new_parser))
    }

    /// Creates an idle tailer, rejecting an invalid `config`.
    pub fn with_config<F>(config: TailerConfig, new_parser: F) -> Result<Self>
    where
        F: Fn() -> P + Send + Sync + 'static,
    {
        config.validate()?;
        Ok(Self::build(config, Arc::new(new_parser)))
    }

    fn build(config: TailerConfig, new_parser: ParserFactory<P>) -> Self {
        let state = TailerState {
            paused: config.start_paused,
            ..TailerState::default()
        };

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                wake: Condvar::new(),
            }),
            events: Arc::new(EventBus::new()),
            new_parser,
            config,
            worker: Mutex::new(None),
        }
    }

    /// Registers a new subscriber. It sees every event emitted from now on.
    pub fn subscribe(&self) -> EventStream<P::Entry> {
        self.events.subscribe()
    }

    /// Switches to `path`, restarting the loop against it.
    ///
    /// Setting the current path again does nothing. Otherwise the running
    /// loop is stopped (this call blocks until it has exited), the session is
    /// reset, and a new loop is started unless `path` is empty.
    ///
    /// The new path is committed and announced with [`TailEvent::PathChanged`]
    /// before the loop thread is spawned, so the announcement always precedes
    /// the first pass. If spawning fails the error is returned with the new
    /// path in place and no loop running; [`restart`](Tailer::restart) retries.
    pub fn set_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut worker = self.lock_worker();

        if self.shared.lock().path == path {
            return Ok(());
        }

        if let Err(e) = self.stop_worker(&mut worker) {
            warn!(error = %e, "Previous tail loop ended abnormally");
        }

        let previous_size = {
            let mut state = self.shared.lock();
            state.path = path.to_path_buf();
            state.reset_session();
            std::mem::take(&mut state.file_size)
        };

        info!(path = %path.display(), "Tail path changed");
        self.events.emit(TailEvent::PathChanged(path.to_path_buf()));
        if previous_size != 0 {
            self.events.emit(TailEvent::SizeChanged(0));
        }

        self.start_worker(&mut worker)
    }

    pub fn path(&self) -> PathBuf {
        self.shared.lock().path.clone()
    }

    /// Size of the file as of the latest pass.
    pub fn file_size(&self) -> u64 {
        self.shared.lock().file_size
    }

    pub fn is_paused(&self) -> bool {
        self.shared.lock().paused
    }

    /// Pauses or resumes reading. Resuming wakes the loop right away; the
    /// read position is kept either way.
    pub fn set_paused(&self, paused: bool) {
        self.update_paused(|_| paused);
    }

    /// Flips the pause state and returns the new one.
    pub fn toggle_paused(&self) -> bool {
        self.update_paused(|paused| !paused)
    }

    /// Starts a fresh session on the current path.
    ///
    /// This is how a consumer retries after the file could not be opened,
    /// since setting the same path again is a no-op.
    pub fn restart(&self) -> Result<()> {
        let mut worker = self.lock_worker();

        if let Err(e) = self.stop_worker(&mut worker) {
            warn!(error = %e, "Previous tail loop ended abnormally");
        }
        self.shared.lock().reset_session();

        self.start_worker(&mut worker)
    }

    /// Whether a loop thread is alive.
    pub fn is_running(&self) -> bool {
        self.lock_worker()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the loop and waits for its thread to exit. Calling it again is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut worker = self.lock_worker();
        self.stop_worker(&mut worker)
    }

    pub fn config(&self) -> &TailerConfig {
        &self.config
    }

    fn update_paused(&self, next: impl FnOnce(bool) -> bool) -> bool {
        let paused = {
            let mut state = self.shared.lock();
            let paused = next(state.paused);
            if state.paused == paused {
                return paused;
            }
            state.paused = paused;
            if !paused {
                self.shared.wake.notify_all();
            }
            paused
        };

        info!(paused, "Tail pause state changed");
        self.events.emit(TailEvent::PausedChanged(paused));
        paused
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_worker(&self, worker: &mut Option<JoinHandle<()>>) -> Result<()> {
        let path = self.shared.lock().path.clone();
        if path.as_os_str().is_empty() {
            debug!("No path set, tailer idle");
            return Ok(());
        }

        let session = Session {
            path,
            shared: Arc::clone(&self.shared),
            events: Arc::clone(&self.events),
            parser: (self.new_parser)(),
            poll_interval: self.config.poll_interval,
            pause_timeout: self.config.pause_timeout,
        };

        let handle = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || session.run())?;
        *worker = Some(handle);

        Ok(())
    }

    /// Requests a stop, joins the loop thread and clears the request so the
    /// tailer can start again.
    fn stop_worker(&self, worker: &mut Option<JoinHandle<()>>) -> Result<()> {
        let joined = match worker.take() {
            Some(handle) => {
                self.shared.lock().stopping = true;
                self.shared.wake.notify_all();
                handle.join().map_err(|_| Error::WorkerPanicked)
            }
            None => Ok(()),
        };

        self.shared.lock().stopping = false;
        joined
    }
}

impl<P: StreamParser> Drop for Tailer<P> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "Tail loop ended abnormally");
        }
    }
}

/// Everything the loop thread owns for one session.
struct Session<P: StreamParser> {
    path: PathBuf,
    shared: Arc<Shared>,
    events: Arc<EventBus<P::Entry>>,
    parser: P,
    poll_interval: Duration,
    pause_timeout: Duration,
}

impl<P: StreamParser> Session<P> {
    fn run(mut self) {
        info!(path = %self.path.display(), "Tail loop started");

        while !self.shared.stop_requested() {
            let paused = self.shared.lock().paused;
            if !paused {
                if let Err(e) = self.pass() {
                    error!(path = %self.path.display(), error = %e, "Tail loop stopping");
                    self.shared.lock().stopping = true;
                    self.events.emit(TailEvent::from_error(&e, true));
                    break;
                }
            }

            if !self.wait_while_paused() || !self.sleep_interval() {
                break;
            }
        }

        info!(path = %self.path.display(), "Tail loop stopped");
    }

    /// One open-measure-read cycle. Only an open failure is returned; read
    /// failures are reported as events and the loop carries on.
    fn pass(&mut self) -> Result<()> {
        let mut file = open_file(&self.path)?;

        let surveyed = measure_file(&mut file, &self.path).and_then(|size| {
            FileIdentity::read(&mut file, &self.path, size).map(|identity| (size, identity))
        });
        let (size, identity) = match surveyed {
            Ok(surveyed) => surveyed,
            Err(e) => {
                self.report_read_error(&e);
                return Ok(());
            }
        };

        let (size_changed, truncated, replaced, start) = {
            let mut state = self.shared.lock();
            let size_changed = state.file_size != size;
            state.file_size = size;
            let truncated = state
                .read_offset
                .is_some_and(|offset| detect_file_truncation(size, offset));
            let replaced = state
                .identity
                .as_ref()
                .is_some_and(|previous| !previous.continued_by(&identity));
            let start = if replaced {
                0
            } else {
                start_offset(state.read_offset, size)
            };
            state.read_offset = Some(size);
            state.identity = Some(identity);
            (size_changed, truncated, replaced, start)
        };

        if size_changed {
            self.events.emit(TailEvent::SizeChanged(size));
        }
        if truncated || replaced {
            warn!(
                path = %self.path.display(),
                new_size = size,
                truncated,
                replaced,
                "File truncated or rotated, reading from the start"
            );
            self.parser.reset();
        }

        let events = &self.events;
        let mut entries = 0usize;
        let fed = feed_range(
            &mut file,
            &self.path,
            start,
            size,
            &mut self.parser,
            &mut |entry| {
                entries += 1;
                events.emit(TailEvent::NewEntry(entry));
            },
        );
        drop(file);

        if let Err(e) = fed {
            self.report_read_error(&e);
        }

        debug!(path = %self.path.display(), start, end = size, entries, "Tail pass complete");
        self.events.emit(TailEvent::BatchEnd(size));
        Ok(())
    }

    fn report_read_error(&self, e: &Error) {
        warn!(path = %self.path.display(), error = %e, "Tail read failed");
        self.events.emit(TailEvent::from_error(e, false));
    }

    /// Blocks while paused, waking at least every `pause_timeout` to check
    /// for a stop. Returns `false` if a stop was requested.
    fn wait_while_paused(&self) -> bool {
        let mut state = self.shared.lock();
        while state.paused && !state.stopping {
            state = self
                .shared
                .wake
                .wait_timeout(state, self.pause_timeout)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        !state.stopping
    }

    /// Sleeps for the poll interval unless a stop arrives first.
    fn sleep_interval(&self) -> bool {
        let state = self.shared.lock();
        let (state, _) = self
            .shared
            .wake
            .wait_timeout_while(state, self.poll_interval, |state| !state.stopping)
            .unwrap_or_else(PoisonError::into_inner);
        !state.stopping
    }
}
