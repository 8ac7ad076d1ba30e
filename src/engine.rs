// The runner: generates candidate buffers (fresh random, then mutated),
// executes them against the user's test callback, and hands accepted
// interesting buffers off to the shrink passes in `shrink.rs`.

use std::env;
use std::panic::{self, AssertUnwindSafe, PanicInfo};
use std::sync::Once;

use crate::acceptor::should_accept;
use crate::data::TestData;
use crate::errors::{DrawResult, SettingsError, ShrinkResult};
use crate::mutator::mutate_to_new_buffer;
use crate::random::RandomSource;
use crate::status::Status;

/// Tunable limits for a single `find_interesting_buffer` run. Defaults
/// mirror the reference implementation's own `Settings` class.
#[derive(Debug, Clone)]
pub struct Settings {
    pub buffer_size: usize,
    pub mutations: u64,
    pub generations: u64,
    pub max_shrinks: u64,
    /// Mirrors `CONJECTURE_DEBUG`: a toggle an embedding harness can use to
    /// decide whether to print extra progress information, independent of
    /// the `log` crate's own level filtering.
    pub debug: bool,
    /// When set, both OS-entropy-seeded phases of randomness are replaced
    /// by a deterministic seed, making a run fully reproducible.
    pub seed: Option<[u32; 8]>,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            buffer_size: 8 * 1024,
            mutations: 50,
            generations: 100,
            max_shrinks: 2000,
            debug: env::var("CONJECTURE_DEBUG").as_deref() == Ok("true"),
            seed: None,
        }
    }
}

impl Settings {
    /// Overlays `CONJECTURE_BUFFER_SIZE`, `CONJECTURE_MUTATIONS`,
    /// `CONJECTURE_GENERATIONS`, `CONJECTURE_MAX_SHRINKS` and
    /// `CONJECTURE_DEBUG` onto the defaults, rejecting malformed values
    /// instead of silently ignoring them.
    pub fn from_env() -> Result<Settings, SettingsError> {
        let mut settings = Settings::default();
        if let Some(v) = parse_env_usize("CONJECTURE_BUFFER_SIZE")? {
            settings.buffer_size = v;
        }
        if let Some(v) = parse_env_u64("CONJECTURE_MUTATIONS")? {
            settings.mutations = v;
        }
        if let Some(v) = parse_env_u64("CONJECTURE_GENERATIONS")? {
            settings.generations = v;
        }
        if let Some(v) = parse_env_u64("CONJECTURE_MAX_SHRINKS")? {
            settings.max_shrinks = v;
        }
        if let Some(v) = parse_env_bool("CONJECTURE_DEBUG")? {
            settings.debug = v;
        }
        Ok(settings)
    }
}

fn parse_env_usize(var: &'static str) -> Result<Option<usize>, SettingsError> {
    match env::var(var) {
        Err(_) => Ok(None),
        Ok(value) => value
            .parse::<usize>()
            .map(Some)
            .map_err(|_| SettingsError::InvalidInteger { var, value }),
    }
}

fn parse_env_u64(var: &'static str) -> Result<Option<u64>, SettingsError> {
    match env::var(var) {
        Err(_) => Ok(None),
        Ok(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|_| SettingsError::InvalidInteger { var, value }),
    }
}

fn parse_env_bool(var: &'static str) -> Result<Option<bool>, SettingsError> {
    match env::var(var) {
        Err(_) => Ok(None),
        Ok(value) => match value.as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            _ => Err(SettingsError::InvalidBool { var, value }),
        },
    }
}

/// Runs the user's test callback against one candidate buffer, catching
/// both the `Abort` short-circuit (overrun / invalid) and an outright panic
/// (the property-failure signal) at this single boundary.
pub(crate) fn execute<F>(test: &mut F, buffer: Vec<u8>) -> TestData
where
    F: FnMut(&mut TestData) -> DrawResult<()>,
{
    let mut data = TestData::new(buffer);
    match panic::catch_unwind(AssertUnwindSafe(|| test(&mut data))) {
        Ok(_) => {}
        Err(_) => data.mark_interesting(),
    }
    data.freeze();
    data
}

/// Installs a silent panic hook for the lifetime of the guard. Test-failure
/// signals are expected control flow here, not bugs, so we don't want every
/// candidate execution spamming stderr with a backtrace.
struct SilentPanics {
    previous: Option<Box<dyn Fn(&PanicInfo<'_>) + Sync + Send>>,
}

impl SilentPanics {
    fn install() -> SilentPanics {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(|_| {}));
        SilentPanics {
            previous: Some(previous),
        }
    }
}

impl Drop for SilentPanics {
    fn drop(&mut self) {
        if let Some(hook) = self.previous.take() {
            panic::set_hook(hook);
        }
    }
}

static INIT_LOGGING_NOTE: Once = Once::new();

/// Drives the full search: random generation with mutation, then shrinking
/// the first interesting buffer found to a local fixed point.
pub struct Engine<F> {
    test: F,
    pub(crate) settings: Settings,
    pub(crate) rand: RandomSource,
    pub(crate) last_data: TestData,
    fill_size: usize,
    pub(crate) changed: u64,
    pub(crate) shrinks: u64,
}

impl<F> Engine<F>
where
    F: FnMut(&mut TestData) -> DrawResult<()>,
{
    pub(crate) fn new(mut test: F, settings: Settings) -> Engine<F> {
        let mut rand = match settings.seed {
            Some(seed) => RandomSource::from_seed(&seed),
            None => RandomSource::from_entropy(),
        };
        let fill_size = settings.buffer_size.min(8);
        let initial_buffer = initial_candidate(&mut rand, fill_size, settings.buffer_size);
        let last_data = execute(&mut test, initial_buffer);
        let mut engine = Engine {
            test,
            settings,
            rand,
            last_data,
            fill_size,
            changed: 0,
            shrinks: 0,
        };
        engine.update_fill_size();
        engine
    }

    fn new_buffer(&mut self) {
        let buffer = initial_candidate(&mut self.rand, self.fill_size, self.settings.buffer_size);
        self.last_data = execute(&mut self.test, buffer);
        self.update_fill_size();
    }

    fn update_fill_size(&mut self) {
        self.fill_size = self
            .fill_size
            .max(self.last_data.index() * 2)
            .min(self.settings.buffer_size);
    }

    /// Executes `buffer` and, if it's an improvement over `last_data` under
    /// the acceptor's rules, replaces `last_data` with it. Returns whether
    /// it was accepted. Propagates `BudgetExhausted` once the shrink budget
    /// has been spent.
    pub(crate) fn incorporate_new_buffer(&mut self, buffer: Vec<u8>) -> ShrinkResult<bool> {
        if buffer == self.last_data.buffer() {
            return Ok(false);
        }
        let candidate = execute(&mut self.test, buffer);
        if should_accept(&self.last_data, &candidate) {
            let was_interesting = self.last_data.status() == Status::Interesting;
            log::debug!(
                "accepted {:?} -> {:?} (len {} -> {})",
                self.last_data.status(),
                candidate.status(),
                self.last_data.buffer().len(),
                candidate.buffer().len(),
            );
            self.last_data = candidate;
            self.update_fill_size();
            self.changed += 1;
            if was_interesting {
                self.shrinks += 1;
                if self.shrinks >= self.settings.max_shrinks {
                    log::debug!("shrink budget of {} exhausted", self.settings.max_shrinks);
                    return Err(crate::errors::BudgetExhausted);
                }
            }
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn run_generation_phase(&mut self) {
        log::debug!("starting generation phase");
        let mut mutations = 0u64;
        let mut generation = 0u64;
        while self.last_data.status() != Status::Interesting {
            if mutations >= self.settings.mutations {
                generation += 1;
                if generation >= self.settings.generations {
                    log::debug!("exhausted {} generations without finding a failure", generation);
                    return;
                }
                mutations = 0;
                let mutated = mutate_to_new_buffer(&self.last_data, &mut self.rand);
                // The shrink budget can't be exhausted here: it only counts
                // transitions away from an already-Interesting `last_data`,
                // and we're in this loop precisely because we aren't there
                // yet. `run` asserts this never actually fires.
                let _ = self.incorporate_new_buffer(mutated);
            } else {
                self.new_buffer();
            }
            mutations += 1;
        }
        log::debug!(
            "found an interesting buffer of length {} after {} generation(s)",
            self.last_data.buffer().len(),
            generation
        );
    }

    pub(crate) fn run(&mut self) {
        let _silence = SilentPanics::install();
        if self.settings.debug {
            INIT_LOGGING_NOTE.call_once(|| {
                log::info!("conjecture-engine running with CONJECTURE_DEBUG enabled");
            });
        }
        self.run_generation_phase();
        if self.last_data.status() == Status::Interesting {
            log::debug!("starting shrink phase (budget {})", self.settings.max_shrinks);
            // Ignore BudgetExhausted: it just means we stop with the best
            // candidate found so far, which is exactly what we want to
            // return.
            let _ = self.shrink();
            log::debug!(
                "shrink phase finished at length {} after {} accepted shrink(s)",
                self.last_data.buffer().len(),
                self.shrinks
            );
        }
    }
}

fn initial_candidate(rand: &mut RandomSource, fill_size: usize, buffer_size: usize) -> Vec<u8> {
    let mut buffer = rand.bytes(fill_size);
    buffer.resize(buffer_size, 0);
    buffer
}

/// Runs the engine to completion and returns the shrunken interesting
/// buffer, if the search found one at all.
pub fn find_interesting_buffer<F>(test: F, settings: Option<Settings>) -> Option<Vec<u8>>
where
    F: FnMut(&mut TestData) -> DrawResult<()>,
{
    let mut engine = Engine::new(test, settings.unwrap_or_default());
    engine.run();
    if engine.last_data.status() == Status::Interesting {
        Some(engine.last_data.into_buffer())
    } else {
        None
    }
}
