//! Shared setup for commands that talk to surveys.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use hipstile::config::{config_file_path, EngineConfig};
use hipstile::decode::TileDecoder;
use hipstile::loader::TileLoader;
use hipstile::logging::{init_logging, LogOptions, WorkerGuard};
use hipstile::survey::{Survey, SurveySettings};
use tokio::runtime::Runtime;
use tracing::{info, warn};

use crate::error::CliError;

/// How long to wait for a survey's properties and allsky.
const READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub verbose: bool,
    pub log_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

impl GlobalOptions {
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(config_file_path)
    }
}

/// Owns the configuration, logging guard, runtime and loader for one command.
pub struct CliRunner {
    config: EngineConfig,
    runtime: Runtime,
    loader: Arc<TileLoader>,
    _log_guard: Option<WorkerGuard>,
}

impl CliRunner {
    pub fn new(options: &GlobalOptions) -> Result<Self, CliError> {
        let log_guard = init_logging(&LogOptions {
            filter: options.verbose.then(|| "hipstile=debug".to_string()),
            directory: options.log_dir.clone(),
        })?;

        let config = EngineConfig::load_from(&options.config_path())?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)?;
        let loader = Arc::new(TileLoader::from_config(
            &config.loader_config(),
            runtime.handle().clone(),
        )?);

        Ok(Self {
            config,
            runtime,
            loader,
            _log_guard: log_guard,
        })
    }

    pub fn log_startup(&self, command: &str) {
        info!(
            command,
            version = env!("CARGO_PKG_VERSION"),
            max_concurrent = self.config.loader.max_concurrent,
            "hipstile starting"
        );
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn loader(&self) -> &Arc<TileLoader> {
        &self.loader
    }

    /// Open a survey and wait until its metadata is resolved.
    pub fn open_survey<T>(
        &self,
        url: &str,
        decoder: Arc<dyn TileDecoder<T>>,
    ) -> Result<Arc<Survey<T>>, CliError>
    where
        T: Send + Sync + 'static,
    {
        let settings = SurveySettings::new(decoder)
            .with_defaults(self.config.property_defaults())
            .with_cache(self.config.cache_config());
        let survey = Survey::create(url, None, settings, Arc::clone(&self.loader));
        wait_ready(&self.runtime, &survey, READY_TIMEOUT)?;
        Ok(survey)
    }

    /// Poll `done` until it returns true or `timeout` elapses.
    pub fn wait_until<F>(&self, timeout: Duration, mut done: F) -> bool
    where
        F: FnMut() -> bool,
    {
        self.runtime.block_on(async {
            let deadline = tokio::time::Instant::now() + timeout;
            while !done() {
                if tokio::time::Instant::now() >= deadline {
                    return false;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            true
        })
    }
}

/// Block until `survey` is ready, or fail with [`CliError::Timeout`].
fn wait_ready<T>(runtime: &Runtime, survey: &Survey<T>, timeout: Duration) -> Result<(), CliError> {
    let ready = runtime.block_on(async { tokio::time::timeout(timeout, survey.wait_ready()).await });
    if ready.is_err() {
        warn!(url = survey.url(), "Survey metadata did not arrive in time");
        return Err(CliError::Timeout {
            what: survey.url().to_string(),
            after: timeout,
        });
    }
    Ok(())
}
