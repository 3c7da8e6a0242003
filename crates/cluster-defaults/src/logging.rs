//! Installs the global `tracing` subscriber of a process embedding the
//! defaulting engine.
use std::path::{Path, PathBuf};

use snafu::{ResultExt, Snafu};
use tracing::{level_filters::LevelFilter, subscriber::SetGlobalDefaultError};
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt};

const MAX_LOG_FILES: usize = 6;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to initialize rolling file appender in {directory:?}"))]
    InitRollingFileAppender {
        source: InitError,
        directory: PathBuf,
    },

    #[snafu(display("unable to set the global default subscriber"))]
    SetGlobalDefaultSubscriber { source: SetGlobalDefaultError },
}

/// Initializes `tracing` logging with options from the environment variable
/// given in the `env` parameter.
///
/// Console output is always enabled. JSON log files, rotated hourly, are
/// written as well if `log_directory` is given or the `{env}_DIRECTORY`
/// environment variable is set.
pub fn initialize_logging(env: &str, app_name: &str, log_directory: Option<&Path>) -> Result<()> {
    let mut layers: Vec<Box<dyn Layer<Registry> + Sync + Send>> = vec![
        tracing_subscriber::fmt::layer()
            .with_filter(env_filter(env))
            .boxed(),
    ];

    let directory = log_directory
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(format!("{env}_DIRECTORY")).map(PathBuf::from));
    if let Some(directory) = directory {
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(file_appender(&directory, app_name)?)
                .with_filter(env_filter(env))
                .boxed(),
        );
    }

    let subscriber = Registry::default().with(layers);
    tracing::subscriber::set_global_default(subscriber).context(SetGlobalDefaultSubscriberSnafu)
}

fn env_filter(env: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_env_var(env)
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
}

fn file_appender(directory: &Path, app_name: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::HOURLY)
        .filename_suffix(format!("{app_name}.log"))
        .max_log_files(MAX_LOG_FILES)
        .build(directory)
        .context(InitRollingFileAppenderSnafu { directory })
}
