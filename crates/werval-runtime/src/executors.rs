//! Application executors
//!
//! Executors are declared under `werval.executors`:
//!
//! ```toml
//! [werval.executors]
//! default = "app"
//! shutdown_timeout = "5s"
//!
//! [werval.executors.app]
//! type = "thread-pool"      # dedicated tokio runtime
//! count = 4                 # worker threads
//! thread_name_prefix = "werval-app"
//!
//! [werval.executors.inline]
//! type = "current"          # runtime of the caller
//! ```
//!
//! Every executor is wrapped in a [`ContextExecutor`] so the request context
//! follows the tasks submitted to it.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};
use tracing::{debug, info};
use werval_api::config::keys;
use werval_api::{Config, ContextExecutor, Result, TokioExecutor, WervalError};

const THREAD_POOL: &str = "thread-pool";
const CURRENT: &str = "current";

struct ManagedExecutor {
    executor: ContextExecutor,
    runtime: Option<Runtime>,
    shutdown_timeout: Duration,
    summary: String,
}

impl Drop for ManagedExecutor {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            match Handle::try_current().map(|handle| handle.runtime_flavor()) {
                Err(_) => runtime.shutdown_timeout(self.shutdown_timeout),
                // Worker threads may block once moved out of the scheduler
                Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(|| {
                    runtime.shutdown_timeout(self.shutdown_timeout)
                }),
                // A single-threaded caller cannot block
                Ok(_) => runtime.shutdown_background(),
            }
            debug!(executor = self.executor.name(), "Executor shut down");
        }
    }
}

/// Named executors of an application
pub struct ApplicationExecutors {
    default: String,
    executors: BTreeMap<String, ManagedExecutor>,
}

impl ApplicationExecutors {
    /// Executors declared in configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let declared = config.object(keys::EXECUTORS)?;
        let default = config.string(keys::EXECUTORS_DEFAULT)?;
        let shutdown_timeout =
            config.duration(keys::EXECUTORS_SHUTDOWN_TIMEOUT, Duration::from_millis(1))?;

        let mut executors = BTreeMap::new();
        for name in declared.sub_keys() {
            // Non-table entries are settings
            let Ok(settings) = declared.object(&name) else {
                continue;
            };
            let managed = Self::create(&name, &settings, shutdown_timeout)?;
            debug!(executor = %name, summary = %managed.summary, "Executor created");
            executors.insert(name, managed);
        }

        if !executors.contains_key(&default) {
            return Err(WervalError::config(
                keys::EXECUTORS_DEFAULT,
                format!("no executor named '{default}' is declared"),
            ));
        }

        let executors = Self { default, executors };
        info!("Application executors: {executors}");
        Ok(executors)
    }

    fn create(name: &str, settings: &Config, shutdown_timeout: Duration) -> Result<ManagedExecutor> {
        let key = |setting: &str| format!("{}.{name}.{setting}", keys::EXECUTORS);
        let kind = settings
            .string_optional("type")
            .unwrap_or_else(|| THREAD_POOL.to_string());

        match kind.as_str() {
            THREAD_POOL => {
                let count = settings.int("count").unwrap_or(4);
                if count < 1 {
                    return Err(WervalError::config(key("count"), "must be at least 1"));
                }
                let prefix = settings
                    .string_optional("thread_name_prefix")
                    .unwrap_or_else(|| format!("werval-{name}"));
                let runtime = Builder::new_multi_thread()
                    .worker_threads(count as usize)
                    .thread_name(prefix.clone())
                    .enable_all()
                    .build()?;
                let executor = ContextExecutor::new(name, TokioExecutor::new(runtime.handle().clone()));
                Ok(ManagedExecutor {
                    executor,
                    runtime: Some(runtime),
                    shutdown_timeout,
                    summary: format!("{THREAD_POOL}(count={count}, prefix={prefix})"),
                })
            }
            CURRENT => {
                let tokio = TokioExecutor::try_current().ok_or_else(|| {
                    WervalError::config(key("type"), "no runtime to run 'current' executor tasks on")
                })?;
                Ok(ManagedExecutor {
                    executor: ContextExecutor::new(name, tokio),
                    runtime: None,
                    shutdown_timeout,
                    summary: CURRENT.to_string(),
                })
            }
            other => Err(WervalError::config(
                key("type"),
                format!("unknown executor type '{other}', expected '{THREAD_POOL}' or '{CURRENT}'"),
            )),
        }
    }

    /// Executor used to process requests
    pub fn default_executor(&self) -> ContextExecutor {
        self.executors[&self.default].executor.clone()
    }

    pub fn default_name(&self) -> &str {
        &self.default
    }

    pub fn get(&self, name: &str) -> Option<ContextExecutor> {
        self.executors
            .get(name)
            .map(|managed| managed.executor.clone())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.executors.keys().map(String::as_str)
    }

    /// Stop every executor, waiting up to the configured timeout
    ///
    /// From a current-thread runtime the executors stop in the background
    /// without waiting.
    pub fn shutdown(self) {
        info!("Shutting down {} executor(s)", self.executors.len());
        drop(self);
    }
}

impl fmt::Display for ApplicationExecutors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, managed) in &self.executors {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{name}={}", managed.summary)?;
            if *name == self.default {
                write!(f, " (default)")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ApplicationExecutors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationExecutors")
            .field("default", &self.default)
            .field("executors", &self.executors.keys().collect::<Vec<_>>())
            .finish()
    }
}
