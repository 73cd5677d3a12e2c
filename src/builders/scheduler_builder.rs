//! Builder that wires a [`Scheduler`] from a validated [`SchedulerConfig`].

use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::core::{
    AuditSink, CredentialPool, JobExecutor, Scheduler, SchedulerError, SchedulerOptions, Spawn,
    SubmitterLedger,
};
use crate::util::clock::{Clock, SystemClock};

/// Assembles a scheduler from configuration plus host-supplied pieces.
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    clock: Arc<dyn Clock>,
    audit: Option<Box<dyn AuditSink>>,
}

impl SchedulerBuilder {
    /// Start from a configuration.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            audit: None,
        }
    }

    /// Configuration the builder will apply.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Use a different time source for cooldown deadlines.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn audit(mut self, sink: Box<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Validate the configuration and build the scheduler.
    ///
    /// # Errors
    ///
    /// `SchedulerError::InvalidConfig` when validation fails.
    pub fn build<P, R, E, S>(self, executor: E, spawner: S) -> Result<Scheduler<P, R, E, S>, SchedulerError>
    where
        P: Send + 'static,
        R: Send + 'static,
        E: JobExecutor<P, R>,
        S: Spawn + Send + Sync + 'static,
    {
        self.config.validate().map_err(SchedulerError::InvalidConfig)?;

        let pool = CredentialPool::with_credentials(self.config.credentials.credentials());
        let ledger = SubmitterLedger::with_clock(self.config.admission_policy(), self.clock);
        let options = SchedulerOptions {
            audit: self.audit,
            resubmit_handoff: self.config.resubmit_handoff(),
        };
        Ok(Scheduler::new(pool, ledger, executor, spawner, options))
    }
}
