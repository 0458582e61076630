use prometrics::metrics::MetricBuilder;
use slog::{Discard, Logger};
use uuid::Uuid;

use super::ledger::Ledger;
use super::{Arena, Policy};
use crate::metrics::ArenaMetrics;
use crate::{ErrorKind, Result};

/// Builder of `Arena`.
#[derive(Debug, Clone)]
pub struct ArenaBuilder {
    policy: Policy,
    instance_uuid: Option<Uuid>,
    metrics: MetricBuilder,
    logger: Logger,
}
impl ArenaBuilder {
    /// Makes a new `ArenaBuilder` instance with the default settings.
    pub fn new() -> Self {
        ArenaBuilder {
            policy: Policy::default(),
            instance_uuid: None,
            metrics: MetricBuilder::new(),
            logger: Logger::root(Discard, o!()),
        }
    }

    /// Sets the placement policy.
    ///
    /// The default value is `Policy::FirstFit`.
    pub fn policy(&mut self, policy: Policy) -> &mut Self {
        self.policy = policy;
        self
    }

    /// Sets the UUID that identifies the arena instance.
    ///
    /// The UUID is attached to every log record emitted by the arena.
    /// If this method is not called, a random UUID is assigned.
    pub fn instance_uuid(&mut self, uuid: Uuid) -> &mut Self {
        self.instance_uuid = Some(uuid);
        self
    }

    /// Registers the common settings of metrics.
    ///
    /// The default value is `MetricBuilder::new()`.
    pub fn metrics(&mut self, metrics: MetricBuilder) -> &mut Self {
        self.metrics = metrics;
        self
    }

    /// Registers the logger used by the arena.
    ///
    /// The default logger discards all records.
    pub fn logger(&mut self, logger: Logger) -> &mut Self {
        self.logger = logger;
        self
    }

    /// Makes an arena of `total_size` units consisting of a single free block.
    ///
    /// # Errors
    ///
    /// Returns an error of kind `ErrorKind::InvalidSize` if `total_size` is zero.
    pub fn finish(&self, total_size: u64) -> Result<Arena> {
        track_assert!(
            total_size > 0,
            ErrorKind::InvalidSize,
            "Arena size must be positive"
        );

        let uuid = self.instance_uuid.unwrap_or_else(Uuid::new_v4);
        let logger = self.logger.new(o!(
            "arena" => uuid.to_string(),
            "policy" => self.policy.as_str()
        ));
        info!(logger, "Arena created"; "total_size" => total_size);

        let ledger = Ledger::new(total_size);
        let cursor = ledger.head();
        Ok(Arena {
            ledger,
            policy: self.policy,
            cursor,
            total_size,
            uuid,
            metrics: ArenaMetrics::new(&self.metrics, total_size, self.policy),
            logger,
        })
    }
}
impl Default for ArenaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use trackable::result::TestResult;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn builder_works() -> TestResult {
        let uuid = Uuid::new_v4();
        let arena = track!(ArenaBuilder::new()
            .policy(Policy::WorstFit)
            .instance_uuid(uuid)
            .finish(64))?;
        assert_eq!(arena.policy(), Policy::WorstFit);
        assert_eq!(arena.instance_uuid(), uuid);
        assert_eq!(arena.total_size(), 64);
        assert_eq!(arena.metrics().policy(), Policy::WorstFit);
        assert_eq!(arena.metrics().total_size(), 64);
        Ok(())
    }

    #[test]
    fn zero_size_is_rejected() {
        let e = ArenaBuilder::new().finish(0).err().map(|e| *e.kind());
        assert_eq!(e, Some(ErrorKind::InvalidSize));
    }
}
