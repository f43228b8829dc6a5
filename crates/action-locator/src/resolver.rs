//! Fallback resolver over an ordered strategy list

use std::sync::Arc;

use tracing::{debug, info, warn};
use twizz_core_types::{BrowserPort, InteractionTarget};

use crate::errors::LocatorError;
use crate::strategies::probe;
use crate::types::{Resolution, StrategyAttempt, StrategyOutcome};

/// Resolves an [`InteractionTarget`] to a lazy locator.
///
/// One call is one scan of the strategy list with no retries and no side
/// effects on the page. The first strategy whose chosen element is visible
/// wins; failing that, the first strategy that matched an attached element
/// wins with `visible == false`.
#[derive(Clone)]
pub struct FallbackResolver {
    port: Arc<dyn BrowserPort>,
}

impl FallbackResolver {
    pub fn new(port: Arc<dyn BrowserPort>) -> Self {
        Self { port }
    }

    pub fn port(&self) -> &Arc<dyn BrowserPort> {
        &self.port
    }

    pub async fn resolve(&self, target: &InteractionTarget) -> Result<Resolution, LocatorError> {
        let mut attempts = Vec::with_capacity(target.len());
        let mut fallback: Option<Resolution> = None;

        for (strategy_index, strategy) in target.strategies().iter().enumerate() {
            let probed = probe(self.port.as_ref(), strategy, target.index()).await;
            debug!(
                target = %target.label(),
                strategy = %strategy,
                strategy_index,
                outcome = %probed.outcome,
                "probed strategy"
            );
            if let StrategyOutcome::ProviderError { error } = &probed.outcome {
                warn!(target = %target.label(), strategy = %strategy, error = %error, "strategy failed");
            }
            let matches = match &probed.outcome {
                StrategyOutcome::Visible { matches } | StrategyOutcome::Hidden { matches } => *matches,
                _ => 0,
            };
            attempts.push(StrategyAttempt {
                strategy_index,
                strategy: strategy.clone(),
                outcome: probed.outcome,
            });

            let Some((locator, snapshot)) = probed.found else {
                continue;
            };
            if snapshot.visible {
                info!(
                    target = %target.label(),
                    strategy = %locator.strategy,
                    strategy_index,
                    "resolved visible element"
                );
                return Ok(Resolution {
                    locator,
                    strategy_index,
                    snapshot,
                    matches,
                    attempts,
                });
            }
            if fallback.is_none() {
                fallback = Some(Resolution {
                    locator,
                    strategy_index,
                    snapshot,
                    matches,
                    attempts: Vec::new(),
                });
            }
        }

        match fallback {
            Some(mut resolution) => {
                debug!(
                    target = %target.label(),
                    strategy_index = resolution.strategy_index,
                    "no visible match; using first attached match"
                );
                resolution.attempts = attempts;
                Ok(resolution)
            }
            None => Err(LocatorError::ElementNotFound {
                target: target.label(),
                attempts,
            }),
        }
    }

    /// Match count of the first strategy that matches anything.
    ///
    /// Provider errors on individual strategies are skipped; if every
    /// strategy failed the last provider error is returned.
    pub async fn count(&self, target: &InteractionTarget) -> Result<usize, LocatorError> {
        let mut last_error = None;
        let mut any_answered = false;
        for strategy in target.strategies() {
            match self.port.count(strategy).await {
                Ok(0) => any_answered = true,
                Ok(n) => return Ok(n),
                Err(err) => {
                    warn!(target = %target.label(), strategy = %strategy, error = %err, "count failed");
                    last_error = Some(err);
                }
            }
        }
        match last_error {
            Some(err) if !any_answered => Err(LocatorError::Provider(err)),
            _ => Ok(0),
        }
    }
}
