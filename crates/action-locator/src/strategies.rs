//! Single-strategy probing
//!
//! A probe runs one strategy exactly once: count, pick the preferred index,
//! snapshot the chosen element. The resolver chains probes in priority order.

use tracing::debug;
use twizz_core_types::{BrowserPort, ElementIndex, ElementLocator, ElementSnapshot, SelectorStrategy};

use crate::types::StrategyOutcome;

/// Result of probing one strategy.
#[derive(Debug, Clone)]
pub struct Probe {
    pub outcome: StrategyOutcome,
    pub found: Option<(ElementLocator, ElementSnapshot)>,
}

impl Probe {
    fn miss(outcome: StrategyOutcome) -> Self {
        Self {
            outcome,
            found: None,
        }
    }
}

pub async fn probe(
    port: &dyn BrowserPort,
    strategy: &SelectorStrategy,
    index: ElementIndex,
) -> Probe {
    let matches = match port.count(strategy).await {
        Ok(matches) => matches,
        Err(error) => return Probe::miss(StrategyOutcome::ProviderError { error }),
    };
    if matches == 0 {
        return Probe::miss(StrategyOutcome::NoMatch);
    }
    let Some(position) = index.pick(matches) else {
        return Probe::miss(StrategyOutcome::IndexOutOfRange { matches, index });
    };

    let locator = ElementLocator::new(strategy.clone(), position);
    match port.snapshot(&locator).await {
        Ok(Some(snapshot)) => {
            let outcome = if snapshot.visible {
                StrategyOutcome::Visible { matches }
            } else {
                StrategyOutcome::Hidden { matches }
            };
            Probe {
                outcome,
                found: Some((locator, snapshot)),
            }
        }
        // Detached between count and snapshot.
        Ok(None) => {
            debug!(strategy = %strategy, "element detached during probe");
            Probe::miss(StrategyOutcome::NoMatch)
        }
        Err(error) => Probe::miss(StrategyOutcome::ProviderError { error }),
    }
}
