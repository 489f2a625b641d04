//! Realization polling.
//!
//! NSX accepts a desired-state patch immediately and realizes it in the
//! background. [`RealizeStateService::check_realize_state`] polls the
//! realized-entities API for one intent path until the entities settle,
//! turning that asynchronous pipeline into a single verdict.
//!
//! # Classification
//!
//! Each response is filtered by the expected entities (all entities when
//! none are given) and classified by [`classify`]:
//!
//! | filtered entities                                | verdict    |
//! |--------------------------------------------------|------------|
//! | an ERROR entity without the provider-not-ready code | `Failed`  |
//! | ERROR only with provider-not-ready               | `Pending`  |
//! | any entity not yet REALIZED                      | `Pending`  |
//! | all REALIZED, or no entities at all              | `Realized` |

use std::sync::Arc;

use nsx_types::{ExpectedEntity, RealizedResource, RealizedResourceList};
use tracing::{debug, instrument, warn};

use crate::backoff::Backoff;
use crate::client::RealizedEntitiesClient;
use crate::error::RealizeError;

/// Verdict for a single realized-entities response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Every relevant entity is realized.
    Realized,
    /// Not settled yet; the reason is for logging.
    Pending(String),
    /// NSX reported a real failure, with the alarm messages.
    Failed(Vec<String>),
}

fn is_relevant(resource: &RealizedResource, expected: &[ExpectedEntity]) -> bool {
    expected.is_empty() || expected.iter().any(|e| e.matches(resource))
}

fn describe(resource: &RealizedResource) -> String {
    format!(
        "{} {}",
        resource.entity_type.as_deref().unwrap_or("<unknown>"),
        resource.state
    )
}

/// Classifies one realized-entities response.
pub fn classify(response: &RealizedResourceList, expected: &[ExpectedEntity]) -> Verdict {
    let relevant: Vec<&RealizedResource> = response
        .results
        .iter()
        .filter(|r| is_relevant(r, expected))
        .collect();

    let mut failed = false;
    let mut failures = Vec::new();
    let mut provider_pending = None;
    for resource in relevant.iter().filter(|r| r.state.is_error()) {
        if resource.alarms.iter().any(|a| a.is_provider_not_ready()) {
            provider_pending.get_or_insert_with(|| describe(resource));
        } else {
            failed = true;
            if resource.alarms.is_empty() {
                warn!(entity = %describe(resource), "realized with errors but no alarms");
            }
            failures.extend(resource.alarm_messages().map(str::to_string));
        }
    }
    if failed {
        return Verdict::Failed(failures);
    }
    if let Some(reason) = provider_pending {
        return Verdict::Pending(format!("{reason}: provider not ready"));
    }

    match relevant.iter().find(|r| !r.state.is_realized()) {
        Some(resource) => Verdict::Pending(describe(resource)),
        None => Verdict::Realized,
    }
}

/// Polls the realized-entities API until an intent settles.
#[derive(Clone)]
pub struct RealizeStateService {
    client: Arc<dyn RealizedEntitiesClient>,
}

impl std::fmt::Debug for RealizeStateService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealizeStateService").finish_non_exhaustive()
    }
}

impl RealizeStateService {
    pub fn new(client: Arc<dyn RealizedEntitiesClient>) -> Self {
        Self { client }
    }

    /// Polls `path` until it is realized, fails, or `backoff.steps` attempts
    /// have been made.
    ///
    /// Sleeps only between attempts. A failing status query counts as a
    /// pending attempt. Callers must not hold locks across this call.
    #[instrument(skip(self, backoff, expected), fields(steps = backoff.steps))]
    pub async fn check_realize_state(
        &self,
        backoff: &Backoff,
        path: &str,
        expected: &[ExpectedEntity],
    ) -> Result<(), RealizeError> {
        let mut backoff = *backoff;
        let steps = backoff.steps.max(1);
        debug!(max_wait = ?backoff.max_total_delay(), "polling realization state");

        let mut last_error = None;
        for attempt in 1..=steps {
            match self.client.list(path).await {
                Ok(response) => match classify(&response, expected) {
                    Verdict::Realized => {
                        debug!(attempt, "realized");
                        return Ok(());
                    }
                    Verdict::Failed(messages) => {
                        warn!(attempt, ?messages, "realized with errors");
                        return Err(RealizeError::state(path, messages));
                    }
                    Verdict::Pending(reason) => {
                        debug!(attempt, reason = %reason, "not realized yet");
                    }
                },
                Err(e) => {
                    warn!(attempt, error = %e, "failed to query realization state");
                    last_error = Some(e);
                }
            }

            if attempt < steps {
                tokio::time::sleep(backoff.next_delay()).await;
            }
        }

        match last_error {
            Some(e) => warn!(steps, last_error = %e, "realization retry exhausted"),
            None => warn!(steps, "realization retry exhausted"),
        }
        Err(RealizeError::RetryExhausted)
    }
}
