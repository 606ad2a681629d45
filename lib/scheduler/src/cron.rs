//! The minute-tick cron trigger.
//!
//! Ported from the originating system's `shouldRunNow`: given the previous
//! minute boundary and the current one, a flow fires if its next scheduled
//! occurrence after the previous boundary falls within the current minute.

use chrono::{DateTime, Duration, Utc};
use croner::Cron;
use flowforge_core::{NamespaceId, UserId, Value};
use flowforge_queue::{DurableQueue, FlowExecutionPayload, TriggerType};
use flowforge_store::Store;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

/// The fixed principal scheduled (non-manual) jobs are attributed to.
#[must_use]
pub fn system_user_id() -> UserId {
    UserId::nil()
}

/// Evaluates whether `cron_expr` should fire for the minute containing
/// `now`. A malformed expression is treated as "never fires".
#[must_use]
pub fn should_run_now(cron_expr: &str, now: DateTime<Utc>) -> bool {
    let Ok(cron) = Cron::from_str(cron_expr) else {
        return false;
    };

    let now_ts = now.timestamp();
    let current_minute_ts = now_ts - now_ts.rem_euclid(60);
    let Some(current_minute) = DateTime::<Utc>::from_timestamp(current_minute_ts, 0) else {
        return false;
    };
    let last_minute = current_minute - Duration::minutes(1);

    let Ok(next_run) = cron.find_next_occurrence(&last_minute, false) else {
        return false;
    };

    next_run >= current_minute && next_run < current_minute + Duration::minutes(1)
}

/// Evaluates every scheduled flow against the current minute and enqueues a
/// job for each that fires. A malformed cron expression on one flow is
/// logged and skipped; it never aborts the tick.
///
/// # Errors
///
/// Returns a store error if listing scheduled flows fails; per-flow
/// enqueue failures are logged and do not abort the remaining flows.
pub async fn tick(
    store: &dyn Store,
    queue: &dyn DurableQueue,
    now: DateTime<Utc>,
) -> Result<usize, flowforge_store::StoreError> {
    let scheduled = store.list_scheduled_flows().await?;
    let mut fired = 0;

    for (_flow_id, flow) in scheduled {
        let Some(cron_expr) = &flow.cron_schedule else {
            continue;
        };

        if !should_run_now(cron_expr, now) {
            continue;
        }

        let payload = FlowExecutionPayload {
            workflow: flow.clone(),
            input: BTreeMap::<String, Value>::new(),
            starting_action_idx: 0,
            exec_id: flowforge_core::ExecId::new(),
            namespace_id: NamespaceId::new(),
            trigger_type: TriggerType::Scheduled,
            user_id: system_user_id(),
        };

        match queue.put(payload).await {
            Ok(_) => {
                fired += 1;
                tracing::info!(flow = %flow.slug, "cron trigger enqueued scheduled run");
            }
            Err(e) => {
                tracing::warn!(flow = %flow.slug, error = %e, "failed to enqueue scheduled run");
            }
        }
    }

    Ok(fired)
}

/// Drives a recurring minute tick against `store`/`queue` until the process
/// is shut down. Intended to be run inside a `tokio::spawn`ed task.
pub async fn run_ticker(store: Arc<dyn Store>, queue: Arc<dyn DurableQueue>) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
    loop {
        interval.tick().await;
        if let Err(e) = tick(store.as_ref(), queue.as_ref(), Utc::now()).await {
            tracing::warn!(error = %e, "cron tick failed to list scheduled flows");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_when_next_occurrence_falls_in_current_minute() {
        let now = DateTime::<Utc>::from_timestamp(120, 0).unwrap(); // minute boundary
        assert!(should_run_now("* * * * *", now));
    }

    #[test]
    fn does_not_fire_for_mismatched_minute_field() {
        let now = DateTime::<Utc>::from_timestamp(120, 0).unwrap();
        assert!(!should_run_now("30 * * * *", now));
    }

    #[test]
    fn malformed_expression_never_fires() {
        let now = Utc::now();
        assert!(!should_run_now("not a cron", now));
    }

    #[test]
    fn system_user_id_is_stable() {
        assert_eq!(system_user_id(), system_user_id());
    }

    #[test]
    fn system_user_id_is_the_nil_sentinel() {
        assert!(system_user_id().is_nil());
    }
}
