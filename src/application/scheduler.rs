use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Timelike, Utc};
use tracing::{error, info, warn};

use crate::config::scheduler_config::SchedulerEnvConfig;
use crate::domain::repositories::TaskRepository;
use crate::domain::task::SystemTask;

use crate::application::task_executor::TaskExecutor;

/// Polls `TaskRepository::list_active` on a fixed interval and runs every task whose 5-field
/// cron `schedule` matches the current minute, at most once per matching minute.
pub struct Scheduler {
    tasks: Arc<dyn TaskRepository>,
    executor: Arc<TaskExecutor>,
    poll_interval: std::time::Duration,
}

impl Scheduler {
    pub fn new(tasks: Arc<dyn TaskRepository>, executor: Arc<TaskExecutor>, config: &SchedulerEnvConfig) -> Self {
        Self {
            tasks,
            executor,
            poll_interval: std::time::Duration::from_secs(config.poll_interval_secs),
        }
    }

    pub async fn run(self) {
        info!(poll_interval_secs = self.poll_interval.as_secs(), "scheduler starting");
        let mut last_fired: HashMap<String, DateTime<Utc>> = HashMap::new();

        loop {
            tokio::time::sleep(self.poll_interval).await;
            let now = Utc::now();
            let minute = now.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(now);

            let due = match self.tasks.list_active().await {
                Ok(tasks) => tasks,
                Err(err) => {
                    warn!(error = %err, "failed to list active tasks; skipping this poll");
                    continue;
                }
            };

            for task in due {
                if last_fired.get(&task.task_id) == Some(&minute) {
                    continue;
                }
                if !cron_matches(&task.schedule, now) {
                    continue;
                }
                last_fired.insert(task.task_id.clone(), minute);

                let executor = self.executor.clone();
                let task_id = task.task_id.clone();
                tokio::spawn(async move {
                    if let Err(err) = executor.execute_task(&task_id, now).await {
                        error!(task_id, error = %err, "task run failed");
                    }
                });
            }

            last_fired.retain(|_, fired_at| minute.signed_duration_since(*fired_at).num_hours() < 24);
        }
    }
}

/// Minimal 5-field cron matcher (`minute hour day-of-month month day-of-week`, Asia/Shanghai
/// wall clock). Each field is `*` or a comma-separated list of exact integers; no step (`*/N`)
/// or range (`N-M`) syntax. `SystemTask::schedule` strings in this deployment are simple enough
/// not to need those.
fn cron_matches(expr: &str, now: DateTime<Utc>) -> bool {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        warn!(expr, "cron expression does not have 5 fields; task will never fire");
        return false;
    }

    let local = now.with_timezone(&chrono_tz::Asia::Shanghai);
    field_matches(fields[0], local.minute())
        && field_matches(fields[1], local.hour())
        && field_matches(fields[2], local.day())
        && field_matches(fields[3], local.month())
        && field_matches(fields[4], local.weekday().num_days_from_sunday())
}

fn field_matches(field: &str, value: u32) -> bool {
    if field == "*" {
        return true;
    }
    field.split(',').any(|part| part.trim().parse::<u32>() == Ok(value))
}
