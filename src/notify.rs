use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::model::Assignment;

/// Delivery boundary for assignment events. Implementations are
/// fire-and-forget from the sync cycle's perspective: a failing notifier
/// never fails the sync.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_new(&self, assignments: &[Assignment]) -> anyhow::Result<()>;
    async fn notify_urgent(&self, assignments: &[Assignment]) -> anyhow::Result<()>;
    async fn notify_submitted(&self, assignments: &[Assignment]) -> anyhow::Result<()>;
}

/// Notifier that writes events to the log. Stands in for any real delivery
/// channel; the daemon's operator tails the log or wires up their own impl.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_new(&self, assignments: &[Assignment]) -> anyhow::Result<()> {
        for a in assignments {
            info!(course = %a.course_name, title = %a.title, "new assignment");
        }
        Ok(())
    }

    async fn notify_urgent(&self, assignments: &[Assignment]) -> anyhow::Result<()> {
        let now = Utc::now().timestamp();
        for a in assignments {
            // Round up so "due in 30 seconds" still reads as one minute.
            let minutes_left = a
                .due_time_seconds
                .map(|due| ((due - now + 59) / 60).max(1))
                .unwrap_or(1);
            info!(
                course = %a.course_name,
                title = %a.title,
                minutes_left,
                "assignment due soon"
            );
        }
        Ok(())
    }

    async fn notify_submitted(&self, assignments: &[Assignment]) -> anyhow::Result<()> {
        for a in assignments {
            info!(course = %a.course_name, title = %a.title, "assignment submitted");
        }
        Ok(())
    }
}
