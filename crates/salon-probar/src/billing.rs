//! Membership billing queues
//!
//! A membership whose payment failed sits in the "Billing failed" queue.
//! Billing it by hand means moving it to "Billing due" and marking it
//! manually billed. Both queues fill asynchronously, so each step polls the
//! queue with a reload between attempts.
//!
//! ```text
//! Billing failed ──poll 5 × 1s──► Move to Billing Due ──► Billing due ──poll 15 × 0.5s──► Manually Billed
//!       │ exhausted
//!       ▼
//!  AlreadyBilled
//! ```

use crate::driver::{xpath_literal, PageDriver, Selector};
use crate::result::{SalonError, SalonResult};
use crate::wait::{poll_until, PollOutcome, Pollable, RetryPolicy};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tracing::info;

/// Poll budget for the "Billing failed" queue
pub const FAILED_QUEUE_POLICY: RetryPolicy = RetryPolicy::fixed(5, 1_000);

/// Poll budget for the "Billing due" queue
pub const DUE_QUEUE_POLICY: RetryPolicy = RetryPolicy::fixed(15, 500);

/// How long a single row check waits for the checkbox
pub const ROW_CHECK_TIMEOUT: Duration = Duration::from_millis(1_000);

/// One of the two billing queues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Queue {
    /// Payments that failed
    Failed,
    /// Payments awaiting billing
    Due,
}

impl Queue {
    /// Queue tab link
    #[must_use]
    pub fn tab(self) -> Selector {
        match self {
            Self::Failed => Selector::link("Billing failed"),
            Self::Due => Selector::link("Billing due"),
        }
    }

    /// Buttons confirming the queue's action on the selected row
    fn confirm_buttons(self) -> [Selector; 2] {
        let action = match self {
            Self::Failed => "Move to Billing Due Tab",
            Self::Due => "Manually Billed",
        };
        [Selector::button(action), Selector::button("Yes")]
    }
}

impl fmt::Display for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed => f.write_str("Billing failed"),
            Self::Due => f.write_str("Billing due"),
        }
    }
}

/// Result of [`BillingQueue::bill`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingOutcome {
    /// Moved through both queues and marked manually billed
    Billed,
    /// Never showed up in "Billing failed"; taken as billed already
    AlreadyBilled,
}

/// Row checkbox of the membership named `membership_name`
#[must_use]
pub fn row_checkbox(membership_name: &str) -> Selector {
    Selector::xpath(format!(
        "//tr[td//div[contains(normalize-space(), {})]]//button[@role='checkbox']",
        xpath_literal(membership_name)
    ))
    .first()
}

/// One queue check: reload (after the first attempt), look for the row,
/// and act on it only when it is visible right now.
struct QueueAttempt<'a, D: ?Sized> {
    driver: &'a mut D,
    queue: Queue,
    row: Selector,
    membership: &'a str,
    check_timeout: Duration,
}

#[async_trait]
impl<D> Pollable for QueueAttempt<'_, D>
where
    D: PageDriver + ?Sized,
{
    type Output = ();

    async fn attempt(&mut self, attempt: u32) -> SalonResult<PollOutcome<()>> {
        if attempt > 1 {
            self.driver.reload().await?;
            self.driver.click(&self.queue.tab()).await?;
        }

        if !self.driver.is_visible(&self.row, self.check_timeout).await? {
            return Ok(PollOutcome::not_yet(format!(
                "'{}' not listed in {} (attempt {attempt})",
                self.membership, self.queue
            )));
        }

        self.driver.click(&self.row).await?;
        for button in self.queue.confirm_buttons() {
            self.driver.click(&button).await?;
        }
        info!(membership = self.membership, queue = %self.queue, "queue action confirmed");
        Ok(PollOutcome::Ready(()))
    }
}

/// Billing flow on the memberships manager screen
#[derive(Debug)]
pub struct BillingQueue<'d, D: ?Sized> {
    driver: &'d mut D,
    failed_policy: RetryPolicy,
    due_policy: RetryPolicy,
    check_timeout: Duration,
}

impl<'d, D> BillingQueue<'d, D>
where
    D: PageDriver + ?Sized,
{
    /// Create with the default queue budgets
    pub fn new(driver: &'d mut D) -> Self {
        Self {
            driver,
            failed_policy: FAILED_QUEUE_POLICY,
            due_policy: DUE_QUEUE_POLICY,
            check_timeout: ROW_CHECK_TIMEOUT,
        }
    }

    /// Override the queue budgets
    #[must_use]
    pub fn with_policies(mut self, failed: RetryPolicy, due: RetryPolicy) -> Self {
        self.failed_policy = failed;
        self.due_policy = due;
        self
    }

    /// Override the per-check row timeout
    #[must_use]
    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = timeout;
        self
    }

    /// Open Manager › Memberships › Billing
    async fn open_billing(&mut self) -> SalonResult<()> {
        for link in ["Manager", "memberships-icon Memberships", "Billing"] {
            self.driver.click(&Selector::link(link)).await?;
        }
        Ok(())
    }

    async fn work_queue(&mut self, queue: Queue, membership_name: &str) -> SalonResult<()> {
        self.driver.click(&queue.tab()).await?;
        let policy = match queue {
            Queue::Failed => self.failed_policy,
            Queue::Due => self.due_policy,
        };
        let mut attempt = QueueAttempt {
            driver: &mut *self.driver,
            queue,
            row: row_checkbox(membership_name),
            membership: membership_name,
            check_timeout: self.check_timeout,
        };
        let label = format!("'{membership_name}' in {queue}");
        poll_until(&label, policy, &mut attempt).await
    }

    /// Bill the membership named `membership_name` by hand.
    ///
    /// # Errors
    ///
    /// - [`SalonError::RetryExhausted`] when the membership left "Billing
    ///   failed" but never appeared in "Billing due"
    /// - driver errors, unchanged
    pub async fn bill(&mut self, membership_name: &str) -> SalonResult<BillingOutcome> {
        self.open_billing().await?;

        match self.work_queue(Queue::Failed, membership_name).await {
            Ok(()) => {}
            Err(SalonError::RetryExhausted { last_observed, .. }) => {
                info!(
                    membership = membership_name,
                    last_observed = %last_observed,
                    "not in Billing failed, assuming already billed"
                );
                return Ok(BillingOutcome::AlreadyBilled);
            }
            Err(e) => return Err(e),
        }

        self.work_queue(Queue::Due, membership_name).await?;
        info!(membership = membership_name, "membership manually billed");
        Ok(BillingOutcome::Billed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::driver::MockDriver;
    use tokio::time::Instant;

    const GOLD: &str = "Gold Membership";

    fn clicks(driver: &MockDriver) -> Vec<String> {
        driver
            .history()
            .iter()
            .filter(|c| c.starts_with("click:"))
            .cloned()
            .collect()
    }

    #[test]
    fn test_row_checkbox_quotes_name() {
        let sel = row_checkbox("O'Brien Plan");
        assert_eq!(
            sel.to_string(),
            "xpath=//tr[td//div[contains(normalize-space(), \"O'Brien Plan\")]]//button[@role='checkbox'] >> nth=0"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_bill_through_both_queues() {
        let row = row_checkbox(GOLD);
        let mut driver = MockDriver::new();
        // failed queue: found on attempt 2; due queue: found on attempt 3
        driver.script_visibility(&row, [false, true, false, false, true]);

        let start = Instant::now();
        let outcome = BillingQueue::new(&mut driver).bill(GOLD).await.unwrap();
        assert_eq!(outcome, BillingOutcome::Billed);
        assert_eq!(start.elapsed(), Duration::from_millis(1_000 + 2 * 500));

        let row_clicks = clicks(&driver)
            .iter()
            .filter(|c| **c == format!("click:{row}"))
            .count();
        assert_eq!(row_clicks, 2, "one row click per queue");
        assert_eq!(driver.call_count("reload"), 1 + 2);

        let expected_tail = [
            format!("click:{}", Selector::button("Manually Billed")),
            format!("click:{}", Selector::button("Yes")),
        ];
        assert!(clicks(&driver).ends_with(&expected_tail));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_from_failed_queue_is_already_billed() {
        let mut driver = MockDriver::new();
        let start = Instant::now();
        let outcome = BillingQueue::new(&mut driver).bill(GOLD).await.unwrap();

        assert_eq!(outcome, BillingOutcome::AlreadyBilled);
        assert_eq!(driver.call_count("is_visible"), 5);
        assert_eq!(start.elapsed(), Duration::from_millis(4_000));
        assert!(!driver.was_called(&format!("click:{}", Queue::Due.tab())));
        assert!(!driver.was_called(&format!("click:{}", Selector::button("Move to Billing Due Tab"))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_from_due_queue_is_error() {
        let row = row_checkbox(GOLD);
        let mut driver = MockDriver::new();
        driver.script_visibility(&row, [true, false]);

        let err = BillingQueue::new(&mut driver)
            .with_policies(RetryPolicy::fixed(2, 10), RetryPolicy::fixed(3, 10))
            .bill(GOLD)
            .await
            .unwrap_err();
        match err {
            SalonError::RetryExhausted {
                operation,
                attempts,
                last_observed,
            } => {
                assert_eq!(operation, "'Gold Membership' in Billing due");
                assert_eq!(attempts, 3);
                assert!(last_observed.contains("attempt 3"));
            }
            other => panic!("expected RetryExhausted, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_error_is_not_already_billed() {
        let mut driver = MockDriver::new();
        driver.fail_on("reload");
        let err = BillingQueue::new(&mut driver).bill(GOLD).await.unwrap_err();
        assert!(matches!(err, SalonError::Driver { ref action, .. } if action == "reload"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_yet_never_clicks_row() {
        let row = row_checkbox(GOLD);
        let mut driver = MockDriver::new();
        driver.script_visibility(&row, [false, false, false, true, true]);

        BillingQueue::new(&mut driver)
            .with_check_timeout(Duration::from_millis(50))
            .bill(GOLD)
            .await
            .unwrap();

        // every click on the row is preceded by a visibility check that said yes
        let history = driver.history();
        for (i, call) in history.iter().enumerate() {
            if *call == format!("click:{row}") {
                assert_eq!(history[i - 1], format!("is_visible:{row}"));
            }
        }
    }
}
