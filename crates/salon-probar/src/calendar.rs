//! Calendar and booking widget scans
//!
//! Two ordered scans over the UI: the staff calendar is walked one day at a
//! time looking for a client's booking, and the online booking widget's
//! availability cells are walked in display order looking for the first
//! selectable slot.

use crate::config::Environment;
use crate::driver::{xpath_literal, PageDriver, Selector};
use crate::result::SalonResult;
use crate::scan::{ordered_scan, Scanner};
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

/// Days searched by [`AppointmentCalendar::open_booking_by_phone`]
pub const DEFAULT_MAX_DAYS_AHEAD: u32 = 5;

/// How long one calendar day is given to show the booking
pub const DAY_CHECK_TIMEOUT: Duration = Duration::from_millis(3_000);

/// How long one availability cell is given to become visible
pub const SLOT_CHECK_TIMEOUT: Duration = Duration::from_millis(2_000);

// =============================================================================
// APPOINTMENT CALENDAR
// =============================================================================

/// Calendar entry showing `phone`
#[must_use]
pub fn booking_entry(phone: &str) -> Selector {
    Selector::xpath(format!(
        "//div[@role=\"button\" and .//span[contains(normalize-space(), {})]]",
        xpath_literal(phone)
    ))
}

/// Calendar "next day" button
#[must_use]
pub fn next_day_button() -> Selector {
    Selector::button("Next day Day")
}

struct DayScanner<'a, D: ?Sized> {
    driver: &'a mut D,
    entry: Selector,
    timeout: Duration,
}

#[async_trait]
impl<D> Scanner<u32> for DayScanner<'_, D>
where
    D: PageDriver + ?Sized,
{
    type Capture = ();

    async fn check(&mut self, _day: &u32) -> SalonResult<Option<()>> {
        let visible = self.driver.is_visible(&self.entry, self.timeout).await?;
        Ok(visible.then_some(()))
    }

    async fn advance(&mut self, _from: &u32) -> SalonResult<()> {
        self.driver.click(&next_day_button()).await
    }
}

/// Staff appointment calendar
#[derive(Debug)]
pub struct AppointmentCalendar<'d, D: ?Sized> {
    driver: &'d mut D,
    check_timeout: Duration,
}

impl<'d, D> AppointmentCalendar<'d, D>
where
    D: PageDriver + ?Sized,
{
    /// Calendar on the page held by `driver`, showing today
    pub fn new(driver: &'d mut D) -> Self {
        Self {
            driver,
            check_timeout: DAY_CHECK_TIMEOUT,
        }
    }

    /// Override the per-day wait
    #[must_use]
    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = timeout;
        self
    }

    /// Load the staff app of `env` and switch to the Appointments screen
    pub async fn open(&mut self, env: &Environment) -> SalonResult<()> {
        let home = format!("{}/", env.base_url.trim_end_matches('/'));
        self.driver.navigate(&home).await?;
        self.driver.click(&Selector::link("Appointments")).await
    }

    /// Open the booking for `phone` within [`DEFAULT_MAX_DAYS_AHEAD`] days
    pub async fn open_booking_by_phone(&mut self, phone: &str) -> SalonResult<u32> {
        self.open_booking_by_phone_within(phone, DEFAULT_MAX_DAYS_AHEAD)
            .await
    }

    /// Look for the booking showing `phone` on today and the following
    /// days, clicking "next day" after each miss, and open it.
    ///
    /// Returns the day offset it was found on.
    ///
    /// # Errors
    ///
    /// - [`SalonError::SlotNotFound`](crate::SalonError::SlotNotFound) after
    ///   `max_days_ahead` days without the booking
    /// - driver errors, unchanged
    pub async fn open_booking_by_phone_within(
        &mut self,
        phone: &str,
        max_days_ahead: u32,
    ) -> SalonResult<u32> {
        let entry = booking_entry(phone);
        let mut scanner = DayScanner {
            driver: &mut *self.driver,
            entry: entry.clone(),
            timeout: self.check_timeout,
        };
        let label = format!("booking for phone {phone} within {max_days_ahead} day(s)");
        let hit = ordered_scan(&label, 0..max_days_ahead, &mut scanner).await?;

        self.driver.click(&entry).await?;
        info!(phone, day_offset = hit.position, "booking opened");
        Ok(hit.position)
    }
}

// =============================================================================
// BOOKING WIDGET
// =============================================================================

/// Availability cell buttons, in display order
#[must_use]
pub fn availability_cells() -> Selector {
    Selector::test_id("availabilityCellButton")
}

/// Time label inside the `index`-th availability cell
#[must_use]
pub fn slot_time(index: usize) -> Selector {
    availability_cells()
        .nth(index)
        .within(Selector::test_id("branchTime"))
}

/// Slot picked by [`BookingWidget::select_first_available_slot`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedSlot {
    /// 0-based cell index
    pub index: usize,
    /// Displayed time, trimmed
    pub time: String,
}

struct SlotScanner<'a, D: ?Sized> {
    driver: &'a mut D,
    timeout: Duration,
}

#[async_trait]
impl<D> Scanner<usize> for SlotScanner<'_, D>
where
    D: PageDriver + ?Sized,
{
    type Capture = String;

    async fn check(&mut self, index: &usize) -> SalonResult<Option<String>> {
        let cell = availability_cells().nth(*index);
        if !self.driver.is_visible(&cell, self.timeout).await? {
            return Ok(None);
        }
        let time = self.driver.inner_text(&slot_time(*index)).await?;
        Ok(Some(time.trim().to_string()))
    }
}

/// Online booking widget
#[derive(Debug)]
pub struct BookingWidget<'d, D: ?Sized> {
    driver: &'d mut D,
    slot_timeout: Duration,
}

impl<'d, D> BookingWidget<'d, D>
where
    D: PageDriver + ?Sized,
{
    /// Widget on the page held by `driver`
    pub fn new(driver: &'d mut D) -> Self {
        Self {
            driver,
            slot_timeout: SLOT_CHECK_TIMEOUT,
        }
    }

    /// Override the per-cell wait
    #[must_use]
    pub fn with_slot_timeout(mut self, timeout: Duration) -> Self {
        self.slot_timeout = timeout;
        self
    }

    /// Click the first visible availability cell and return its time.
    ///
    /// # Errors
    ///
    /// - [`SalonError::SlotNotFound`](crate::SalonError::SlotNotFound) when
    ///   no cell is visible
    /// - driver errors, unchanged
    pub async fn select_first_available_slot(&mut self) -> SalonResult<SelectedSlot> {
        let cells = self.driver.count(&availability_cells()).await?;
        let mut scanner = SlotScanner {
            driver: &mut *self.driver,
            timeout: self.slot_timeout,
        };
        let hit = ordered_scan("available time slot", 0..cells, &mut scanner).await?;

        self.driver.click(&availability_cells().nth(hit.index)).await?;
        info!(slot = %hit.capture, index = hit.index, "slot selected");
        Ok(SelectedSlot {
            index: hit.index,
            time: hit.capture,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::driver::MockDriver;
    use crate::result::SalonError;

    const PHONE: &str = "0871234567";

    mod calendar_tests {
        use super::*;

        #[tokio::test]
        async fn test_booking_found_on_day_two() {
            let entry = booking_entry(PHONE);
            let mut driver = MockDriver::new();
            driver.script_visibility(&entry, [false, false, true]);

            let day = AppointmentCalendar::new(&mut driver)
                .open_booking_by_phone(PHONE)
                .await
                .unwrap();

            assert_eq!(day, 2);
            assert_eq!(driver.call_count("is_visible"), 3);
            assert_eq!(
                driver.call_count(&format!("click:{}", next_day_button())),
                2
            );
            assert_eq!(
                driver.history().last().unwrap(),
                &format!("click:{entry}")
            );
        }

        #[tokio::test]
        async fn test_open_loads_app_then_appointments() {
            let mut env = Environment::dev();
            env.base_url = "https://my-staging.example.com/".into();
            let mut driver = MockDriver::new();

            AppointmentCalendar::new(&mut driver).open(&env).await.unwrap();
            assert_eq!(
                driver.history(),
                [
                    "navigate:https://my-staging.example.com/".to_string(),
                    format!("click:{}", Selector::link("Appointments")),
                ]
            );
        }

        #[tokio::test]
        async fn test_open_stops_when_navigation_fails() {
            let mut driver = MockDriver::new();
            driver.fail_on("navigate");
            let err = AppointmentCalendar::new(&mut driver)
                .open(&Environment::dev())
                .await
                .unwrap_err();
            assert!(matches!(err, SalonError::Driver { ref action, .. } if action == "navigate"));
            assert!(!driver.was_called("click:"));
        }

        #[tokio::test]
        async fn test_booking_today_needs_no_navigation() {
            let entry = booking_entry(PHONE);
            let mut driver = MockDriver::new();
            driver.show(&entry);

            let day = AppointmentCalendar::new(&mut driver)
                .open_booking_by_phone(PHONE)
                .await
                .unwrap();
            assert_eq!(day, 0);
            assert!(!driver.was_called(&format!("click:{}", next_day_button())));
        }

        #[tokio::test]
        async fn test_booking_missing_after_max_days() {
            let mut driver = MockDriver::new();
            let err = AppointmentCalendar::new(&mut driver)
                .open_booking_by_phone(PHONE)
                .await
                .unwrap_err();

            match err {
                SalonError::SlotNotFound { scan, checks } => {
                    assert_eq!(checks, 5);
                    assert!(scan.contains(PHONE));
                }
                other => panic!("expected SlotNotFound, got {other:?}"),
            }
            // no "next day" after the final miss
            assert_eq!(
                driver.call_count(&format!("click:{}", next_day_button())),
                4
            );
        }

        #[tokio::test]
        async fn test_custom_day_budget() {
            let mut driver = MockDriver::new();
            let err = AppointmentCalendar::new(&mut driver)
                .open_booking_by_phone_within(PHONE, 2)
                .await
                .unwrap_err();
            assert!(matches!(err, SalonError::SlotNotFound { checks: 2, .. }));
        }
    }

    mod widget_tests {
        use super::*;

        #[tokio::test]
        async fn test_first_visible_slot_selected() {
            let mut driver = MockDriver::new();
            driver.set_count(&availability_cells(), 4);
            driver.show(&availability_cells().nth(2));
            driver.show(&availability_cells().nth(3));
            driver.set_text(&slot_time(2), " 10:30 ");

            let slot = BookingWidget::new(&mut driver)
                .select_first_available_slot()
                .await
                .unwrap();

            assert_eq!(
                slot,
                SelectedSlot {
                    index: 2,
                    time: "10:30".into()
                }
            );
            assert!(driver.was_called(&format!("click:{}", availability_cells().nth(2))));
            assert!(!driver.was_called(&format!("is_visible:{}", availability_cells().nth(3))));
        }

        #[tokio::test]
        async fn test_no_cells_is_slot_not_found() {
            let mut driver = MockDriver::new();
            let err = BookingWidget::new(&mut driver)
                .select_first_available_slot()
                .await
                .unwrap_err();
            assert!(matches!(err, SalonError::SlotNotFound { checks: 0, .. }));
        }

        #[tokio::test]
        async fn test_text_error_propagates() {
            let mut driver = MockDriver::new();
            driver.set_count(&availability_cells(), 1);
            driver.show(&availability_cells().nth(0));

            let err = BookingWidget::new(&mut driver)
                .select_first_available_slot()
                .await
                .unwrap_err();
            assert!(matches!(err, SalonError::Driver { ref action, .. } if action == "inner_text"));
        }
    }
}
