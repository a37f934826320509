//! Staff lifecycle over the REST gateway
//!
//! Suites that book against a fresh staff member create one, give it a
//! working week and archive it during teardown. The archive call is meant to
//! be registered as a [`BestEffortCleanup`](crate::BestEffortCleanup) step.

use crate::config::Environment;
use crate::rest::{RestRequest, RestTransport};
use crate::result::{SalonError, SalonResult};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// `Content-Type` of a staff resource
pub const STAFF_MEDIA_TYPE: &str = "application/vnd.memento.Staff+json";
/// `Content-Type` of a work activity
pub const WORK_ACTIVITY_MEDIA_TYPE: &str = "application/vnd.memento.WorkActivity+json";
/// `Accept` of a work activity call; warnings come back as messages
pub const WORK_ACTIVITY_ACCEPT: &str =
    "application/vnd.memento.WorkActivity+json, application/vnd.memento.Message+json";
/// `Content-Type` of an archive request
pub const ARCHIVE_MEDIA_TYPE: &str = "application/vnd.memento.ArchiveRequest+json";

/// Warning code the gateway attaches to a 412 when the staff member still
/// has future appointments; the archive has gone through anyway
pub const FUTURE_APPOINTMENTS_WARNING: &str = "STAFF_FUTURE_APPOINTMENTS";

const WEEK_DAYS: [&str; 7] = ["MO", "TU", "WE", "TH", "FR", "SA", "SU"];

// =============================================================================
// TYPES
// =============================================================================

/// Names and email of a staff member to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStaff {
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Login email
    pub email: String,
}

impl NewStaff {
    /// `first last` with an email derived from both names
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        let first_name = first_name.into();
        let last_name = last_name.into();
        let email = format!(
            "{}.{}@phorest.com",
            first_name.to_lowercase(),
            last_name.to_lowercase()
        );
        Self {
            first_name,
            last_name,
            email,
        }
    }

    /// `Test<hex6> User<hex6>`, unique per call
    #[must_use]
    pub fn random() -> Self {
        Self::new(format!("Test{}", short_id()), format!("User{}", short_id()))
    }

    /// `first last`
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    fn payload(&self) -> Value {
        json!({
            "@type": "Staff",
            "archived": false,
            "details": {
                "user": {
                    "@type": "User",
                    "firstName": self.first_name,
                    "lastName": self.last_name,
                    "email": self.email,
                    "archived": false,
                },
                "hideFromOnlineBookings": false,
            }
        })
    }
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..6].to_string()
}

/// A staff member as the gateway created it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffMember {
    /// `first last`, as shown on the calendar
    pub full_name: String,
    /// User id; work schedules hang off it
    pub user_id: String,
    /// Staff id; archive requests use it
    pub staff_id: String,
}

/// How an archive request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// Archived with no warning
    Archived,
    /// Archived, but the gateway warned about future appointments
    ArchivedWithFutureAppointments,
}

// =============================================================================
// PARSING
// =============================================================================

/// Last `:`-separated segment of a URN such as `urn:x-memento:User:abc`
fn urn_suffix(urn: &str) -> Option<&str> {
    urn.rsplit(':').next().filter(|s| !s.is_empty())
}

/// Segment after `/<kind>/` in the `rel=self` link of `links`
fn self_link_id<'v>(links: &'v Value, kind: &str) -> Option<&'v str> {
    let marker = format!("/{kind}/");
    links
        .as_array()?
        .iter()
        .filter(|link| link["rel"] == "self")
        .filter_map(|link| link["href"].as_str())
        .find_map(|href| {
            let start = href.find(&marker)? + marker.len();
            href[start..].split('/').next().filter(|s| !s.is_empty())
        })
}

/// Pull the user and staff ids out of a create-staff response.
///
/// The user id is the suffix of `details.user.identity.id`, falling back to
/// the user's own `rel=self` link; the staff id comes from the top-level
/// `rel=self` link.
///
/// # Errors
///
/// [`SalonError::MissingField`] naming whichever id could not be found.
pub fn parse_created_staff(body: &Value, full_name: impl Into<String>) -> SalonResult<StaffMember> {
    let user = &body["details"]["user"];
    let user_id = user["identity"]["id"]
        .as_str()
        .and_then(urn_suffix)
        .or_else(|| self_link_id(&user["links"], "user"))
        .ok_or_else(|| SalonError::missing_field("createStaff", "details.user.identity.id"))?;
    let staff_id = self_link_id(&body["links"], "staff")
        .ok_or_else(|| SalonError::missing_field("createStaff", "links[rel=self]"))?;

    Ok(StaffMember {
        full_name: full_name.into(),
        user_id: user_id.to_string(),
        staff_id: staff_id.to_string(),
    })
}

/// Monday of the ISO week containing `day`
#[must_use]
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(i64::from(day.weekday().num_days_from_monday()))
}

/// Weekly all-day working schedule starting on `monday`
#[must_use]
pub fn work_schedule_payload(branch_id: &str, monday: NaiveDate) -> Value {
    let days: Vec<Value> = WEEK_DAYS
        .iter()
        .map(|day| json!({"value": day, "offset": 0}))
        .collect();
    json!({
        "@type": "WorkActivity",
        "activityDate": monday.format("%Y-%m-%d").to_string(),
        "startTime": "00:00:00.000",
        "endTime": "23:30:00.000",
        "overridesAllOlder": false,
        "recurrence": {
            "recurrenceRule": {
                "frequency": "WEEKLY",
                "interval": 1,
                "weekDayList": days,
            }
        },
        "type": "WORKING",
        "branchRef": format!("urn:x-memento:Branch:{branch_id}"),
        "workActivityRanges": [],
    })
}

fn archive_payload(staff_id: &str) -> Value {
    json!({
        "includesRefs": [format!("urn:x-memento:Staff:{staff_id}")],
        "@type": "ArchiveRequest",
        "defaultArchivePolicy": "ARCHIVE_NONE",
        "unarchive": false,
    })
}

// =============================================================================
// API
// =============================================================================

/// Staff operations against one environment
#[derive(Debug)]
pub struct StaffApi<'a, T: RestTransport + ?Sized> {
    gateway: &'a T,
    env: &'a Environment,
}

impl<'a, T: RestTransport + ?Sized> StaffApi<'a, T> {
    /// Staff API over `gateway`, addressed from `env`
    pub const fn new(gateway: &'a T, env: &'a Environment) -> Self {
        Self { gateway, env }
    }

    fn branch_path(&self, rest: &str) -> String {
        self.env.rest_url(&format!(
            "/memento/rest/business/{}/branch/{}{rest}",
            self.env.business_id, self.env.branch_id
        ))
    }

    /// Create a staff member with random names
    pub async fn create_staff_user(&self) -> SalonResult<StaffMember> {
        self.create_staff(&NewStaff::random()).await
    }

    /// Create `staff`
    pub async fn create_staff(&self, staff: &NewStaff) -> SalonResult<StaffMember> {
        let request = RestRequest::post(
            "createStaff",
            self.branch_path("/staff"),
            STAFF_MEDIA_TYPE,
            staff.payload(),
        );
        let body = self
            .gateway
            .send(&request)
            .await?
            .into_success(&request.operation)?;
        let member = parse_created_staff(&body, staff.full_name())?;
        info!(
            name = %member.full_name,
            email = %staff.email,
            user = %member.user_id,
            staff = %member.staff_id,
            "staff created"
        );
        Ok(member)
    }

    /// Give `user_id` a working week starting this Monday (UTC)
    pub async fn set_work_schedule(&self, user_id: &str) -> SalonResult<()> {
        self.set_work_schedule_from(user_id, week_start(Utc::now().date_naive()))
            .await
    }

    /// Give `user_id` a working week starting on `monday`
    pub async fn set_work_schedule_from(&self, user_id: &str, monday: NaiveDate) -> SalonResult<()> {
        let url = self.env.rest_url(&format!(
            "/memento/rest/business/{}/user/{user_id}/workActivity",
            self.env.business_id
        ));
        let request = RestRequest::post(
            "setWorkSchedule",
            url,
            WORK_ACTIVITY_MEDIA_TYPE,
            work_schedule_payload(&self.env.branch_id, monday),
        )
        .with_accept(WORK_ACTIVITY_ACCEPT);
        self.gateway
            .send(&request)
            .await?
            .into_success(&request.operation)?;
        debug!(user = user_id, %monday, "work schedule set");
        Ok(())
    }

    /// Archive `staff_id`; a future-appointments warning still counts
    pub async fn archive_staff(&self, staff_id: &str) -> SalonResult<ArchiveOutcome> {
        let request = RestRequest::post(
            "archiveStaff",
            self.branch_path("/staff/archive?ignore_warnings=true"),
            ARCHIVE_MEDIA_TYPE,
            archive_payload(staff_id),
        );
        let response = self.gateway.send(&request).await?;
        if response.status == 412 && response.body.to_string().contains(FUTURE_APPOINTMENTS_WARNING) {
            warn!(staff = staff_id, "staff archived with future appointments");
            return Ok(ArchiveOutcome::ArchivedWithFutureAppointments);
        }
        response.into_success(&request.operation)?;
        info!(staff = staff_id, "staff archived");
        Ok(ArchiveOutcome::Archived)
    }
}
