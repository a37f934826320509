//! Staff calendar appointments
//!
//! Finds the first appointment on a staff member's calendar for a day and
//! deletes appointments by id.

use crate::graphql::{fetch_data, GraphqlRequest, GraphqlTransport};
use crate::result::{SalonError, SalonResult};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

const CALENDAR_STAFF_QUERY: &str = "query CalendarStaff($startDate: LocalDate!, $endDate: LocalDate!, $mode: StaffCalendarMode!) {
  staffCalendar(startDate: $startDate, endDate: $endDate, options: {mode: $mode}) {
    name
    calendarDays { events { __typename ... on Appointment { id } } }
  }
}";

const DELETE_APPOINTMENTS_MUTATION: &str = "mutation DeleteAppointments($ids: [ID!]!, $deleteAllRecurringAppointments: Boolean) {
  deleteAppointments(
    input: {appointmentIds: $ids, deleteAllRecurringAppointments: $deleteAllRecurringAppointments}
  ) { appointments { id __typename } __typename }
}";

/// Calendar event; only appointments carry an id we act on
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "__typename")]
pub enum CalendarEvent {
    /// A client appointment
    Appointment {
        /// Appointment id
        id: String,
    },
    /// Breaks, blocked time and other event kinds
    #[serde(other)]
    Other,
}

/// One calendar day
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    /// Events in display order
    #[serde(default)]
    pub events: Vec<CalendarEvent>,
}

/// One staff member's calendar
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffCalendar {
    /// Staff display name
    pub name: String,
    /// Days in range
    #[serde(default)]
    pub calendar_days: Vec<CalendarDay>,
}

impl StaffCalendar {
    /// Id of the first appointment across all days
    #[must_use]
    pub fn first_appointment(&self) -> Option<&str> {
        self.calendar_days
            .iter()
            .flat_map(|day| &day.events)
            .find_map(|event| match event {
                CalendarEvent::Appointment { id } => Some(id.as_str()),
                CalendarEvent::Other => None,
            })
    }
}

#[derive(Debug, Deserialize)]
struct DeletedAppointments {
    #[serde(default)]
    appointments: Vec<DeletedAppointment>,
}

#[derive(Debug, Deserialize)]
struct DeletedAppointment {
    id: String,
}

/// Calendars of all staff for `date`
pub async fn staff_calendars<R>(transport: &R, date: NaiveDate) -> SalonResult<Vec<StaffCalendar>>
where
    R: GraphqlTransport + ?Sized,
{
    let day = date.format("%Y-%m-%d").to_string();
    let request = GraphqlRequest::new(
        "CalendarStaff",
        CALENDAR_STAFF_QUERY,
        json!({ "mode": "ALL_STAFF", "startDate": day, "endDate": day }),
    );
    fetch_data(transport, &request, "staffCalendar").await
}

/// Id of the first appointment on `staff_name`'s calendar for `date`.
///
/// # Errors
///
/// - [`SalonError::NotFound`] when the staff member is absent or has no
///   appointment that day
/// - transport and decoding errors, unchanged
pub async fn find_appointment_for_staff<R>(
    transport: &R,
    staff_name: &str,
    date: NaiveDate,
) -> SalonResult<String>
where
    R: GraphqlTransport + ?Sized,
{
    let calendars = staff_calendars(transport, date).await?;
    debug!(staff = calendars.len(), %date, "staff calendars fetched");

    calendars
        .iter()
        .filter(|calendar| calendar.name == staff_name)
        .find_map(StaffCalendar::first_appointment)
        .map(str::to_string)
        .ok_or_else(|| SalonError::NotFound {
            search: format!("appointment for staff '{staff_name}' on {date}"),
            pages_scanned: 1,
        })
}

/// Delete appointment `id` (not its recurrences); returns the deleted ids
pub async fn delete_appointment<R>(transport: &R, id: &str) -> SalonResult<Vec<String>>
where
    R: GraphqlTransport + ?Sized,
{
    let request = GraphqlRequest::new(
        "DeleteAppointments",
        DELETE_APPOINTMENTS_MUTATION,
        json!({ "ids": [id], "deleteAllRecurringAppointments": false }),
    );
    let deleted: DeletedAppointments = fetch_data(transport, &request, "deleteAppointments").await?;
    let ids: Vec<String> = deleted.appointments.into_iter().map(|a| a.id).collect();
    info!(appointment = id, deleted = ids.len(), "appointment deleted");
    Ok(ids)
}
