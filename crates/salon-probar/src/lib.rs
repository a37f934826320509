//! salon-probar: verification core for salon e2e suites
//!
//! The flows of a salon-management e2e suite keep doing three things while
//! the backend catches up with them: look for a row in a cursor-paginated
//! GraphQL collection, re-check a UI state until it shows up, and walk an
//! ordered list of days or slots until one matches. This crate implements
//! each of those once and builds the membership, course, appointment,
//! billing and booking flows on top. Staff setup and teardown go through
//! the REST side of the same gateway.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        salon-probar                               │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  memberships  courses  appointments        billing   calendar     │
//! │       │          │          │                  │         │        │
//! │       ▼          ▼          ▼                  ▼         ▼        │
//! │  ┌───────────────────────────┐        ┌──────────┐ ┌──────────┐   │
//! │  │ pagination::paginated_    │        │ wait::   │ │ scan::   │   │
//! │  │ search                    │        │ poll     │ │ ordered_ │   │
//! │  └─────────────┬─────────────┘        └────┬─────┘ │ scan     │   │
//! │                ▼                           ▼       └────┬─────┘   │
//! │  graphql::GraphqlTransport          driver::PageDriver ◄┘         │
//! │  (HttpTransport / MockTransport)    (browser / MockDriver)        │
//! │                                                                   │
//! │  staff ──► rest::RestTransport (HttpTransport / MockRestTransport)│
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use salon_probar::prelude::*;
//!
//! let env = SuiteConfig::builtin().select(None)?;
//! let ctx = RunContext::new(env, token).with_instance_id(memberships::INSTANCE_ID);
//! let gateway = HttpTransport::new(ctx)?;
//!
//! let transition = Memberships::new(&gateway).freeze_by_client("Jane Doe").await?;
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

pub mod appointments;
pub mod auth;
#[allow(clippy::missing_errors_doc)]
pub mod billing;
pub mod calendar;
pub mod cleanup;
#[allow(clippy::missing_errors_doc)]
pub mod config;
mod context;
pub mod courses;
#[allow(clippy::missing_errors_doc)]
pub mod driver;
#[allow(clippy::missing_errors_doc)]
pub mod graphql;
#[allow(clippy::missing_errors_doc)]
pub mod memberships;
pub mod pagination;
pub mod rest;
mod result;
pub mod scan;
#[allow(clippy::missing_errors_doc)]
pub mod staff;
pub mod wait;

pub use cleanup::{BestEffortCleanup, CleanupReport};
pub use config::{Environment, SuiteConfig, Timeouts};
pub use context::{RunContext, APPLICATION_ID};
pub use driver::{MockDriver, PageDriver, Selector};
#[cfg(feature = "http")]
pub use graphql::HttpTransport;
pub use graphql::{GraphqlRequest, GraphqlTransport, MockTransport};
pub use pagination::{paginated_search, Cursor, Page, PageFetcher, SearchOutcome};
pub use rest::{MockRestTransport, RestRequest, RestResponse, RestTransport};
pub use result::{SalonError, SalonResult};
pub use scan::{ordered_scan, ScanHit, Scanner};
pub use wait::{poll, poll_until, PollOutcome, Pollable, RetryPolicy};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::appointments::{delete_appointment, find_appointment_for_staff};
    pub use super::billing::{BillingOutcome, BillingQueue};
    pub use super::calendar::{AppointmentCalendar, BookingWidget, SelectedSlot};
    pub use super::courses::{archive_course, find_course_id};
    pub use super::memberships::{
        ClientMembership, MembershipStatus, Memberships, Transition,
    };
    pub use super::staff::{ArchiveOutcome, NewStaff, StaffApi, StaffMember};
    pub use super::{
        ordered_scan, paginated_search, poll, poll_until, BestEffortCleanup, CleanupReport,
        Cursor, Environment, GraphqlRequest, GraphqlTransport, MockDriver, MockRestTransport,
        MockTransport, Page, PageDriver, PageFetcher, PollOutcome, Pollable, RestRequest,
        RestResponse, RestTransport, RetryPolicy, RunContext, SalonError, SalonResult, ScanHit,
        Scanner, SearchOutcome, Selector, SuiteConfig, Timeouts,
    };
    #[cfg(feature = "http")]
    pub use super::HttpTransport;
}
