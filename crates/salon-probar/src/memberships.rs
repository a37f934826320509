//! Client memberships
//!
//! Lookup-and-mutate over the `clientMemberships` connection: find a
//! client's membership by name with [`paginated_search`], then issue one
//! status mutation keyed by its id.

use crate::graphql::{fetch_data, GraphqlRequest, GraphqlTransport};
use crate::pagination::{paginated_search, Connection, Cursor, Page, PageFetcher, SearchOutcome};
use crate::result::SalonResult;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use tracing::info;

/// Memberships requested per page
pub const PAGE_SIZE: u32 = 50;

/// Instance id used by the membership scripts
pub const INSTANCE_ID: &str = "freeze-client-membership-script";

const CLIENT_MEMBERSHIPS_QUERY: &str = "query ClientMemberships($after: String) {
  clientMemberships(first: 50, after: $after) {
    edges { node { id status client { id name email } } }
    pageInfo { hasNextPage endCursor }
  }
}";

const UPDATE_CLIENT_MEMBERSHIP_MUTATION: &str = "mutation UpdateClientMembership($clientMembershipId: ID!, $input: UpdateClientMembershipInput!) {
  updateClientMembership(clientMembershipId: $clientMembershipId, input: $input) {
    clientMembership { id status }
  }
}";

const CANCEL_MEMBERSHIP_MUTATION: &str = "mutation CancelMembership($id: ID!, $cancel: Boolean!) {
  cancelMembership(id: $id, cancel: $cancel)
}";

// =============================================================================
// TYPES
// =============================================================================

/// Membership lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipStatus {
    /// Billing normally
    Active,
    /// Paused
    Frozen,
    /// Ended
    Cancelled,
    /// Any status this crate does not act on
    #[serde(other)]
    Unknown,
}

impl fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Active => "ACTIVE",
            Self::Frozen => "FROZEN",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Client owning a membership
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MembershipClient {
    /// Client id
    pub id: String,
    /// Display name
    pub name: String,
    /// E-mail, when on file
    #[serde(default)]
    pub email: Option<String>,
}

/// One `clientMemberships` node
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientMembership {
    /// Membership id
    pub id: String,
    /// Current status
    pub status: MembershipStatus,
    /// Owning client
    pub client: MembershipClient,
}

/// `{ id status }` returned by the update mutation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MembershipState {
    /// Membership id
    pub id: String,
    /// Status after the mutation
    pub status: MembershipStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePayload {
    client_membership: MembershipState,
}

/// What a status transition did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The mutation was sent
    Applied {
        /// Membership id
        id: String,
        /// Status reported afterwards
        status: MembershipStatus,
    },
    /// The membership already had the target status; nothing was sent
    Unchanged {
        /// Membership id
        id: String,
        /// Current status
        status: MembershipStatus,
    },
}

impl Transition {
    /// Membership id
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Applied { id, .. } | Self::Unchanged { id, .. } => id,
        }
    }

    /// Check if a mutation was sent
    #[must_use]
    pub const fn was_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

// =============================================================================
// PAGE FETCHER
// =============================================================================

/// Pages of the `clientMemberships` connection
struct MembershipPages<'a, R: ?Sized> {
    transport: &'a R,
}

#[async_trait]
impl<R> PageFetcher<ClientMembership> for MembershipPages<'_, R>
where
    R: GraphqlTransport + ?Sized,
{
    async fn fetch_page(&mut self, cursor: Option<&Cursor>) -> SalonResult<Page<ClientMembership>> {
        let request = GraphqlRequest::new(
            "ClientMemberships",
            CLIENT_MEMBERSHIPS_QUERY,
            json!({ "after": cursor.map(Cursor::as_str) }),
        );
        let connection: Connection<ClientMembership> =
            fetch_data(self.transport, &request, "clientMemberships").await?;
        Ok(connection.into_page())
    }
}

// =============================================================================
// API
// =============================================================================

/// Membership operations over a GraphQL transport
#[derive(Debug)]
pub struct Memberships<'a, R: ?Sized> {
    transport: &'a R,
}

impl<'a, R> Memberships<'a, R>
where
    R: GraphqlTransport + ?Sized,
{
    /// Create over `transport`
    pub const fn new(transport: &'a R) -> Self {
        Self { transport }
    }

    /// First membership whose client name equals `client_name`, searching
    /// from the first page.
    pub async fn find_by_client_name(
        &self,
        client_name: &str,
    ) -> SalonResult<SearchOutcome<ClientMembership>> {
        let mut pages = MembershipPages {
            transport: self.transport,
        };
        let label = format!("membership for client '{client_name}'");
        paginated_search(&label, &mut pages, |m: &ClientMembership| {
            m.client.name == client_name
        })
        .await
    }

    /// Set `status` on membership `id` with `billing_date` as chosen date.
    pub async fn set_status(
        &self,
        id: &str,
        status: MembershipStatus,
        billing_date: NaiveDate,
    ) -> SalonResult<MembershipState> {
        let request = GraphqlRequest::new(
            "UpdateClientMembership",
            UPDATE_CLIENT_MEMBERSHIP_MUTATION,
            json!({
                "clientMembershipId": id,
                "input": {
                    "chosenBillingDate": billing_date.format("%Y-%m-%d").to_string(),
                    "status": status,
                    "frozenReason": null,
                    "notes": null,
                },
            }),
        );
        let payload: UpdatePayload =
            fetch_data(self.transport, &request, "updateClientMembership").await?;
        info!(membership = id, status = %payload.client_membership.status, "membership updated");
        Ok(payload.client_membership)
    }

    /// Cancel membership `id`; returns the raw `cancelMembership` value
    pub async fn cancel(&self, id: &str) -> SalonResult<Value> {
        let request = GraphqlRequest::new(
            "CancelMembership",
            CANCEL_MEMBERSHIP_MUTATION,
            json!({ "id": id, "cancel": true }),
        );
        let result: Value = fetch_data(self.transport, &request, "cancelMembership").await?;
        info!(membership = id, "membership cancelled");
        Ok(result)
    }

    /// Freeze the membership of `client_name`
    pub async fn freeze_by_client(&self, client_name: &str) -> SalonResult<Transition> {
        self.transition_by_client(client_name, MembershipStatus::Frozen)
            .await
    }

    /// Reactivate the membership of `client_name`
    pub async fn unfreeze_by_client(&self, client_name: &str) -> SalonResult<Transition> {
        self.transition_by_client(client_name, MembershipStatus::Active)
            .await
    }

    /// Cancel the membership of `client_name`
    pub async fn cancel_by_client(&self, client_name: &str) -> SalonResult<Transition> {
        let membership = self.require(client_name).await?;
        if membership.status == MembershipStatus::Cancelled {
            return Ok(Transition::Unchanged {
                id: membership.id,
                status: membership.status,
            });
        }
        self.cancel(&membership.id).await?;
        Ok(Transition::Applied {
            id: membership.id,
            status: MembershipStatus::Cancelled,
        })
    }

    async fn transition_by_client(
        &self,
        client_name: &str,
        target: MembershipStatus,
    ) -> SalonResult<Transition> {
        let membership = self.require(client_name).await?;
        if membership.status == target {
            info!(membership = %membership.id, status = %target, "already in target status");
            return Ok(Transition::Unchanged {
                id: membership.id,
                status: membership.status,
            });
        }
        let today = Utc::now().date_naive();
        let state = self.set_status(&membership.id, target, today).await?;
        Ok(Transition::Applied {
            id: state.id,
            status: state.status,
        })
    }

    async fn require(&self, client_name: &str) -> SalonResult<ClientMembership> {
        self.find_by_client_name(client_name)
            .await?
            .found_or_err(format!("membership for client '{client_name}'"))
    }
}
