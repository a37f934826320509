//! Courses: lookup by name and bulk archive

use crate::graphql::{fetch_data, GraphqlRequest, GraphqlTransport};
use crate::pagination::{paginated_search, Connection, Cursor, Page, PageFetcher};
use crate::result::SalonResult;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

/// Courses requested per page
pub const PAGE_SIZE: u32 = 100;

const COURSES_QUERY: &str = "query Courses($first: Int, $after: String, $filterBy: CourseFilterBy) {
  courses(first: $first, after: $after, filterBy: $filterBy) {
    edges { node { id name } }
    pageInfo { hasNextPage endCursor }
  }
}";

const BULK_ARCHIVE_COURSES_MUTATION: &str = "mutation BulkArchiveCourses($bulkRequest: BulkRequestInput!, $filterBy: CourseFilterBy!, $archive: Boolean!) {
  bulkArchiveCourses(bulkRequest: $bulkRequest, filterBy: $filterBy, archive: $archive) {
    count __typename
  }
}";

/// One `courses` node
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Course {
    /// Course id
    pub id: String,
    /// Display name
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct ArchiveCount {
    count: u64,
}

struct CoursePages<'a, R: ?Sized> {
    transport: &'a R,
}

#[async_trait]
impl<R> PageFetcher<Course> for CoursePages<'_, R>
where
    R: GraphqlTransport + ?Sized,
{
    async fn fetch_page(&mut self, cursor: Option<&Cursor>) -> SalonResult<Page<Course>> {
        let request = GraphqlRequest::new(
            "Courses",
            COURSES_QUERY,
            json!({
                "first": PAGE_SIZE,
                "after": cursor.map(Cursor::as_str),
                "filterBy": {},
            }),
        );
        let connection: Connection<Course> = fetch_data(self.transport, &request, "courses").await?;
        Ok(connection.into_page())
    }
}

/// Id of the first course named exactly `name`.
///
/// # Errors
///
/// - [`SalonError::NotFound`](crate::SalonError::NotFound) when no course has that name
/// - transport and decoding errors, unchanged
pub async fn find_course_id<R>(transport: &R, name: &str) -> SalonResult<String>
where
    R: GraphqlTransport + ?Sized,
{
    let label = format!("course '{name}'");
    let mut pages = CoursePages { transport };
    let course = paginated_search(&label, &mut pages, |c: &Course| c.name == name)
        .await?
        .found_or_err(&label)?;
    info!(course = %course.id, name, "course found");
    Ok(course.id)
}

/// Archive course `id`; returns the number of archived courses
pub async fn archive_course<R>(transport: &R, id: &str) -> SalonResult<u64>
where
    R: GraphqlTransport + ?Sized,
{
    let request = GraphqlRequest::new(
        "BulkArchiveCourses",
        BULK_ARCHIVE_COURSES_MUTATION,
        json!({
            "bulkRequest": {
                "selectionMode": "SELECT_NONE",
                "selectedIds": [id],
                "unselectedIds": [],
            },
            "archive": true,
            "filterBy": {},
        }),
    );
    let archived: ArchiveCount = fetch_data(transport, &request, "bulkArchiveCourses").await?;
    info!(course = id, count = archived.count, "course archived");
    Ok(archived.count)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::graphql::MockTransport;
    use crate::result::SalonError;
    use serde_json::Value;

    fn courses_gateway() -> MockTransport {
        MockTransport::new(|req| {
            if req.operation_name == "BulkArchiveCourses" {
                return Ok(json!({"data": {"bulkArchiveCourses": {"count": 1, "__typename": "BulkResult"}}}));
            }
            let body = if req.variables["after"].is_null() {
                json!({"edges": [{"node": {"id": "c1", "name": "Balayage Basics"}}],
                       "pageInfo": {"hasNextPage": true, "endCursor": "MTAw"}})
            } else {
                json!({"edges": [{"node": {"id": "c2", "name": "Colour Theory"}}],
                       "pageInfo": {"hasNextPage": false}})
            };
            Ok(json!({"data": {"courses": body}}))
        })
    }

    #[tokio::test]
    async fn test_find_course_id_pages() {
        let transport = courses_gateway();
        let id = find_course_id(&transport, "Colour Theory").await.unwrap();
        assert_eq!(id, "c2");

        let requests = transport.requests();
        assert_eq!(requests[0].variables["first"], 100);
        assert_eq!(requests[0].variables["filterBy"], json!({}));
        assert_eq!(requests[1].variables["after"], "MTAw");
    }

    #[tokio::test]
    async fn test_missing_course() {
        let transport = courses_gateway();
        let err = find_course_id(&transport, "Nope").await.unwrap_err();
        assert!(matches!(err, SalonError::NotFound { pages_scanned: 2, .. }));
        assert_eq!(err.to_string(), "course 'Nope': no match after scanning 2 page(s)");
    }

    #[tokio::test]
    async fn test_page_without_page_info_is_not_absence() {
        let transport = MockTransport::new(|_| {
            Ok(json!({"data": {"courses": {
                "edges": [{"node": {"id": "c1", "name": "Balayage Basics"}}]
            }}}))
        });
        let err = find_course_id(&transport, "Nope").await.unwrap_err();
        assert!(!err.is_absence());
        assert!(matches!(err, SalonError::MissingField { ref path, .. } if path.contains("pageInfo")));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_archive_request_shape() {
        let transport = courses_gateway();
        let count = archive_course(&transport, "c1").await.unwrap();
        assert_eq!(count, 1);

        let request = transport.requests().remove(0);
        let vars: &Value = &request.variables;
        assert_eq!(vars["bulkRequest"]["selectionMode"], "SELECT_NONE");
        assert_eq!(vars["bulkRequest"]["selectedIds"], json!(["c1"]));
        assert_eq!(vars["archive"], true);
    }
}
