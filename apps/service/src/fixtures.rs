//! Demonstration jobs for a fresh database.

use uuid::Uuid;

use crate::database::JobStore;
use crate::database::models::{EndpointResponseType, Job};
use crate::error::StoreResult;

pub const ROOT_COMPONENT_ID: &str = "fixture-root-component";
pub const CHILD_COMPONENT_ID: &str = "fixture-child-component";

pub const STATUS_CODE_JOB_ID: Uuid = Uuid::from_u128(0x6669_7874_7572_6500_0000_0000_0000_0001);
pub const ENDPOINT_JOB_ID: Uuid = Uuid::from_u128(0x6669_7874_7572_6500_0000_0000_0000_0002);
pub const DOM_NODE_JOB_ID: Uuid = Uuid::from_u128(0x6669_7874_7572_6500_0000_0000_0000_0003);

fn fixture_jobs() -> Vec<Job> {
    let root = || [ROOT_COMPONENT_ID.to_string()];

    vec![
        Job::status_code("FixtureJob - STATUS_CODE", "https://jsonplaceholder.typicode.com", 200, root())
            .with_id(STATUS_CODE_JOB_ID),
        Job::endpoint(
            "FixtureJob - ENDPOINT JSON",
            "https://jsonplaceholder.typicode.com/users",
            EndpointResponseType::Json,
            "$[0].name",
            [ROOT_COMPONENT_ID.to_string(), CHILD_COMPONENT_ID.to_string()],
        )
        .with_id(ENDPOINT_JOB_ID),
        Job::dom_node("FixtureJob - DOM_NODE", "https://example.com", "//h1", root()).with_id(DOM_NODE_JOB_ID),
    ]
}

/// Create the fixture jobs that do not exist yet
///
/// Returns the jobs created by this call; existing jobs are left untouched.
pub async fn bootstrap_fixtures(jobs: &dyn JobStore) -> StoreResult<Vec<Job>> {
    let mut created = Vec::new();

    for job in fixture_jobs() {
        if jobs.get_job(job.id).await?.is_some() {
            tracing::debug!("Fixture job {} already exists", job.id);
            continue;
        }
        created.push(jobs.save_job(&job).await?);
    }

    tracing::info!("Created {} fixture jobs", created.len());
    Ok(created)
}
