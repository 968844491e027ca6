#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

mod common;

use common::{gem, occurrence_id};
use sbomgraph_entity::{sbom_occurrences_vulnerability, vulnerability::Severity};
use sbomgraph_test_context::{IngestionContext, PROJECT_ID};
use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use test_context::test_context;
use test_log::test;
use time::OffsetDateTime;

#[test_context(IngestionContext)]
#[test(tokio::test)]
async fn occurrences_are_linked(ctx: &IngestionContext) -> Result<(), anyhow::Error> {
    let low = ctx
        .add_vulnerability(10, Severity::Low, common::LOCKFILE, "rack", "2.2.3")
        .await?;
    let high = ctx
        .add_vulnerability(10, Severity::High, common::LOCKFILE, "rack", "2.2.3")
        .await?;
    // a different version
    ctx.add_vulnerability(10, Severity::Critical, common::LOCKFILE, "rack", "3.0.0")
        .await?;

    let maps = vec![gem("rack", "2.2.3")?, gem("rails", "7.1.0")?];
    let (result, maps) = ctx.service().ingest(&ctx.pipeline(10), maps).await?;

    let rack = occurrence_id(&maps, "rack").expect("rack must be ingested");
    assert_eq!(result.vulnerability_links_created, 2);
    assert_eq!(result.vulnerability_links_deleted, 0);
    assert_eq!(
        ctx.vulnerability_links().await?,
        vec![(rack, low.id), (rack, high.id)]
    );

    let occurrence = ctx
        .occurrences()
        .await?
        .into_iter()
        .find(|occurrence| occurrence.id == rack)
        .expect("must be found");
    assert_eq!(occurrence.vulnerability_count, 2);
    assert_eq!(occurrence.highest_severity, Some(Severity::High));

    assert_eq!(ctx.index.calls(), vec![vec![low.id, high.id]]);

    Ok(())
}

#[test_context(IngestionContext)]
#[test(tokio::test)]
async fn stale_links_are_removed(ctx: &IngestionContext) -> Result<(), anyhow::Error> {
    let service = ctx.service();
    let vulnerability = ctx
        .add_vulnerability(10, Severity::Medium, common::LOCKFILE, "rack", "2.2.3")
        .await?;

    let maps = vec![gem("rack", "2.2.3")?, gem("rails", "7.1.0")?];
    let (_, maps) = service.ingest(&ctx.pipeline(10), maps).await?;
    let rack = occurrence_id(&maps, "rack").expect("rack must be ingested");
    let rails = occurrence_id(&maps, "rails").expect("rails must be ingested");

    // a link of another occurrence, not part of the next run
    sbom_occurrences_vulnerability::ActiveModel {
        occurrence_id: Set(rails),
        vulnerability_id: Set(vulnerability.id),
        project_id: Set(PROJECT_ID),
        created_at: Set(OffsetDateTime::now_utc()),
        ..Default::default()
    }
    .insert(&ctx.db)
    .await?;
    ctx.index.clear();

    // the vulnerability was not found by pipeline 11

    let (result, _) = service
        .ingest(&ctx.pipeline(11), vec![gem("rack", "2.2.3")?])
        .await?;

    assert_eq!(result.vulnerability_links_created, 0);
    assert_eq!(result.vulnerability_links_deleted, 1);
    assert_eq!(
        ctx.vulnerability_links().await?,
        vec![(rails, vulnerability.id)]
    );
    assert_eq!(ctx.index.calls(), vec![vec![vulnerability.id]]);

    let occurrence = ctx
        .occurrences()
        .await?
        .into_iter()
        .find(|occurrence| occurrence.id == rack)
        .expect("must be found");
    assert_eq!(occurrence.vulnerability_count, 0);
    assert_eq!(occurrence.highest_severity, None);

    // nothing left to change

    ctx.index.clear();
    let (result, _) = service
        .ingest(&ctx.pipeline(11), vec![gem("rack", "2.2.3")?])
        .await?;

    assert_eq!(result.vulnerability_links_created, 0);
    assert_eq!(result.vulnerability_links_deleted, 0);
    assert!(ctx.index.calls().is_empty());

    Ok(())
}

#[test_context(IngestionContext)]
#[test(tokio::test)]
async fn existing_links_are_kept(ctx: &IngestionContext) -> Result<(), anyhow::Error> {
    let service = ctx.service();
    ctx.add_vulnerability(10, Severity::Medium, common::LOCKFILE, "rack", "2.2.3")
        .await?;

    service
        .ingest(&ctx.pipeline(10), vec![gem("rack", "2.2.3")?])
        .await?;
    let links = ctx.vulnerability_links().await?;
    ctx.index.clear();

    let (result, _) = service
        .ingest(&ctx.pipeline(10), vec![gem("rack", "2.2.3")?])
        .await?;

    assert_eq!(result.vulnerability_links_created, 0);
    assert_eq!(result.vulnerability_links_deleted, 0);
    assert_eq!(ctx.vulnerability_links().await?, links);
    assert!(ctx.index.calls().is_empty());

    Ok(())
}
