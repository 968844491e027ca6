#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

mod common;

use common::{deb, gem, gems, occurrence_id};
use sbomgraph_entity::{
    license::License,
    sbom_component::{self, ComponentType},
    sbom_component_version, sbom_occurrence, sbom_source, sbom_source_package,
};
use sbomgraph_module_ingestor::model::{OccurrenceMap, ReportComponent};
use sbomgraph_test_context::{IngestionContext, StaticLicenses};
use sea_orm::{EntityTrait, PaginatorTrait};
use std::{collections::HashSet, sync::Arc};
use test_context::test_context;
use test_log::test;

#[test_context(IngestionContext)]
#[test(tokio::test)]
async fn fresh_ingest(ctx: &IngestionContext) -> Result<(), anyhow::Error> {
    let (result, maps) = ctx.service().ingest(&ctx.pipeline(10), gems()?).await?;

    assert_eq!(result.occurrence_ids.len(), 4);
    assert_eq!(
        result.occurrence_ids.iter().collect::<HashSet<_>>().len(),
        4,
        "occurrence ids must be distinct"
    );
    assert!(maps.iter().all(|map| map.occurrence_id.is_some()));
    assert!(maps.iter().all(|map| map.component_version_id.is_some()));

    let occurrences = ctx.occurrences().await?;
    assert_eq!(occurrences.len(), 4);
    for occurrence in &occurrences {
        assert_eq!(occurrence.pipeline_id, 10);
        assert_eq!(occurrence.input_file_path.as_deref(), Some(common::LOCKFILE));
        assert_eq!(occurrence.package_manager.as_deref(), Some("bundler"));
        assert_eq!(occurrence.traversal_ids.0, vec![100, 1]);
        assert_eq!(occurrence.vulnerability_count, 0);
        assert_eq!(occurrence.highest_severity, None);
    }

    assert_eq!(sbom_component::Entity::find().count(&ctx.db).await?, 4);
    assert_eq!(sbom_component_version::Entity::find().count(&ctx.db).await?, 4);
    // all gems share the lockfile
    assert_eq!(sbom_source::Entity::find().count(&ctx.db).await?, 1);

    Ok(())
}

#[test_context(IngestionContext)]
#[test(tokio::test)]
async fn reingest_is_idempotent(ctx: &IngestionContext) -> Result<(), anyhow::Error> {
    let service = ctx.service();

    let (first, _) = service.ingest(&ctx.pipeline(10), gems()?).await?;
    let before = ctx.occurrences().await?;

    let (second, _) = service.ingest(&ctx.pipeline(11), gems()?).await?;
    let after = ctx.occurrences().await?;

    assert_eq!(first.occurrence_ids, second.occurrence_ids);
    assert_eq!(before.len(), after.len());

    for (before, after) in before.iter().zip(&after) {
        assert_eq!(before.id, after.id);
        assert_eq!(before.uuid, after.uuid);
        assert_eq!(after.pipeline_id, 11);
        assert_eq!(before.updated_at, after.updated_at, "nothing changed");
    }

    assert_eq!(sbom_component::Entity::find().count(&ctx.db).await?, 4);
    assert_eq!(sbom_component_version::Entity::find().count(&ctx.db).await?, 4);
    assert_eq!(sbom_source::Entity::find().count(&ctx.db).await?, 1);

    Ok(())
}

#[test_context(IngestionContext)]
#[test(tokio::test)]
async fn changed_occurrence_is_touched(ctx: &IngestionContext) -> Result<(), anyhow::Error> {
    let service = ctx.service();

    service.ingest(&ctx.pipeline(10), gems()?).await?;
    let before = ctx.occurrences().await?;

    let mut pipeline = ctx.pipeline(11);
    pipeline.project.archived = true;
    service.ingest(&pipeline, gems()?).await?;
    let after = ctx.occurrences().await?;

    for (before, after) in before.iter().zip(&after) {
        assert_eq!(before.id, after.id);
        assert!(after.archived);
        assert!(after.updated_at >= before.updated_at);
    }

    Ok(())
}

#[test_context(IngestionContext)]
#[test(tokio::test)]
async fn duplicates_in_one_batch(ctx: &IngestionContext) -> Result<(), anyhow::Error> {
    let maps = vec![gem("rack", "2.2.3")?, gem("rack", "2.2.3")?];

    let (result, maps) = ctx.service().ingest(&ctx.pipeline(10), maps).await?;

    assert_eq!(maps.len(), 1, "the duplicate resolves to the same occurrence");
    assert_eq!(result.occurrence_ids.len(), 1);
    assert_eq!(sbom_occurrence::Entity::find().count(&ctx.db).await?, 1);
    assert_eq!(sbom_component::Entity::find().count(&ctx.db).await?, 1);

    Ok(())
}

#[test_context(IngestionContext)]
#[test(tokio::test)]
async fn invalid_occurrence_is_dropped(ctx: &IngestionContext) -> Result<(), anyhow::Error> {
    ctx.add_package_license(
        "gem",
        "rack",
        None,
        vec![License::new("MIT", "MIT License").with_url("not a url")].into(),
    )
    .await?;

    let maps = vec![gem("rack", "2.2.3")?, gem("rails", "7.1.0")?];
    let (result, maps) = ctx.service().ingest(&ctx.pipeline(10), maps).await?;

    assert_eq!(occurrence_id(&maps, "rack"), None);
    assert!(occurrence_id(&maps, "rails").is_some());
    assert_eq!(result.occurrence_ids.len(), 1);
    assert_eq!(result.refs_created, 1);

    let occurrences = ctx.occurrences().await?;
    assert_eq!(occurrences.len(), 1);
    assert_eq!(occurrences[0].component_name, "rails");

    // the component itself was valid
    assert_eq!(sbom_component::Entity::find().count(&ctx.db).await?, 2);

    Ok(())
}

#[test_context(IngestionContext)]
#[test(tokio::test)]
async fn licenses_are_attached(ctx: &IngestionContext) -> Result<(), anyhow::Error> {
    ctx.add_package_license(
        "gem",
        "rack",
        None,
        vec![License::new("MIT", "MIT License")].into(),
    )
    .await?;
    ctx.add_package_license(
        "gem",
        "rack",
        Some("2.2.3"),
        vec![License::new("Apache-2.0", "Apache License 2.0")].into(),
    )
    .await?;

    let maps = vec![gem("rack", "2.2.3")?, gem("rails", "7.1.0")?];
    ctx.service().ingest(&ctx.pipeline(10), maps).await?;

    let occurrences = ctx.occurrences().await?;
    let rack = occurrences
        .iter()
        .find(|occurrence| occurrence.component_name == "rack")
        .expect("rack must be ingested");
    assert_eq!(
        rack.licenses.0,
        vec![License::new("Apache-2.0", "Apache License 2.0")
            .with_url("https://spdx.org/licenses/Apache-2.0.html")]
    );

    let rails = occurrences
        .iter()
        .find(|occurrence| occurrence.component_name == "rails")
        .expect("rails must be ingested");
    assert!(rails.licenses.is_empty());

    Ok(())
}

#[test_context(IngestionContext)]
#[test(tokio::test)]
async fn source_packages(ctx: &IngestionContext) -> Result<(), anyhow::Error> {
    let maps = vec![
        deb("libssl3", "3.0.11-1", "openssl")?,
        deb("openssl", "3.0.11-1", "openssl")?,
    ];

    let (result, maps) = ctx.service().ingest(&ctx.pipeline(10), maps).await?;

    assert_eq!(result.occurrence_ids.len(), 2);
    assert_eq!(sbom_source_package::Entity::find().count(&ctx.db).await?, 1);

    let source_package_ids = maps
        .iter()
        .map(|map| map.source_package_id)
        .collect::<HashSet<_>>();
    assert_eq!(source_package_ids.len(), 1);
    assert!(!source_package_ids.contains(&None));

    let occurrences = ctx.occurrences().await?;
    assert!(occurrences
        .iter()
        .all(|occurrence| occurrence.source_package_id.is_some()));

    Ok(())
}

#[test_context(IngestionContext)]
#[test(tokio::test)]
async fn component_without_version(ctx: &IngestionContext) -> Result<(), anyhow::Error> {
    let maps = vec![OccurrenceMap::new(
        ReportComponent::new("debian").with_component_type(ComponentType::OperatingSystem),
        None,
    )];

    let (result, maps) = ctx.service().ingest(&ctx.pipeline(10), maps).await?;

    assert_eq!(result.occurrence_ids.len(), 1);
    assert_eq!(maps[0].component_version_id, None);
    assert_eq!(maps[0].source_id, None);
    assert_eq!(sbom_component_version::Entity::find().count(&ctx.db).await?, 0);

    Ok(())
}

#[test_context(IngestionContext)]
#[test(tokio::test)]
async fn licenses_are_looked_up_once(ctx: &IngestionContext) -> Result<(), anyhow::Error> {
    let rack = gem("rack", "2.2.3")?;
    let licenses = Arc::new(StaticLicenses::default().with(
        rack.identity().expect("rack has an identity"),
        vec![License::new("MIT", "MIT License")],
    ));

    let service = ctx.service().with_license_source(licenses.clone());
    service.ingest(&ctx.pipeline(10), gems()?).await?;

    assert_eq!(licenses.lookups(), 1);

    let occurrences = ctx.occurrences().await?;
    let rack = occurrences
        .iter()
        .find(|occurrence| occurrence.component_name == "rack")
        .expect("rack must be ingested");
    assert_eq!(rack.licenses.0, vec![License::new("MIT", "MIT License")]);

    Ok(())
}

#[test_context(IngestionContext)]
#[test(tokio::test)]
async fn invalid_version_keeps_its_identity(ctx: &IngestionContext) -> Result<(), anyhow::Error> {
    let unversioned = OccurrenceMap::new(
        ReportComponent::new("rack").with_purl("pkg:gem/rack")?,
        Some(common::bundler()),
    );
    let maps = vec![gem("rack", &"1".repeat(300))?, unversioned];

    let (result, maps) = ctx.service().ingest(&ctx.pipeline(10), maps).await?;

    // the invalid version does not collapse into the version-less occurrence
    assert_eq!(maps.len(), 2);
    assert_eq!(maps[0].component_version_id, None);
    assert_eq!(maps[0].uuid, None);
    assert_eq!(maps[0].occurrence_id, None);
    assert!(maps[1].occurrence_id.is_some());
    assert_eq!(result.occurrence_ids.len(), 1);

    let occurrences = ctx.occurrences().await?;
    assert_eq!(occurrences.len(), 1);
    assert_eq!(occurrences[0].component_version_id, None);
    assert_eq!(sbom_component_version::Entity::find().count(&ctx.db).await?, 0);

    Ok(())
}
