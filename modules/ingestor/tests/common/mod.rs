#![allow(dead_code)]

use sbomgraph_entity::{
    sbom_component::ComponentType, sbom_source::SourceType, sbom_tracked_context,
};
use sbomgraph_module_ingestor::model::{OccurrenceMap, ReportComponent, ReportSource};
use sbomgraph_test_context::{IngestionContext, PROJECT_ID};
use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use time::OffsetDateTime;

pub const LOCKFILE: &str = "Gemfile.lock";

pub fn bundler() -> ReportSource {
    ReportSource::new(SourceType::DependencyScanning)
        .with_input_file_path(LOCKFILE)
        .with_package_manager("bundler")
}

/// A gem, as reported from the project's lockfile.
pub fn gem(name: &str, version: &str) -> anyhow::Result<OccurrenceMap> {
    let component = ReportComponent::new(name)
        .with_version(version)
        .with_purl(&format!("pkg:gem/{name}@{version}"))?;
    Ok(OccurrenceMap::new(component, Some(bundler())))
}

/// An operating system package, built from `source`.
pub fn deb(name: &str, version: &str, source: &str) -> anyhow::Result<OccurrenceMap> {
    let component = ReportComponent::new(name)
        .with_version(version)
        .with_purl(&format!("pkg:deb/debian/{name}@{version}"))?
        .with_component_type(ComponentType::OperatingSystem)
        .with_source_package(source);
    let source = ReportSource::new(SourceType::ContainerScanning)
        .with_data(serde_json::json!({"image": "registry.example.com/app:latest"}));
    Ok(OccurrenceMap::new(component, Some(source)))
}

pub fn gems() -> anyhow::Result<Vec<OccurrenceMap>> {
    Ok(vec![
        gem("rack", "2.2.3")?,
        gem("rails", "7.1.0")?,
        gem("puma", "6.4.0")?,
        gem("nokogiri", "1.16.0")?,
    ])
}

pub async fn track(
    ctx: &IngestionContext,
    name: &str,
    context_type: sbom_tracked_context::ContextType,
) -> anyhow::Result<sbom_tracked_context::Model> {
    Ok(sbom_tracked_context::ActiveModel {
        project_id: Set(PROJECT_ID),
        context_name: Set(name.to_string()),
        context_type: Set(context_type),
        is_default: Set(false),
        created_at: Set(OffsetDateTime::now_utc()),
        ..Default::default()
    }
    .insert(&ctx.db)
    .await?)
}

pub fn occurrence_id(maps: &[OccurrenceMap], name: &str) -> Option<i64> {
    maps.iter()
        .find(|map| map.name() == name)
        .and_then(|map| map.occurrence_id)
}
