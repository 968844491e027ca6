#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

mod common;

use common::{gem, gems, track};
use sbomgraph_entity::{
    sbom_occurrence_ref,
    sbom_tracked_context::{self, ContextType, MAX_CONTEXTS_PER_PROJECT},
};
use sbomgraph_module_ingestor::{model::PipelineContext, Error};
use sbomgraph_test_context::{IngestionContext, DEFAULT_BRANCH, SHA};
use sea_orm::{EntityTrait, PaginatorTrait};
use test_context::test_context;
use test_log::test;

const TAG_SHA: &str = "0d5b5c3bd3e6d2a7b0bfbf4b2c0d6e9f1a2b3c4d";

fn pipeline_for(ctx: &IngestionContext, ref_name: &str, tag: bool) -> PipelineContext {
    let mut pipeline = ctx.pipeline(10);
    pipeline.pipeline.ref_name = ref_name.to_string();
    pipeline.pipeline.tag = tag;
    pipeline
}

#[test_context(IngestionContext)]
#[test(tokio::test)]
async fn default_branch_is_tracked(ctx: &IngestionContext) -> Result<(), anyhow::Error> {
    let (result, _) = ctx.service().ingest(&ctx.pipeline(10), gems()?).await?;

    let contexts = sbom_tracked_context::Entity::find().all(&ctx.db).await?;
    assert_eq!(contexts.len(), 1);
    assert_eq!(contexts[0].context_name, DEFAULT_BRANCH);
    assert_eq!(contexts[0].context_type, ContextType::Branch);
    assert!(contexts[0].is_default);
    assert_eq!(result.tracked_context_id, Some(contexts[0].id));

    let refs = sbom_occurrence_ref::Entity::find().all(&ctx.db).await?;
    assert_eq!(result.refs_created, 4);
    assert_eq!(refs.len(), 4);
    for occurrence_ref in &refs {
        assert_eq!(occurrence_ref.tracked_context_id, contexts[0].id);
        assert_eq!(occurrence_ref.pipeline_id, 10);
        assert_eq!(occurrence_ref.commit_sha, SHA);
    }

    // the same pipeline doesn't record twice
    let (result, _) = ctx.service().ingest(&ctx.pipeline(10), gems()?).await?;
    assert_eq!(result.refs_created, 0);
    assert_eq!(sbom_occurrence_ref::Entity::find().count(&ctx.db).await?, 4);
    assert_eq!(sbom_tracked_context::Entity::find().count(&ctx.db).await?, 1);

    Ok(())
}

#[test_context(IngestionContext)]
#[test(tokio::test)]
async fn tracked_contexts_are_capped(ctx: &IngestionContext) -> Result<(), anyhow::Error> {
    for n in 0..MAX_CONTEXTS_PER_PROJECT {
        track(ctx, &format!("feature-{n}"), ContextType::Branch).await?;
    }

    let result = ctx.service().ingest(&ctx.pipeline(10), gems()?).await;

    assert!(
        matches!(result, Err(Error::Validation(_))),
        "must fail, was: {result:?}"
    );
    assert_eq!(sbom_occurrence_ref::Entity::find().count(&ctx.db).await?, 0);
    assert_eq!(
        sbom_tracked_context::Entity::find().count(&ctx.db).await?,
        MAX_CONTEXTS_PER_PROJECT
    );

    Ok(())
}

#[test_context(IngestionContext)]
#[test(tokio::test)]
async fn tag_records_its_target(ctx: &IngestionContext) -> Result<(), anyhow::Error> {
    let context = track(ctx, "v1.0.0", ContextType::Tag).await?;
    ctx.repository.add_tag("v1.0.0", TAG_SHA);

    let pipeline = pipeline_for(ctx, "v1.0.0", true);
    let (result, _) = ctx
        .service()
        .ingest(&pipeline, vec![gem("rack", "2.2.3")?])
        .await?;

    assert_eq!(result.tracked_context_id, Some(context.id));
    assert_eq!(result.refs_created, 1);

    let refs = sbom_occurrence_ref::Entity::find().all(&ctx.db).await?;
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].commit_sha, TAG_SHA);

    Ok(())
}

#[test_context(IngestionContext)]
#[test(tokio::test)]
async fn missing_tag_is_skipped(ctx: &IngestionContext) -> Result<(), anyhow::Error> {
    track(ctx, "v2.0.0", ContextType::Tag).await?;

    let pipeline = pipeline_for(ctx, "v2.0.0", true);
    let (result, _) = ctx
        .service()
        .ingest(&pipeline, vec![gem("rack", "2.2.3")?])
        .await?;

    assert_eq!(result.occurrence_ids.len(), 1);
    assert_eq!(result.tracked_context_id, None);
    assert_eq!(result.refs_created, 0);
    assert_eq!(sbom_occurrence_ref::Entity::find().count(&ctx.db).await?, 0);

    Ok(())
}

#[test_context(IngestionContext)]
#[test(tokio::test)]
async fn untracked_branch_is_skipped(ctx: &IngestionContext) -> Result<(), anyhow::Error> {
    ctx.repository.add_branch("feature");

    let pipeline = pipeline_for(ctx, "feature", false);
    let (result, _) = ctx
        .service()
        .ingest(&pipeline, vec![gem("rack", "2.2.3")?])
        .await?;

    assert_eq!(result.occurrence_ids.len(), 1);
    assert_eq!(result.tracked_context_id, None);
    assert_eq!(result.refs_created, 0);
    assert_eq!(sbom_tracked_context::Entity::find().count(&ctx.db).await?, 0);

    Ok(())
}

#[test_context(IngestionContext)]
#[test(tokio::test)]
async fn deleted_branch_is_skipped(ctx: &IngestionContext) -> Result<(), anyhow::Error> {
    track(ctx, "gone", ContextType::Branch).await?;

    let pipeline = pipeline_for(ctx, "gone", false);
    let (result, _) = ctx
        .service()
        .ingest(&pipeline, vec![gem("rack", "2.2.3")?])
        .await?;

    assert_eq!(result.tracked_context_id, None);
    assert_eq!(result.refs_created, 0);

    Ok(())
}

#[test_context(IngestionContext)]
#[test(tokio::test)]
async fn tracked_branch(ctx: &IngestionContext) -> Result<(), anyhow::Error> {
    let context = track(ctx, "stable", ContextType::Branch).await?;
    ctx.repository.add_branch("stable");

    let pipeline = pipeline_for(ctx, "stable", false);
    let (result, _) = ctx.service().ingest(&pipeline, gems()?).await?;

    assert_eq!(result.tracked_context_id, Some(context.id));
    assert_eq!(result.refs_created, 4);
    assert_eq!(sbom_tracked_context::Entity::find().count(&ctx.db).await?, 1);

    Ok(())
}
