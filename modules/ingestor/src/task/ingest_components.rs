use super::{validate::filter_invalid_objects, Task, TaskDescriptor};
use crate::{
    error::{ConfigError, Error},
    model::{Field, OccurrenceMap, PipelineContext, ReportComponent, NAMESPACE},
};
use sbomgraph_entity::sbom_component::{self, Column};
use sea_orm::{ActiveValue::Set, ConnectionTrait};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

/// Resolve the component of every occurrence map.
pub struct IngestComponents {
    descriptor: TaskDescriptor<sbom_component::Entity>,
}

impl IngestComponents {
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            descriptor: TaskDescriptor::new(Self::NAME, [Column::Uuid], [Column::Id, Column::Uuid])?
                .with_update([Column::UpdatedAt]),
        })
    }
}

/// The id of a component, derived from what identifies it.
pub fn component_uuid(component: &ReportComponent) -> Uuid {
    let name = format!(
        "{}:{}:{}",
        component.component_type,
        component.purl_type().unwrap_or_default(),
        component.name
    );
    Uuid::new_v5(&NAMESPACE, name.as_bytes())
}

impl Task for IngestComponents {
    const NAME: &'static str = "IngestComponents";
    const READS: &'static [Field] = &[Field::ReportComponent];
    const WRITES: &'static [Field] = &[Field::ComponentId];

    type Output = ();

    #[instrument(skip_all, fields(maps = maps.len()), err)]
    async fn execute<C: ConnectionTrait>(
        &self,
        db: &C,
        _pipeline: &PipelineContext,
        maps: &mut Vec<OccurrenceMap>,
    ) -> Result<(), Error> {
        let now = OffsetDateTime::now_utc();

        let pending = maps
            .iter()
            .enumerate()
            .map(|(index, map)| {
                let component = &map.report_component;
                let object = sbom_component::ActiveModel {
                    uuid: Set(component_uuid(component)),
                    name: Set(component.name.clone()),
                    purl_type: Set(component.purl_type().map(ToString::to_string)),
                    component_type: Set(component.component_type),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                (index, object)
            })
            .collect::<Vec<_>>();

        let pending = filter_invalid_objects(Self::NAME, pending);
        let objects = pending
            .iter()
            .map(|(_, object)| object.clone())
            .collect::<Vec<_>>();

        let rows = self.descriptor.bulk_upsert(db, objects).await?;

        self.descriptor.each_pair(maps, &pending, &rows, |map, row| {
            map.component_id = Some(self.descriptor.value(row, Column::Id)?);
            Ok(())
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use sbomgraph_entity::sbom_component::ComponentType;

    #[test]
    fn uuid_depends_on_identity() -> Result<(), anyhow::Error> {
        let rack = ReportComponent::new("rack").with_purl("pkg:gem/rack@2.2.3")?;
        let other_version = ReportComponent::new("rack").with_purl("pkg:gem/rack@3.0.0")?;
        let npm = ReportComponent::new("rack").with_purl("pkg:npm/rack@2.2.3")?;
        let app = rack.clone().with_component_type(ComponentType::Application);

        assert_eq!(component_uuid(&rack), component_uuid(&other_version));
        assert_ne!(component_uuid(&rack), component_uuid(&npm));
        assert_ne!(component_uuid(&rack), component_uuid(&app));

        Ok(())
    }
}
