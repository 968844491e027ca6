use packageurl::PackageUrl;
use sbomgraph_entity::{
    sbom_component::ComponentType, sbom_occurrence::Ancestor, sbom_source::SourceType,
};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::str::FromStr;
use uuid::Uuid;

/// Namespace of all content derived ids.
pub const NAMESPACE: Uuid = Uuid::from_u128(0x8b3f_4c2e_6d1a_5e79_a0c4_1f2b_3d4e_5a6b);

/// A component, as found in a dependency report.
#[derive(Clone, Debug)]
pub struct ReportComponent {
    pub name: String,
    pub version: Option<String>,
    pub purl: Option<PackageUrl<'static>>,
    pub component_type: ComponentType,
    /// The source package a binary package was built from, for operating system packages.
    pub source_package_name: Option<String>,
    pub ancestors: Vec<Ancestor>,
}

impl ReportComponent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            purl: None,
            component_type: ComponentType::default(),
            source_package_name: None,
            ancestors: vec![],
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_purl(mut self, purl: &str) -> Result<Self, packageurl::Error> {
        self.purl = Some(PackageUrl::from_str(purl)?);
        Ok(self)
    }

    pub fn with_component_type(mut self, component_type: ComponentType) -> Self {
        self.component_type = component_type;
        self
    }

    pub fn with_source_package(mut self, name: impl Into<String>) -> Self {
        self.source_package_name = Some(name.into());
        self
    }

    pub fn with_ancestor(mut self, name: Option<&str>, version: Option<&str>) -> Self {
        self.ancestors.push(Ancestor {
            name: name.map(Into::into),
            version: version.map(Into::into),
        });
        self
    }

    pub fn purl_type(&self) -> Option<&str> {
        self.purl.as_ref().map(|purl| purl.ty())
    }
}

/// The scanner context a component was reported in.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportSource {
    pub source_type: SourceType,
    pub input_file_path: Option<String>,
    pub package_manager: Option<String>,
    /// Any additional information the scanner provided.
    pub data: serde_json::Value,
}

impl ReportSource {
    pub fn new(source_type: SourceType) -> Self {
        Self {
            source_type,
            input_file_path: None,
            package_manager: None,
            data: serde_json::Value::Null,
        }
    }

    pub fn with_input_file_path(mut self, path: impl Into<String>) -> Self {
        self.input_file_path = Some(path.into());
        self
    }

    pub fn with_package_manager(mut self, name: impl Into<String>) -> Self {
        self.package_manager = Some(name.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    /// The details, as stored with the source.
    pub fn details(&self) -> serde_json::Value {
        serde_json::json!({
            "input_file": { "path": self.input_file_path },
            "package_manager": { "name": self.package_manager },
            "data": self.data,
        })
    }

    /// Hex encoded SHA-256 of the serialized details.
    ///
    /// JSON objects serialize with sorted keys, so equal details always share a fingerprint.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let bytes = serde_json::to_vec(&self.details())?;
        Ok(hex::encode(Sha256::digest(bytes)))
    }
}

/// What the license data of a package is looked up by.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageIdentity {
    pub name: String,
    pub purl_type: String,
    pub version: String,
}

/// The working record of one reported occurrence, filled in by the tasks of an ingestion.
#[derive(Clone, Debug)]
pub struct OccurrenceMap {
    pub report_component: ReportComponent,
    pub report_source: Option<ReportSource>,
    pub component_id: Option<i64>,
    pub component_version_id: Option<i64>,
    pub source_id: Option<i64>,
    pub source_package_id: Option<i64>,
    pub occurrence_id: Option<i64>,
    pub uuid: Option<Uuid>,
    pub vulnerability_ids: BTreeSet<i64>,
}

impl OccurrenceMap {
    pub fn new(report_component: ReportComponent, report_source: Option<ReportSource>) -> Self {
        Self {
            report_component,
            report_source,
            component_id: None,
            component_version_id: None,
            source_id: None,
            source_package_id: None,
            occurrence_id: None,
            uuid: None,
            vulnerability_ids: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.report_component.name
    }

    pub fn version(&self) -> Option<&str> {
        self.report_component.version.as_deref()
    }

    pub fn purl_type(&self) -> Option<&str> {
        self.report_component.purl_type()
    }

    pub fn input_file_path(&self) -> Option<&str> {
        self.report_source
            .as_ref()
            .and_then(|source| source.input_file_path.as_deref())
    }

    pub fn package_manager(&self) -> Option<&str> {
        self.report_source
            .as_ref()
            .and_then(|source| source.package_manager.as_deref())
    }

    /// The package identity, if the component has a purl and a version.
    pub fn identity(&self) -> Option<PackageIdentity> {
        Some(PackageIdentity {
            name: self.name().to_string(),
            purl_type: self.purl_type()?.to_string(),
            version: self.version()?.to_string(),
        })
    }
}

/// A field of an [`OccurrenceMap`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Field {
    ReportComponent,
    ReportSource,
    ComponentId,
    ComponentVersionId,
    SourceId,
    SourcePackageId,
    OccurrenceId,
    Uuid,
    VulnerabilityIds,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Project {
    pub id: i64,
    pub archived: bool,
    /// The namespace hierarchy of the project, root first.
    pub traversal_ids: Vec<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pipeline {
    pub id: i64,
    pub sha: String,
    /// Branch or tag name the pipeline ran for.
    pub ref_name: String,
    pub tag: bool,
}

/// The pipeline run a report is ingested for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineContext {
    pub project: Project,
    pub pipeline: Pipeline,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct IngestResult {
    /// The resolved occurrence ids, in the order of the surviving occurrence maps.
    pub occurrence_ids: Vec<i64>,
    pub vulnerability_links_created: usize,
    pub vulnerability_links_deleted: usize,
    pub tracked_context_id: Option<i64>,
    pub refs_created: usize,
    pub dismissals_updated: usize,
}
