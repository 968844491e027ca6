pub mod license;

pub mod sbom_component;
pub mod sbom_component_version;
pub mod sbom_source;
pub mod sbom_source_package;

pub mod sbom_occurrence;
pub mod sbom_occurrence_ref;
pub mod sbom_occurrences_vulnerability;
pub mod sbom_tracked_context;

pub mod package_license;
pub mod security_policy_dismissal;
pub mod vulnerability;
