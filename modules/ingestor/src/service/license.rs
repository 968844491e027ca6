use crate::model::PackageIdentity;
use itertools::Itertools;
use sbomgraph_common::db::{chunk::chunked_with, Database};
use sbomgraph_entity::{license::License, package_license};
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter};
use std::collections::{BTreeSet, HashMap};
use tracing::instrument;

/// Where the licenses of packages come from.
#[async_trait::async_trait]
pub trait LicenseSource: Send + Sync {
    /// Look up the licenses of a batch of packages.
    ///
    /// Packages without known licenses may be missing from the result.
    async fn licenses(
        &self,
        packages: &[PackageIdentity],
    ) -> Result<HashMap<PackageIdentity, Vec<License>>, anyhow::Error>;
}

/// License data maintained in the `package_licenses` table.
#[derive(Clone, Debug)]
pub struct PackageLicenseSource {
    db: Database,
}

impl PackageLicenseSource {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl LicenseSource for PackageLicenseSource {
    #[instrument(skip_all, fields(packages = packages.len()), err)]
    async fn licenses(
        &self,
        packages: &[PackageIdentity],
    ) -> Result<HashMap<PackageIdentity, Vec<License>>, anyhow::Error> {
        let names = packages
            .iter()
            .map(|package| (package.purl_type.as_str(), package.name.as_str()))
            .collect::<BTreeSet<_>>();

        let batches = chunked_with(2, names)
            .into_iter()
            .map(|batch| {
                batch.fold(Condition::any(), |condition, (purl_type, name)| {
                    condition.add(
                        Condition::all()
                            .add(package_license::Column::PurlType.eq(purl_type))
                            .add(package_license::Column::Name.eq(name)),
                    )
                })
            })
            .collect::<Vec<_>>();

        let mut entries = Vec::new();
        for condition in batches {
            entries.extend(
                package_license::Entity::find()
                    .filter(condition)
                    .all(&self.db)
                    .await?,
            );
        }

        Ok(resolve(packages, entries))
    }
}

/// Pick the licenses of every package: the entry of its exact version, or else the
/// version-less entry of its name.
fn resolve(
    packages: &[PackageIdentity],
    entries: Vec<package_license::Model>,
) -> HashMap<PackageIdentity, Vec<License>> {
    let entries = entries
        .into_iter()
        .into_group_map_by(|entry| (entry.purl_type.clone(), entry.name.clone()));

    let mut result = HashMap::new();

    for package in packages {
        let Some(candidates) = entries.get(&(package.purl_type.clone(), package.name.clone()))
        else {
            continue;
        };

        let entry = candidates
            .iter()
            .find(|entry| entry.version.as_deref() == Some(package.version.as_str()))
            .or_else(|| candidates.iter().find(|entry| entry.version.is_none()));

        if let Some(entry) = entry {
            let licenses = entry.licenses.0.iter().cloned().map(with_default_url).collect();
            result.insert(package.clone(), licenses);
        }
    }

    result
}

fn with_default_url(mut license: License) -> License {
    if license.url.is_none() {
        license.url = Some(format!(
            "https://spdx.org/licenses/{}.html",
            license.spdx_identifier
        ));
    }
    license
}

#[cfg(test)]
mod test {
    use super::*;
    use sbomgraph_entity::license::Licenses;

    fn package(version: &str) -> PackageIdentity {
        PackageIdentity {
            name: "rack".into(),
            purl_type: "gem".into(),
            version: version.into(),
        }
    }

    fn entry(version: Option<&str>, license: License) -> package_license::Model {
        package_license::Model {
            id: 0,
            purl_type: "gem".into(),
            name: "rack".into(),
            version: version.map(Into::into),
            licenses: Licenses(vec![license]),
        }
    }

    #[test]
    fn exact_version_wins() {
        let entries = vec![
            entry(None, License::new("MIT", "MIT License")),
            entry(Some("1.0.0"), License::new("Apache-2.0", "Apache License 2.0")),
        ];

        let result = resolve(&[package("1.0.0"), package("2.0.0")], entries);

        assert_eq!(result[&package("1.0.0")][0].spdx_identifier, "Apache-2.0");
        assert_eq!(result[&package("2.0.0")][0].spdx_identifier, "MIT");
    }

    #[test]
    fn unknown_packages_are_missing() {
        let result = resolve(
            &[package("1.0.0")],
            vec![entry(Some("2.0.0"), License::new("MIT", "MIT License"))],
        );
        assert!(result.is_empty());
    }

    #[test]
    fn default_url() {
        let license = with_default_url(License::new("MIT", "MIT License"));
        assert_eq!(
            license.url.as_deref(),
            Some("https://spdx.org/licenses/MIT.html")
        );

        let license =
            with_default_url(License::new("MIT", "MIT License").with_url("https://mit.edu"));
        assert_eq!(license.url.as_deref(), Some("https://mit.edu"));
    }
}
