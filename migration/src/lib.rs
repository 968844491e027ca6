pub use sea_orm_migration::prelude::*;

mod m0000010_create_sbom_components;
mod m0000020_create_sbom_occurrences;
mod m0000030_create_vulnerabilities;
mod m0000040_create_sbom_tracked_contexts;
mod m0000050_create_security_policy_dismissals;
mod m0000060_create_package_licenses;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m0000010_create_sbom_components::Migration),
            Box::new(m0000020_create_sbom_occurrences::Migration),
            Box::new(m0000030_create_vulnerabilities::Migration),
            Box::new(m0000040_create_sbom_tracked_contexts::Migration),
            Box::new(m0000050_create_security_policy_dismissals::Migration),
            Box::new(m0000060_create_package_licenses::Migration),
        ]
    }
}

