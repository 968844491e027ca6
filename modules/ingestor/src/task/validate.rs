use super::active;
use itertools::Itertools;
use sbomgraph_entity::{
    sbom_component, sbom_component_version, sbom_occurrence, sbom_source_package,
};
use std::fmt;

const MAX_NAME_LENGTH: usize = 255;
const MAX_PATH_LENGTH: usize = 1024;

/// The first attribute of an object which failed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub attribute: &'static str,
    pub value: String,
    pub message: String,
}

impl Violation {
    pub fn new(attribute: &'static str, value: impl fmt::Debug, message: impl Into<String>) -> Self {
        Self {
            attribute,
            value: format!("{value:?}"),
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidObject {
    pub model: &'static str,
    pub violation: Violation,
}

impl fmt::Display for InvalidObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} ({})",
            self.model, self.violation.attribute, self.violation.message, self.violation.value
        )
    }
}

/// Model level constraints of an object about to be written.
pub trait Validate {
    const MODEL: &'static str;

    fn validate(&self) -> Result<(), Violation>;
}

impl<T: Validate> Validate for (usize, T) {
    const MODEL: &'static str = T::MODEL;

    fn validate(&self) -> Result<(), Violation> {
        self.1.validate()
    }
}

/// Split objects into the valid ones and a report of the invalid ones, keeping their order.
pub fn partition_valid<T: Validate>(objects: Vec<T>) -> (Vec<T>, Vec<InvalidObject>) {
    let mut valid = Vec::with_capacity(objects.len());
    let mut invalid = Vec::new();

    for object in objects {
        match object.validate() {
            Ok(()) => valid.push(object),
            Err(violation) => invalid.push(InvalidObject {
                model: T::MODEL,
                violation,
            }),
        }
    }

    (valid, invalid)
}

/// The single warning describing all invalid objects of a batch, if there are any.
pub fn warning(task: &str, invalid: &[InvalidObject]) -> Option<String> {
    if invalid.is_empty() {
        return None;
    }

    Some(format!(
        "{task}: dropping {} invalid object(s): {}",
        invalid.len(),
        invalid.iter().join("; ")
    ))
}

/// Drop invalid objects, logging one warning for all of them.
pub fn filter_invalid_objects<T: Validate>(task: &str, objects: Vec<T>) -> Vec<T> {
    let (valid, invalid) = partition_valid(objects);
    if let Some(warning) = warning(task, &invalid) {
        log::warn!("{warning}");
    }
    valid
}

fn name(attribute: &'static str, value: &str) -> Result<(), Violation> {
    if value.trim().is_empty() {
        Err(Violation::new(attribute, value, "can't be blank"))
    } else if value.chars().count() > MAX_NAME_LENGTH {
        Err(Violation::new(
            attribute,
            value,
            format!("is too long (maximum is {MAX_NAME_LENGTH} characters)"),
        ))
    } else {
        Ok(())
    }
}

fn commit_sha(value: &str) -> Result<(), Violation> {
    let valid = matches!(value.len(), 40 | 64) && value.chars().all(|c| c.is_ascii_hexdigit());
    match valid {
        true => Ok(()),
        false => Err(Violation::new(
            "commit_sha",
            value,
            "is not a SHA-1 or SHA-256 commit id",
        )),
    }
}

fn licenses(licenses: &sbomgraph_entity::license::Licenses) -> Result<(), Violation> {
    for license in &licenses.0 {
        if license.spdx_identifier.trim().is_empty() {
            return Err(Violation::new(
                "licenses",
                license,
                "must have an spdx_identifier",
            ));
        }

        if let Some(url) = &license.url {
            let valid = url::Url::parse(url)
                .map(|url| matches!(url.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !valid {
                return Err(Violation::new("licenses", license, "has an invalid url"));
            }
        }
    }

    Ok(())
}

impl Validate for sbom_component::ActiveModel {
    const MODEL: &'static str = "sbom_components";

    fn validate(&self) -> Result<(), Violation> {
        if let Some(value) = active(&self.name) {
            name("name", value)?;
        }
        Ok(())
    }
}

impl Validate for sbom_component_version::ActiveModel {
    const MODEL: &'static str = "sbom_component_versions";

    fn validate(&self) -> Result<(), Violation> {
        if let Some(value) = active(&self.version) {
            name("version", value)?;
        }
        Ok(())
    }
}

impl Validate for sbom_source_package::ActiveModel {
    const MODEL: &'static str = "sbom_source_packages";

    fn validate(&self) -> Result<(), Violation> {
        if let Some(value) = active(&self.name) {
            name("name", value)?;
        }
        Ok(())
    }
}

impl Validate for sbom_occurrence::ActiveModel {
    const MODEL: &'static str = "sbom_occurrences";

    fn validate(&self) -> Result<(), Violation> {
        if let Some(value) = active(&self.commit_sha) {
            commit_sha(value)?;
        }
        if let Some(value) = active(&self.component_name) {
            name("component_name", value)?;
        }
        if let Some(Some(value)) = active(&self.input_file_path) {
            if value.chars().count() > MAX_PATH_LENGTH {
                return Err(Violation::new(
                    "input_file_path",
                    value,
                    format!("is too long (maximum is {MAX_PATH_LENGTH} characters)"),
                ));
            }
        }
        if let Some(value) = active(&self.licenses) {
            licenses(value)?;
        }
        Ok(())
    }
}
