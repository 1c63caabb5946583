//! Package types composed from shared attribute blocks
//!
//! These types are definitions only; no provider implements them.

use resource_api::{Attribute, ResourceDefinition};

fn shared_attributes() -> Vec<Attribute> {
    vec![
        Attribute::new("name", "String")
            .docs("The package name.")
            .namevar(),
        Attribute::new("ensure", "Enum[present, absent]")
            .docs("Whether this package should be present or absent on the target system."),
        Attribute::new("reinstall_on_refresh", "Boolean")
            .docs("Whether the package is reinstalled when it receives a refresh event."),
    ]
}

fn local_attributes() -> Vec<Attribute> {
    vec![Attribute::new("source", "String").docs("Where to find the package file.")]
}

fn versionable_attributes() -> Vec<Attribute> {
    vec![Attribute::new("version", "String").docs("The package version to install.")]
}

fn apt_attributes() -> Vec<Attribute> {
    vec![
        Attribute::new("install_options", "String")
            .docs("Extra options passed to the package manager when installing."),
        Attribute::new("responsefile", "String")
            .docs("A file with answers to debconf questions."),
    ]
}

pub fn package_rpm() -> ResourceDefinition {
    ResourceDefinition::new("package_rpm")
        .docs("Packages installed from local rpm files.")
        .with_attributes(shared_attributes())
        .with_attributes(local_attributes())
}

pub fn package_apt() -> ResourceDefinition {
    ResourceDefinition::new("package_apt")
        .docs("Packages managed by apt.")
        .with_attributes(shared_attributes())
        .with_attributes(local_attributes())
        .with_attributes(versionable_attributes())
        .with_attributes(apt_attributes())
}
