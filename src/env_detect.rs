use serde::Serialize;
use thiserror::Error;
use which::which;

use crate::step::CommandSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Dnf,
    Apt,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DetectError {
    #[error("Unsupported package manager. Please use a system with either DNF or APT.")]
    UnsupportedPackageManager,
}

impl PackageManager {
    pub fn name(&self) -> &'static str {
        match self {
            PackageManager::Dnf => "dnf",
            PackageManager::Apt => "apt",
        }
    }

    /// Commands that install the host packages the E2E suite needs.
    pub fn install_commands(&self) -> Vec<CommandSpec> {
        match self {
            PackageManager::Dnf => vec![CommandSpec::from_words(
                "sudo dnf install -y qemu-img sshpass libvirt-devel libvirt-daemon \
                 libvirt-daemon-config-network libvirt-daemon-kvm",
            )],
            PackageManager::Apt => vec![
                CommandSpec::from_words("sudo apt update"),
                CommandSpec::from_words(
                    "sudo apt install -y qemu-utils sshpass libvirt-dev libvirt-daemon \
                     libvirt-daemon-system",
                ),
            ],
        }
    }
}

/// Pick the host package manager, preferring dnf over apt.
pub fn detect_package_manager(
    has_command: impl Fn(&str) -> bool,
) -> Result<PackageManager, DetectError> {
    [PackageManager::Dnf, PackageManager::Apt]
        .into_iter()
        .find(|pm| has_command(pm.name()))
        .ok_or(DetectError::UnsupportedPackageManager)
}

pub fn has_command(cmd: &str) -> bool {
    which(cmd).is_ok()
}
