//! Linux distribution detection
//!
//! Parses `/etc/os-release` into a distribution family and maps each family
//! to the commands used to install and restart the container engine.

use std::collections::HashMap;

use super::error::ProvisionError;

/// Linux distribution family
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistroFamily {
    /// Debian, Ubuntu, and derivatives (apt-based)
    Debian,
    /// RHEL, CentOS, Fedora, Amazon Linux (dnf/yum-based)
    RedHat,
    /// Alpine Linux (apk-based)
    Alpine,
    /// Arch Linux (pacman-based)
    Arch,
    /// SUSE/openSUSE (zypper-based)
    Suse,
    /// Unknown distribution
    Unknown(String),
}

impl std::fmt::Display for DistroFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistroFamily::Debian => write!(f, "Debian/Ubuntu"),
            DistroFamily::RedHat => write!(f, "RHEL/Fedora"),
            DistroFamily::Alpine => write!(f, "Alpine"),
            DistroFamily::Arch => write!(f, "Arch"),
            DistroFamily::Suse => write!(f, "SUSE"),
            DistroFamily::Unknown(id) => write!(f, "Unknown ({id})"),
        }
    }
}

/// Detected distribution information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistroInfo {
    /// Distribution family (Debian, RedHat, etc.)
    pub family: DistroFamily,
    /// Distribution ID (e.g., "ubuntu", "amzn", "debian")
    pub id: String,
    /// Pretty name (e.g., "Ubuntu 22.04.3 LTS")
    pub pretty_name: String,
    /// Version ID (e.g., "22.04", "2023")
    pub version_id: Option<String>,
}

/// Known distribution IDs for each family
///
/// Matched against `ID` first, then against each `ID_LIKE` token in order.
const FAMILY_IDS: &[(&[&str], DistroFamily)] = &[
    (
        &["debian", "ubuntu", "linuxmint", "pop", "elementary", "raspbian"],
        DistroFamily::Debian,
    ),
    (
        &["rhel", "centos", "fedora", "amzn", "rocky", "almalinux", "ol"],
        DistroFamily::RedHat,
    ),
    (&["alpine"], DistroFamily::Alpine),
    (&["arch", "manjaro", "endeavouros"], DistroFamily::Arch),
    (
        &["suse", "opensuse", "sles", "opensuse-leap", "opensuse-tumbleweed"],
        DistroFamily::Suse,
    ),
];

fn family_for(id: &str) -> Option<DistroFamily> {
    FAMILY_IDS
        .iter()
        .find(|(ids, _)| ids.contains(&id))
        .map(|(_, family)| family.clone())
}

/// Strip one layer of matching shell quotes from an os-release value
fn unquote(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Split os-release content into its assignments, skipping comments
fn os_release_fields(content: &str) -> HashMap<&str, &str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), unquote(value)))
        .collect()
}

/// Parse /etc/os-release content into DistroInfo
pub fn parse_os_release(content: &str) -> Result<DistroInfo, ProvisionError> {
    let fields = os_release_fields(content);

    let id = fields
        .get("ID")
        .map(|id| id.to_lowercase())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ProvisionError::Detection("os-release has no ID field".to_string()))?;

    let id_like = fields.get("ID_LIKE").copied().unwrap_or_default().to_lowercase();
    let family = family_for(&id)
        .or_else(|| id_like.split_whitespace().find_map(family_for))
        .unwrap_or_else(|| DistroFamily::Unknown(id.clone()));

    let pretty_name = fields
        .get("PRETTY_NAME")
        .or_else(|| fields.get("NAME"))
        .map(|name| name.to_string())
        .unwrap_or_else(|| "Linux".to_string());

    Ok(DistroInfo {
        family,
        id,
        pretty_name,
        version_id: fields.get("VERSION_ID").map(|v| v.to_string()),
    })
}

/// Commands that install the container engine on a distribution family
pub fn engine_install_commands(family: &DistroFamily) -> Result<Vec<&'static str>, ProvisionError> {
    match family {
        DistroFamily::Debian => Ok(vec![
            "sudo apt-get update",
            "sudo apt-get install -y ca-certificates curl gnupg",
            "sudo install -m 0755 -d /etc/apt/keyrings",
            "curl -fsSL https://download.docker.com/linux/$(. /etc/os-release && echo \"$ID\")/gpg | sudo gpg --dearmor --yes -o /etc/apt/keyrings/docker.gpg",
            "sudo chmod a+r /etc/apt/keyrings/docker.gpg",
            "echo \"deb [arch=$(dpkg --print-architecture) signed-by=/etc/apt/keyrings/docker.gpg] https://download.docker.com/linux/$(. /etc/os-release && echo \"$ID\") $(. /etc/os-release && echo \"$VERSION_CODENAME\") stable\" | sudo tee /etc/apt/sources.list.d/docker.list > /dev/null",
            "sudo apt-get update",
            "sudo apt-get install -y docker-ce docker-ce-cli containerd.io",
            "sudo systemctl enable docker",
        ]),

        // Amazon Linux 2 uses yum, 2023 and Fedora use dnf
        DistroFamily::RedHat => Ok(vec![
            "sudo yum install -y docker || sudo dnf install -y docker",
            "sudo systemctl enable docker",
        ]),

        DistroFamily::Alpine => Ok(vec![
            "sudo apk add docker",
            "sudo rc-update add docker boot",
        ]),

        DistroFamily::Arch => Ok(vec![
            "sudo pacman -Sy --noconfirm docker",
            "sudo systemctl enable docker",
        ]),

        DistroFamily::Suse => Ok(vec![
            "sudo zypper install -y docker",
            "sudo systemctl enable docker",
        ]),

        DistroFamily::Unknown(id) => Err(ProvisionError::Unsupported(id.clone())),
    }
}

/// Command that (re)starts the container engine so new settings apply
pub fn engine_restart_command(family: &DistroFamily) -> &'static str {
    match family {
        DistroFamily::Alpine => "sudo service docker restart",
        _ => "sudo systemctl restart docker",
    }
}
