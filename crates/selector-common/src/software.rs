/// Standalone software-requirements browser: text-based requirement sheets,
/// filtering and a rough compatibility check against a user's machine.
use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

static RAM_GB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*GB").expect("valid regex"));
static FIRST_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)").expect("valid regex"));

/// Published requirements of one program, as free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SoftwareSpec {
    pub id: i64,
    pub name: String,
    pub version: String,
    pub os: Vec<String>,
    pub cpu_min: String,
    pub cpu_rec: String,
    pub ram_min: String,
    pub ram_rec: String,
    pub gpu_min: String,
    pub gpu_rec: String,
    pub disk_space: String,
    pub disk_type: String,
    pub is_free: bool,
    pub is_open_source: bool,
}

/// Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SoftwareFilter {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub cpu: String,
    #[serde(default)]
    pub gpu: String,
    /// Upper bound such as "8 GB" on the minimum RAM requirement.
    #[serde(default)]
    pub ram: String,
    #[serde(default)]
    pub disk_type: String,
    #[serde(default)]
    pub free_only: bool,
    #[serde(default)]
    pub open_source_only: bool,
}

/// The machine a user wants to check programs against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UserMachine {
    pub ram_gb: Option<u32>,
    pub cpu_cores: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BrowsedSoftware {
    #[serde(flatten)]
    pub spec: SoftwareSpec,
    /// Present when the caller supplied a machine to check against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compatible: Option<bool>,
}

/// First `<n> GB` figure in `text`, 0 when there is none.
pub fn parse_ram_gb(text: &str) -> u32 {
    RAM_GB_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl SoftwareFilter {
    pub fn matches(&self, spec: &SoftwareSpec) -> bool {
        let search = contains_ci(&spec.name, &self.search);
        let os = self.os.is_empty() || spec.os.iter().any(|o| contains_ci(o, &self.os));
        let cpu = self.cpu.is_empty() || contains_ci(&spec.cpu_min, &self.cpu);
        let gpu = self.gpu.is_empty() || contains_ci(&spec.gpu_min, &self.gpu);
        let disk = self.disk_type.is_empty()
            || (!spec.disk_type.is_empty()
                && spec.disk_type.to_lowercase() == self.disk_type.to_lowercase());
        let ram = self.ram.is_empty() || parse_ram_gb(&spec.ram_min) <= parse_ram_gb(&self.ram);
        let tags = (!self.free_only || spec.is_free)
            && (!self.open_source_only || spec.is_open_source);

        search && os && cpu && gpu && disk && ram && tags
    }

    pub fn apply<'a>(&self, specs: &'a [SoftwareSpec]) -> Vec<&'a SoftwareSpec> {
        specs.iter().filter(|s| self.matches(s)).collect()
    }
}

/// RAM against the minimum, and core count against the first number in the
/// minimum CPU text ("Intel Core i5" reads as 5, "1.6 GHz Dual Core" as 1).
/// A missing or zero user value is never compatible.
pub fn check_compatibility(spec: &SoftwareSpec, machine: UserMachine) -> bool {
    let (Some(ram), Some(cores)) = (machine.ram_gb, machine.cpu_cores) else {
        return false;
    };
    if ram == 0 || cores == 0 {
        return false;
    }
    let min_ram = parse_ram_gb(&spec.ram_min);
    let min_cores = FIRST_NUMBER_RE
        .captures(&spec.cpu_min)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .unwrap_or(1);
    ram >= min_ram && cores >= min_cores
}

/// Filter `specs` and annotate each hit with its compatibility when a machine is given.
pub fn browse(
    specs: &[SoftwareSpec],
    filter: &SoftwareFilter,
    machine: Option<UserMachine>,
) -> Vec<BrowsedSoftware> {
    filter
        .apply(specs)
        .into_iter()
        .map(|spec| BrowsedSoftware {
            spec: spec.clone(),
            compatible: machine.map(|m| check_compatibility(spec, m)),
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn spec(
    id: i64,
    name: &str,
    version: &str,
    os: &[&str],
    cpu: (&str, &str),
    ram: (&str, &str),
    gpu: (&str, &str),
    disk: (&str, &str),
    is_free: bool,
    is_open_source: bool,
) -> SoftwareSpec {
    SoftwareSpec {
        id,
        name: name.to_string(),
        version: version.to_string(),
        os: os.iter().map(|s| s.to_string()).collect(),
        cpu_min: cpu.0.to_string(),
        cpu_rec: cpu.1.to_string(),
        ram_min: ram.0.to_string(),
        ram_rec: ram.1.to_string(),
        gpu_min: gpu.0.to_string(),
        gpu_rec: gpu.1.to_string(),
        disk_space: disk.0.to_string(),
        disk_type: disk.1.to_string(),
        is_free,
        is_open_source,
    }
}

/// Reference sheets served by the browser.
pub fn reference_catalog() -> Vec<SoftwareSpec> {
    vec![
        spec(
            1,
            "Photoshop",
            "2025",
            &["Windows 10", "11", "macOS Monterey"],
            ("Intel Core i3", "Intel Core i5"),
            ("4 GB", "8 GB"),
            ("NVIDIA GTX 1050", "NVIDIA GTX 1060"),
            ("5 GB", "SSD"),
            false,
            false,
        ),
        spec(
            2,
            "Blender",
            "3.6",
            &["Windows 10", "11", "macOS Monterey", "Linux"],
            ("Intel Core i3", "Intel Core i7"),
            ("8 GB", "16 GB"),
            ("NVIDIA GTX 760", "NVIDIA RTX 2060"),
            ("500 MB", "HDD"),
            true,
            true,
        ),
        spec(
            3,
            "VS Code",
            "1.80",
            &["Windows 10", "11", "macOS Monterey", "Linux"],
            ("1.6 GHz Dual Core", "2.0 GHz Quad Core"),
            ("2 GB", "4 GB"),
            ("Intel HD", "Intel UHD"),
            ("200 MB", "SSD"),
            true,
            true,
        ),
        spec(
            4,
            "Unity",
            "2023.2",
            &["Windows 10", "11", "macOS Monterey"],
            ("Intel Core i5", "Intel Core i7"),
            ("8 GB", "16 GB"),
            ("NVIDIA GeForce GT 740", "NVIDIA GeForce GTX 1060"),
            ("10 GB", "SSD"),
            true,
            false,
        ),
        spec(
            5,
            "AutoCAD",
            "2024",
            &["Windows 10", "11", "macOS Monterey"],
            ("Intel Core i3", "Intel Core i7"),
            ("8 GB", "16 GB"),
            ("1 GB GPU with 29 GB/s Bandwidth", "8 GB GPU with 106 GB/s Bandwidth"),
            ("10 GB", "SSD"),
            false,
            false,
        ),
    ]
}
