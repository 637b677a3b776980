use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A laptop as exposed by the `v_laptops_expanded` view (component names and
/// benchmark scores already joined in).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LaptopRow {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub purchase_url: Option<String>,
    /// Listed price. The column name is historical; values are in the shop currency.
    #[serde(default)]
    pub price_eur: Option<f64>,
    #[serde(default)]
    pub ssd_size_gb: Option<f64>,
    #[serde(default)]
    pub cpu_name: Option<String>,
    #[serde(default)]
    pub cpu_score: Option<f64>,
    #[serde(default)]
    pub ram_gb: Option<f64>,
    #[serde(default)]
    pub gpu_name: Option<String>,
    #[serde(default)]
    pub gpu_score: Option<f64>,
}

impl LaptopRow {
    pub fn cpu(&self) -> f64 {
        self.cpu_score.unwrap_or(0.0)
    }

    pub fn ram(&self) -> f64 {
        self.ram_gb.unwrap_or(0.0)
    }

    pub fn gpu(&self) -> f64 {
        self.gpu_score.unwrap_or(0.0)
    }
}

/// Category column of a program: absent, a single tag, or a list of tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum CategoryTags {
    One(String),
    Many(Vec<String>),
}

impl CategoryTags {
    /// Case-insensitive substring match of `category_id` against any tag.
    pub fn mentions(&self, category_id: &str) -> bool {
        let needle = category_id.to_lowercase();
        match self {
            Self::One(tag) => tag.to_lowercase().contains(&needle),
            Self::Many(tags) => tags.iter().any(|t| t.to_lowercase().contains(&needle)),
        }
    }
}

/// Hardware requirements of one program or game (`v_programs_requirements`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ProgramReq {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub category: Option<CategoryTags>,
    #[serde(default)]
    pub cpu_min_score: Option<f64>,
    #[serde(default)]
    pub cpu_rec_score: Option<f64>,
    #[serde(default)]
    pub ram_min_gb: Option<f64>,
    #[serde(default)]
    pub ram_rec_gb: Option<f64>,
    #[serde(default)]
    pub gpu_min_score: Option<f64>,
    #[serde(default)]
    pub gpu_rec_score: Option<f64>,
}

impl ProgramReq {
    pub fn belongs_to(&self, category_id: &str) -> bool {
        self.category
            .as_ref()
            .is_some_and(|tags| tags.mentions(category_id))
    }

    pub fn recommended(&self) -> Requirement {
        Requirement {
            cpu: self.cpu_rec_score.unwrap_or(0.0),
            ram: self.ram_rec_gb.unwrap_or(0.0),
            gpu: self.gpu_rec_score.unwrap_or(0.0),
        }
    }

    pub fn minimum(&self) -> Requirement {
        Requirement {
            cpu: self.cpu_min_score.unwrap_or(0.0),
            ram: self.ram_min_gb.unwrap_or(0.0),
            gpu: self.gpu_min_score.unwrap_or(0.0),
        }
    }
}

/// Aggregate hardware target a laptop is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Requirement {
    pub cpu: f64,
    pub ram: f64,
    pub gpu: f64,
}

impl Requirement {
    /// True when every raw value of `laptop` meets or exceeds this target.
    pub fn satisfied_by(&self, laptop: &LaptopRow) -> bool {
        laptop.cpu() >= self.cpu && laptop.ram() >= self.ram && laptop.gpu() >= self.gpu
    }
}

/// `{id, name}` pair from the cpus/gpus/rams/brands lookup tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LookupItem {
    pub id: i64,
    pub name: String,
}

/// A usage category offered in the first wizard step.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct Category {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub subitems: &'static [&'static str],
}

pub const CATEGORIES: &[Category] = &[
    Category {
        id: "general",
        name: "Everyday use",
        icon: "🏠",
        subitems: &[
            "Web browsing and social media",
            "Movies and series",
            "Light office and home tasks",
            "Email and messengers",
        ],
    },
    Category {
        id: "office",
        name: "Office and business",
        icon: "🏢",
        subitems: &[
            "Word processing, spreadsheets, presentations",
            "Project and document management",
            "ERP and CRM software",
            "Online meetings (Zoom, Teams)",
        ],
    },
    Category {
        id: "education",
        name: "Study and education",
        icon: "🎓",
        subitems: &[
            "Research and paper writing",
            "Educational and simulation software",
            "Online classes",
            "Language practice and learning apps",
        ],
    },
    Category {
        id: "programming",
        name: "Programming and software development",
        icon: "💻",
        subitems: &[
            "Web development (front-end, back-end)",
            "Mobile app development",
            "Desktop programming",
            "Game development",
            "AI and machine learning",
        ],
    },
    Category {
        id: "graphics",
        name: "Graphic design",
        icon: "🎨",
        subitems: &[
            "2D design (Photoshop, Illustrator)",
            "3D design (Blender, Maya, 3ds Max)",
            "UI/UX design",
        ],
    },
    Category {
        id: "video",
        name: "Video editing and production",
        icon: "🎬",
        subitems: &[
            "Video editing (Premiere, DaVinci Resolve, Final Cut)",
            "Visual effects (After Effects, Nuke)",
            "Live streaming and recording",
        ],
    },
    Category {
        id: "music",
        name: "Music and audio production",
        icon: "🎵",
        subitems: &[
            "Digital composition (FL Studio, Ableton, Logic Pro)",
            "Recording and audio editing (Audition, Pro Tools)",
            "Mixing and mastering",
        ],
    },
    Category {
        id: "engineering",
        name: "Engineering",
        icon: "🛠️",
        subitems: &[
            "CAD and industrial modelling (AutoCAD, SolidWorks)",
            "Engineering simulation (MATLAB, ANSYS)",
            "Architecture software (Revit, SketchUp)",
        ],
    },
    Category {
        id: "data",
        name: "Data science and research",
        icon: "📊",
        subitems: &[
            "Data analysis (advanced Excel, Power BI, Tableau)",
            "Statistics (SPSS, R, SAS)",
            "Machine learning (TensorFlow, PyTorch)",
        ],
    },
    Category {
        id: "gaming",
        name: "Gaming",
        icon: "🎮",
        subitems: &[
            "AAA titles with heavy graphics",
            "Competitive online games (esports)",
            "Simulators (flight, racing)",
        ],
    },
    Category {
        id: "specialized",
        name: "Other specialised work",
        icon: "🧪",
        subitems: &[
            "Security and penetration testing (Kali Linux, Burp Suite)",
            "Blockchain and cryptography",
            "Circuit design (Proteus, Altium Designer)",
            "IoT and robotics",
        ],
    },
];

pub fn is_known_category(id: &str) -> bool {
    CATEGORIES.iter().any(|c| c.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_category_accepts_string_or_list() {
        let single: ProgramReq =
            serde_json::from_str(r#"{"id":1,"name":"Blender","category":"Graphics"}"#).unwrap();
        assert!(single.belongs_to("graphics"));
        assert!(!single.belongs_to("gaming"));

        let many: ProgramReq = serde_json::from_str(
            r#"{"id":2,"name":"Unity","category":["programming","Gaming"]}"#,
        )
        .unwrap();
        assert!(many.belongs_to("gaming"));

        let none: ProgramReq = serde_json::from_str(r#"{"id":3,"name":"x"}"#).unwrap();
        assert!(!none.belongs_to("general"));
    }

    #[test]
    fn missing_scores_read_as_zero() {
        let laptop: LaptopRow = serde_json::from_str(r#"{"id":7,"name":"Bare"}"#).unwrap();
        assert_eq!(laptop.cpu(), 0.0);
        assert_eq!(laptop.ram(), 0.0);
        assert_eq!(laptop.gpu(), 0.0);
        assert!(Requirement::default().satisfied_by(&laptop));
    }

    #[test]
    fn category_catalogue_has_unique_ids() {
        let mut ids: Vec<&str> = CATEGORIES.iter().map(|c| c.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), CATEGORIES.len());
        assert!(is_known_category("gaming"));
        assert!(!is_known_category("cooking"));
    }
}
