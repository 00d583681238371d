use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// Audience phrase used when an id is not one of the known groups.
pub const FALLBACK_AUDIENCE_DESCRIPTION: &str = "ชุมชนทั่วไป";

/// Community audience a proposal is designed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetGroup {
    Children,
    School,
    Elderly,
    Hospital,
    Public,
    Online,
    University,
}

/// Display and prompt metadata for one target group.
#[derive(Debug, Clone, Serialize)]
pub struct TargetGroupPreset {
    pub group: TargetGroup,
    pub id: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
}

pub const TARGET_GROUP_PRESETS: &[TargetGroupPreset] = &[
    TargetGroupPreset {
        group: TargetGroup::Children,
        id: "children",
        label: "เด็กเล็ก/อนุบาล",
        icon: "👶",
        description: "เด็กเล็กและวัยอนุบาล",
    },
    TargetGroupPreset {
        group: TargetGroup::School,
        id: "school",
        label: "นักเรียนมัธยม",
        icon: "🎒",
        description: "นักเรียนมัธยมและวัยรุ่น",
    },
    TargetGroupPreset {
        group: TargetGroup::Elderly,
        id: "elderly",
        label: "ผู้สูงอายุ",
        icon: "👴",
        description: "ผู้สูงอายุในศูนย์ดูแลหรือชุมชน",
    },
    TargetGroupPreset {
        group: TargetGroup::Hospital,
        id: "hospital",
        label: "ผู้ป่วยในโรงพยาบาล",
        icon: "🏥",
        description: "ผู้ป่วยและบุคลากรทางการแพทย์ในโรงพยาบาล",
    },
    TargetGroupPreset {
        group: TargetGroup::Public,
        id: "public",
        label: "ชุมชนทั่วไป/สวนสาธารณะ",
        icon: "🌳",
        description: "บุคคลทั่วไปในพื้นที่สาธารณะ",
    },
    TargetGroupPreset {
        group: TargetGroup::Online,
        id: "online",
        label: "ชุมชนออนไลน์",
        icon: "💻",
        description: "ผู้ใช้งานสื่อสังคมออนไลน์",
    },
    TargetGroupPreset {
        group: TargetGroup::University,
        id: "university",
        label: "นักศึกษามหาวิทยาลัย",
        icon: "🎓",
        description: "นักศึกษาและบุคลากรในมหาวิทยาลัย",
    },
];

impl TargetGroup {
    /// Groups in display order.
    pub const ALL: [TargetGroup; 7] = [
        TargetGroup::Children,
        TargetGroup::School,
        TargetGroup::Elderly,
        TargetGroup::Hospital,
        TargetGroup::Public,
        TargetGroup::Online,
        TargetGroup::University,
    ];

    pub fn preset(self) -> &'static TargetGroupPreset {
        // The table holds one entry per variant, in variant order.
        &TARGET_GROUP_PRESETS[self as usize]
    }

    pub fn id(self) -> &'static str {
        self.preset().id
    }

    pub fn label(self) -> &'static str {
        self.preset().label
    }

    pub fn icon(self) -> &'static str {
        self.preset().icon
    }

    /// Expanded audience phrase for prompts.
    pub fn description(self) -> &'static str {
        self.preset().description
    }
}

/// Maps a raw group id to its prompt phrase, falling back to the general community.
pub fn audience_description(raw_id: &str) -> &'static str {
    TARGET_GROUP_PRESETS
        .iter()
        .find(|preset| preset.id == raw_id)
        .map(|preset| preset.description)
        .unwrap_or(FALLBACK_AUDIENCE_DESCRIPTION)
}

impl fmt::Display for TargetGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for TargetGroup {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        TARGET_GROUP_PRESETS
            .iter()
            .find(|preset| preset.id == needle)
            .map(|preset| preset.group)
            .ok_or_else(|| anyhow!("unknown target group: {s}"))
    }
}
