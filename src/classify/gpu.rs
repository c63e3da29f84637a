use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GpuGeneration {
    /// No NVIDIA GPU present
    None,
    /// Turing (GTX 16 / RTX 20 series)
    LegacyGen,
    /// Ampere and newer
    ModernGen,
    /// NVIDIA GPU present but not in any known group
    UnknownGen,
}

/// Chip codenames as lspci prints them (`TU104GLM`, `GA104M`). Checked
/// before marketing names.
const CHIP_TABLE: &[(GpuGeneration, &[&str])] = &[
    (GpuGeneration::ModernGen, &["gb20", "ad10", "ga10"]),
    (GpuGeneration::LegacyGen, &["tu10", "tu11"]),
];

/// Marketing names, for descriptors without a chip codename. Quadro RTX
/// 3000/4000/5000 are Turing parts whose names overlap `rtx 30`/`rtx 40`.
const NAME_TABLE: &[(GpuGeneration, &[&str])] = &[
    (
        GpuGeneration::LegacyGen,
        &["quadro rtx 3000", "quadro rtx 4000", "quadro rtx 5000"],
    ),
    (
        GpuGeneration::ModernGen,
        &[
            "rtx 50",
            "rtx 40",
            "rtx 30",
            "rtx a",
            "ada generation",
        ],
    ),
    (
        GpuGeneration::LegacyGen,
        &["rtx 20", "gtx 16", "mx450", "mx550", "quadro t"],
    ),
];

/// First group, in table order, with a pattern found in any descriptor.
fn match_table(
    table: &[(GpuGeneration, &[&str])],
    lowered: &[String],
) -> Option<GpuGeneration> {
    table
        .iter()
        .find(|(_, patterns)| {
            lowered
                .iter()
                .any(|d| patterns.iter().any(|p| d.contains(p)))
        })
        .map(|(generation, _)| *generation)
}

/// Classify a set of descriptors. Chip codenames are tried first, then
/// marketing names. Within a table, groups are tried in order across all
/// descriptors, so the highest-priority group present wins regardless of the
/// order the devices were listed in.
pub fn classify(descriptors: &[String]) -> GpuGeneration {
    if descriptors.is_empty() {
        return GpuGeneration::None;
    }

    let lowered: Vec<String> = descriptors.iter().map(|d| d.to_lowercase()).collect();

    match_table(CHIP_TABLE, &lowered)
        .or_else(|| match_table(NAME_TABLE, &lowered))
        .unwrap_or(GpuGeneration::UnknownGen)
}
