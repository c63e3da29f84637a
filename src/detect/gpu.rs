/// Keep only NVIDIA devices; other display adapters are outside both domains.
pub fn nvidia_descriptors(devices: Vec<String>) -> Vec<String> {
    devices
        .into_iter()
        .filter(|d| d.to_ascii_lowercase().contains("nvidia"))
        .collect()
}
