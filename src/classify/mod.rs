pub mod gpu;
pub mod product;

use crate::detect::HardwareFacts;
use serde::Serialize;

pub use gpu::GpuGeneration;

/// Vendor token matched against the DMI vendor string when none is configured.
pub const DEFAULT_VENDOR_TOKEN: &str = "asus";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VendorClass {
    NoVendorMatch,
    Asus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HardwareClass {
    pub vendor: VendorClass,
    pub gpu: GpuGeneration,
    pub product_year: Option<u16>,
}

impl HardwareClass {
    pub fn vendor_matched(&self) -> bool {
        self.vendor != VendorClass::NoVendorMatch
    }

    /// Model-year note for vendor-matched machines, if any applies.
    pub fn advisory(&self) -> Option<&'static str> {
        if !self.vendor_matched() {
            return None;
        }
        self.product_year.and_then(product::year_advisory)
    }
}

pub fn classify(facts: &HardwareFacts, vendor_token: &str) -> HardwareClass {
    HardwareClass {
        vendor: classify_vendor(&facts.vendor_string, vendor_token),
        gpu: gpu::classify(&facts.gpu_descriptors),
        product_year: product::product_year(&facts.product_name),
    }
}

fn classify_vendor(vendor_string: &str, token: &str) -> VendorClass {
    let token = token.trim().to_lowercase();
    if !token.is_empty() && vendor_string.to_lowercase().contains(&token) {
        VendorClass::Asus
    } else {
        VendorClass::NoVendorMatch
    }
}
