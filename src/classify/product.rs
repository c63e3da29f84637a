/// First standalone 4-digit `20xx` token in a product name.
///
/// A token is a maximal run of ASCII digits, so model numbers such as
/// `G5020` or `120204` never yield a year.
pub fn product_year(product_name: &str) -> Option<u16> {
    product_name
        .split(|c: char| !c.is_ascii_digit())
        .find(|token| token.len() == 4 && token.starts_with("20"))
        .and_then(|token| token.parse().ok())
}

/// Model-year buckets with known caveats.
pub fn year_advisory(year: u16) -> Option<&'static str> {
    match year {
        0..=2020 => Some(
            "Models from 2020 and earlier lack a hardware MUX switch; \
             supergfxctl supports Hybrid and Integrated modes only.",
        ),
        2021..=2022 => None,
        _ => Some(
            "Models from 2023 onward need kernel 6.1 or newer for asus-wmi \
             platform profiles and keyboard backlight control.",
        ),
    }
}
