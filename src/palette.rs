use plotters::style::RGBColor;
use plotters::style::{BLACK, BLUE, CYAN, GREEN, MAGENTA, RED, WHITE, YELLOW};
use tracing::warn;

/// Viridis anchor colors at evenly spaced positions in [0, 1]
const VIRIDIS_STOPS: [(u8, u8, u8); 9] = [
    (68, 1, 84),
    (71, 45, 123),
    (59, 82, 139),
    (44, 114, 142),
    (33, 145, 140),
    (40, 174, 128),
    (94, 201, 98),
    (173, 220, 48),
    (253, 231, 37),
];

pub const DEFAULT_COLOR: RGBColor = BLUE;

/// Parse a color name or `#rrggbb` hex string
pub fn parse_color(name: &str) -> Option<RGBColor> {
    let color = match name.to_ascii_lowercase().as_str() {
        "red" => RED,
        "green" => GREEN,
        "blue" => BLUE,
        "black" => BLACK,
        "yellow" => YELLOW,
        "cyan" => CYAN,
        "magenta" => MAGENTA,
        "white" => WHITE,
        "dodgerblue" => RGBColor(30, 144, 255),
        "hotpink" => RGBColor(255, 105, 180),
        "gray" | "grey" => RGBColor(128, 128, 128),
        "orange" => RGBColor(255, 165, 0),
        hex if hex.starts_with('#') && hex.len() == 7 && hex.is_ascii() => {
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            RGBColor(channel(1)?, channel(3)?, channel(5)?)
        }
        _ => return None,
    };
    Some(color)
}

/// Sample the viridis ramp at position `t` in [0, 1]
pub fn viridis_at(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let scaled = t * (VIRIDIS_STOPS.len() - 1) as f64;
    let lo = scaled.floor() as usize;
    let hi = (lo + 1).min(VIRIDIS_STOPS.len() - 1);
    let frac = scaled - lo as f64;
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    let (a, b) = (VIRIDIS_STOPS[lo], VIRIDIS_STOPS[hi]);
    RGBColor(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}

/// `n` viridis colors, sampled away from both ends of the ramp
pub fn viridis(n: usize) -> Vec<RGBColor> {
    (1..=n)
        .map(|i| viridis_at(i as f64 / (n + 1) as f64))
        .collect()
}

/// Resolve one color per series entry
///
/// Explicit colors are cycled; otherwise a named palette is sampled;
/// otherwise every entry gets the default color.
pub fn series_colors(colors: &[String], palette: Option<&str>, n: usize) -> Vec<RGBColor> {
    if !colors.is_empty() {
        let parsed: Vec<RGBColor> = colors
            .iter()
            .map(|c| {
                parse_color(c).unwrap_or_else(|| {
                    warn!("Unknown color '{}', using default", c);
                    DEFAULT_COLOR
                })
            })
            .collect();
        return (0..n).map(|i| parsed[i % parsed.len()]).collect();
    }

    match palette {
        Some(name) if name.eq_ignore_ascii_case("viridis") => viridis(n),
        Some(name) => {
            warn!("Unknown palette '{}', using default color", name);
            vec![DEFAULT_COLOR; n]
        }
        None => vec![DEFAULT_COLOR; n],
    }
}
