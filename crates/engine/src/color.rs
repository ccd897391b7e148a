//! Console color parsing for the clrtx/clrbg commands.

/// The eight base console colors, in index order. The bright variants are
/// the same indices with bit 3 set.
const COLOR_NAMES: [&str; 8] = [
    "black", "blue", "green", "cyan", "red", "magenta", "yellow", "white",
];

/// Channel level that flips a color bit on.
const CHANNEL_THRESHOLD: u8 = 128;
/// Any channel past this sets the brightness bit.
const BRIGHT_THRESHOLD: u8 = 200;

/// Parse a color argument: a known name, or `#RRGGBB` quantized to the
/// nearest of the 16 console color cells by dominant channel. Returns
/// `None` for anything else.
pub fn parse_color(input: &str) -> Option<u8> {
    let input = input.trim();

    let lower = input.to_ascii_lowercase();
    if let Some(idx) = COLOR_NAMES.iter().position(|&n| n == lower) {
        return Some(idx as u8);
    }

    let hex = input.strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    // Console layout: bit 0 = blue, bit 1 = green, bit 2 = red, bit 3 = bright.
    let mut idx = 0u8;
    if b >= CHANNEL_THRESHOLD {
        idx |= 0b001;
    }
    if g >= CHANNEL_THRESHOLD {
        idx |= 0b010;
    }
    if r >= CHANNEL_THRESHOLD {
        idx |= 0b100;
    }
    if r > BRIGHT_THRESHOLD || g > BRIGHT_THRESHOLD || b > BRIGHT_THRESHOLD {
        idx |= 0b1000;
    }
    Some(idx)
}

/// Name or hex tag for a stored index, for the status line.
pub fn color_name(index: u8) -> String {
    let base = COLOR_NAMES[(index & 0b111) as usize];
    if index & 0b1000 != 0 {
        format!("bright {}", base)
    } else {
        base.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_map_to_indices() {
        assert_eq!(parse_color("black"), Some(0));
        assert_eq!(parse_color("blue"), Some(1));
        assert_eq!(parse_color("green"), Some(2));
        assert_eq!(parse_color("cyan"), Some(3));
        assert_eq!(parse_color("red"), Some(4));
        assert_eq!(parse_color("magenta"), Some(5));
        assert_eq!(parse_color("yellow"), Some(6));
        assert_eq!(parse_color("white"), Some(7));
        assert_eq!(parse_color("RED"), Some(4));
        assert_eq!(parse_color(" white "), Some(7));
    }

    #[test]
    fn hex_quantizes_by_dominant_channel() {
        assert_eq!(parse_color("#000000"), Some(0));
        assert_eq!(parse_color("#800000"), Some(4));
        assert_eq!(parse_color("#008000"), Some(2));
        assert_eq!(parse_color("#000080"), Some(1));
        assert_eq!(parse_color("#808080"), Some(7));
        // Past the bright threshold the brightness bit comes on.
        assert_eq!(parse_color("#FF0000"), Some(12));
        assert_eq!(parse_color("#FFFF00"), Some(14));
        assert_eq!(parse_color("#FFFFFF"), Some(15));
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert_eq!(parse_color("crimson"), None);
        assert_eq!(parse_color("#12345"), None);
        assert_eq!(parse_color("#1234567"), None);
        assert_eq!(parse_color("#GGGGGG"), None);
        assert_eq!(parse_color(""), None);
    }

    #[test]
    fn color_names_round_trip() {
        assert_eq!(color_name(4), "red");
        assert_eq!(color_name(12), "bright red");
    }
}
