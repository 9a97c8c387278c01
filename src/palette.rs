//! Terminal colors cycled across pool entries so output from concurrently
//! running dispatcher instances can be told apart.

/// A terminal foreground color with its ANSI select sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    name: &'static str,
    code: u8,
}

/// Sequence resetting the foreground to the terminal default.
pub const RESET: &str = "\x1b[0m";

const COLORS: &[Color] = &[
    Color { name: "black", code: 30 },
    Color { name: "red", code: 31 },
    Color { name: "green", code: 32 },
    Color { name: "yellow", code: 33 },
    Color { name: "blue", code: 34 },
    Color { name: "magenta", code: 35 },
    Color { name: "cyan", code: 36 },
    Color { name: "white", code: 37 },
];

impl Color {
    pub fn by_name(name: &str) -> Option<Color> {
        COLORS.iter().copied().find(|c| c.name == name)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// ANSI escape selecting this foreground color.
    pub fn select(&self) -> String {
        format!("\x1b[{}m", self.code)
    }
}

/// Ordered list of colors, cycled independently of pool size.
#[derive(Debug, Clone, Default)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    /// Parse a whitespace-separated list of color names. Unknown names are
    /// dropped with a warning; an empty result disables colorization.
    pub fn parse(spec: &str) -> Self {
        let mut colors = Vec::new();
        for name in spec.split_whitespace() {
            match Color::by_name(name) {
                Some(color) => colors.push(color),
                None => tracing::warn!(name, "Unknown color name in palette, ignoring"),
            }
        }
        Self { colors }
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Color for the nth pool entry visited; wraps modulo palette length.
    /// An empty palette yields no color for every index.
    pub fn color_at(&self, index: usize) -> Option<Color> {
        if self.colors.is_empty() {
            None
        } else {
            Some(self.colors[index % self.colors.len()])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_names() {
        let palette = Palette::parse("red green blue");
        assert_eq!(palette.len(), 3);
        assert_eq!(palette.color_at(0).unwrap().name(), "red");
        assert_eq!(palette.color_at(2).unwrap().name(), "blue");
    }

    #[test]
    fn unknown_names_dropped() {
        let palette = Palette::parse("red chartreuse green");
        assert_eq!(palette.len(), 2);
        assert_eq!(palette.color_at(1).unwrap().name(), "green");
    }

    #[test]
    fn index_wraps_modulo_length() {
        let palette = Palette::parse("red green blue");
        assert_eq!(palette.color_at(6).unwrap().name(), "red");
        assert_eq!(palette.color_at(7).unwrap().name(), "green");
    }

    #[test]
    fn empty_palette_never_colorizes() {
        let palette = Palette::parse("");
        assert!(palette.is_empty());
        assert!(palette.color_at(0).is_none());
        assert!(palette.color_at(41).is_none());
    }
}
