use plotters::style::RGBColor;

/// Blue through white to red, for signed velocities.
const DIVERGING: &[(f64, (u8, u8, u8))] = &[
    (0.0, (0, 0, 77)),
    (0.25, (0, 0, 255)),
    (0.5, (255, 255, 255)),
    (0.75, (255, 0, 0)),
    (1.0, (128, 0, 0)),
];

/// Dark purple through orange to yellow.
const SEQUENTIAL: &[(f64, (u8, u8, u8))] = &[
    (0.0, (13, 8, 135)),
    (0.25, (126, 3, 168)),
    (0.5, (204, 71, 120)),
    (0.75, (248, 149, 64)),
    (1.0, (240, 249, 33)),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Palette {
    Diverging,
    Sequential,
}

impl Palette {
    fn stops(self) -> &'static [(f64, (u8, u8, u8))] {
        match self {
            Palette::Diverging => DIVERGING,
            Palette::Sequential => SEQUENTIAL,
        }
    }
}

/// Linear mapping from a value range onto a palette; values outside the
/// range are clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    pub min: f64,
    pub max: f64,
    pub palette: Palette,
}

impl ColorScale {
    /// Builds a scale, widening degenerate or non-finite ranges.
    pub fn new(min: f64, max: f64, palette: Palette) -> Self {
        let (min, max) = match (min.is_finite(), max.is_finite()) {
            (true, true) if max > min => (min, max),
            (true, true) => (min - 1.0, min + 1.0),
            _ => (-1.0, 1.0),
        };
        Self { min, max, palette }
    }

    pub fn color(&self, value: f64) -> RGBColor {
        let ratio = (value - self.min) / (self.max - self.min);
        let t = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
        let stops = self.palette.stops();
        let upper = stops
            .iter()
            .position(|(at, _)| *at >= t)
            .unwrap_or(stops.len() - 1)
            .max(1);
        let (t0, c0) = stops[upper - 1];
        let (t1, c1) = stops[upper];
        let f = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
        let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * f).round() as u8;
        RGBColor(lerp(c0.0, c1.0), lerp(c0.1, c1.1), lerp(c0.2, c1.2))
    }
}
