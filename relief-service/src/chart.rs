//! Profile charts as static chart image URLs.
//!
//! The service does not draw anything itself. [`ChartRenderer`] turns a
//! profile's elevation range and points into something a client can display;
//! the shipped [`StaticChartUrl`] builds a URL for a static image chart API
//! using its "extended" text encoding.

use relief::DownsampledPoint;

/// Miles per kilometre.
const MILES_PER_KM: f64 = 0.6213;

/// Feet per metre.
const FEET_PER_METRE: f64 = 3.2808;

/// Symbols of the extended encoding, in value order.
const EXTENDED_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-.";

/// Encoding of a value the chart should skip.
const MISSING: &str = "__";

/// What a renderer gets to see of a profile.
#[derive(Debug, Clone, Copy)]
pub struct ChartInput<'a> {
    pub min_elevation: i32,
    pub max_elevation: i32,
    pub distance_km: f64,
    pub points: &'a [DownsampledPoint],
}

/// Turns a profile into a chart reference.
pub trait ChartRenderer: Send + Sync {
    fn render(&self, input: &ChartInput<'_>) -> String;
}

/// Encode `value` within `[min, max]` as two characters of the extended
/// encoding (0 to 4095).
///
/// Values outside the range, `max` itself and degenerate ranges encode as
/// `__`.
pub fn extended_encode(value: f64, min: f64, max: f64) -> String {
    if !(min <= value && value <= max) || min == max {
        return MISSING.to_string();
    }

    let scaled = (value - min) * 4096.0 / (max - min).abs();
    let high = (scaled / 64.0).floor() as usize;
    let low = (scaled % 64.0).floor() as usize;

    match (EXTENDED_ALPHABET.get(high), EXTENDED_ALPHABET.get(low)) {
        (Some(&h), Some(&l)) => [h as char, l as char].iter().collect(),
        _ => MISSING.to_string(),
    }
}

/// Tick interval giving at least `min_ticks` ticks over `range`.
///
/// Starts from the power of ten at or below `range` and refines by factors
/// of 5 and 2 alternately, so intervals run 10, 2, 1, 0.2, 0.1, ...
pub fn axis_step(range: f64, min_ticks: f64) -> f64 {
    if range == 0.0 {
        return 0.0005;
    }

    let mut interval = 10f64.powf(range.log10().floor());
    let mut by_two = false;
    while range / interval < min_ticks {
        interval /= if by_two { 2.0 } else { 5.0 };
        by_two = !by_two;
    }
    interval
}

/// Labels and positions (percent of the axis) for an integer axis.
fn axis_labels(min: i64, max: i64, inclusive: bool) -> (Vec<i64>, Vec<i64>) {
    let scale = (max - min).max(1);
    let interval = (axis_step(scale as f64, 3.0).round() as i64).max(1);
    let end = if inclusive { max + 1 } else { max };

    let mut labels = Vec::new();
    let mut positions = Vec::new();
    let mut tick = min.div_euclid(interval) * interval;
    while tick < end {
        if tick > min + interval / 3 {
            labels.push(tick);
            positions.push((100.0 * (tick - min) as f64 / scale as f64).round() as i64);
        }
        tick += interval;
    }
    (labels, positions)
}

fn join<T: std::fmt::Display>(values: &[T], prefix: &str) -> String {
    values.iter().map(|v| format!("{prefix}{v}")).collect()
}

/// Line chart URL in the static image chart API format.
#[derive(Debug, Clone)]
pub struct StaticChartUrl {
    pub base_url: String,
    pub width: u32,
    pub height: u32,
}

impl Default for StaticChartUrl {
    fn default() -> Self {
        Self {
            base_url: "http://chart.apis.google.com/chart".to_string(),
            width: 600,
            height: 300,
        }
    }
}

impl StaticChartUrl {
    const TERRAIN: &'static str = "009900";
    const EARTH: &'static str = "000000";
    const AXES: &'static str = "000000";
    const BACKGROUND: &'static str = "CCCCCC";
    const SKY_TOP: &'static str = "336699";
    const SKY_BOTTOM: &'static str = "6699CC";
    const FONT_SIZE: u32 = 10;
    const TICK_LENGTH: u32 = 6;

    /// Data series: terrain, then curvature if present, then a flat base line.
    fn data(input: &ChartInput<'_>, min: f64, max: f64, with_curvature: bool) -> String {
        let encode = |v: i32| extended_encode(f64::from(v).max(min), min, max);

        let mut series: Vec<String> = vec![input.points.iter().map(|p| encode(p.height)).collect()];
        if with_curvature {
            series.push(
                input
                    .points
                    .iter()
                    .map(|p| encode(p.curvature_height.unwrap_or_default()))
                    .collect(),
            );
        }
        series.push(extended_encode(min, min, max).repeat(2));
        series.join(",")
    }
}

impl ChartRenderer for StaticChartUrl {
    fn render(&self, input: &ChartInput<'_>) -> String {
        let min_m = i64::from(input.min_elevation);
        // One metre of headroom so the highest point stays on the chart.
        let max_m = i64::from(input.max_elevation) + 1;
        let with_curvature = input.points.iter().any(|p| p.curvature_height.is_some());

        let margin = |v: f64| if v >= 1000.0 { "35" } else { "30" };
        let (axes, font, tick) = (Self::AXES, Self::FONT_SIZE, Self::TICK_LENGTH);

        let mut url = format!(
            "{}?chs={}x{}&chma={},{},22,23&cht=lc&chd=e:{}",
            self.base_url,
            self.width,
            self.height,
            margin(max_m as f64),
            margin(max_m as f64 * FEET_PER_METRE),
            Self::data(input, min_m as f64, max_m as f64, with_curvature),
        );

        url.push_str(&format!(
            "&chf=bg,s,{}|c,lg,90,{},1,{},0",
            Self::BACKGROUND,
            Self::SKY_TOP,
            Self::SKY_BOTTOM
        ));
        if with_curvature {
            url.push_str(&format!(
                "&chco={},{},{axes}&chm=b,{},0,1,0|b,{},1,2,0",
                Self::TERRAIN,
                Self::EARTH,
                Self::TERRAIN,
                Self::EARTH
            ));
        } else {
            url.push_str(&format!(
                "&chco={},{axes}&chm=b,{},0,1,0",
                Self::TERRAIN,
                Self::TERRAIN
            ));
        }
        url.push_str(&format!(
            "&chxt=x,y,t,r&chxs=0,{axes},{font},0,lt,{axes},{axes}|1,{axes},{font},1,lt,{axes},{axes}\
             |2,{axes},{font},0,lt,{axes},{axes}|3,{axes},{font},-1,lt,{axes},{axes}\
             &chxtc=0,{tick}|1,{tick}|2,{tick}|3,{tick}"
        ));

        let km = input.distance_km;
        let miles = km * MILES_PER_KM;
        url.push_str(&format!(
            "&chxr=0,0,{},{}|2,0,{},{}",
            (km * 100.0).round() / 100.0,
            axis_step(km, 5.0),
            (miles * 100.0).round() / 100.0,
            axis_step(miles, 5.0),
        ));

        let (metres, metre_positions) = axis_labels(min_m, max_m, true);
        let min_ft = (min_m as f64 * FEET_PER_METRE).round() as i64;
        let max_ft = (max_m as f64 * FEET_PER_METRE).round() as i64;
        let (feet, feet_positions) = axis_labels(min_ft, max_ft, false);

        url.push_str(&format!(
            "&chxl=0:|km|1:|m{}|2:|mi|3:|ft{}&chxp=1,0{}|3,0{}",
            join(&metres, "|"),
            join(&feet, "|"),
            join(&metre_positions, ","),
            join(&feet_positions, ","),
        ));

        url
    }
}
