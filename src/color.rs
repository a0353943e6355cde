use std::fmt;

use bevy::log::warn;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Substituted for any channel specification that cannot be understood.
pub const FULL_RANGE: ColorChannelSpec = ColorChannelSpec::Range {
    min: 0,
    max: 255,
    rate: None,
};

/// Used when neither a spec nor its fallback names a channel.
pub const UNSET_CHANNEL: ColorChannelSpec = ColorChannelSpec::Range {
    min: 127,
    max: 255,
    rate: None,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ColorSpecError {
    #[error("channel value {0} is outside 0-255")]
    OutOfRange(f64),
    #[error("\"{0}\" must be a number between 0-255 or range-object {{min: 0-255, max: min-255}}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];
}

/// A concrete color, the unit stored in every cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    #[inline]
    pub fn channel(&self, channel: Channel) -> u8 {
        match channel {
            Channel::Red => self.red,
            Channel::Green => self.green,
            Channel::Blue => self.blue,
        }
    }

    #[inline]
    pub fn set_channel(&mut self, channel: Channel, value: u8) {
        match channel {
            Channel::Red => self.red = value,
            Channel::Green => self.green = value,
            Channel::Blue => self.blue = value,
        }
    }

    /// Rounded element-wise mean of `colors`, `None` when there is nothing to merge.
    pub fn merge(colors: &[Rgb]) -> Option<Rgb> {
        if colors.is_empty() {
            return None;
        }
        let n = colors.len() as f64;
        let mean = |channel: Channel| {
            let sum: u32 = colors.iter().map(|c| c.channel(channel) as u32).sum();
            (sum as f64 / n).round() as u8
        };
        Some(Rgb::new(
            mean(Channel::Red),
            mean(Channel::Green),
            mean(Channel::Blue),
        ))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}

/// One channel of a [`ColorSpec`]: a fixed value or an inclusive sampling range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorChannelSpec {
    Fixed(u8),
    Range { min: u8, max: u8, rate: Option<f64> },
}

impl ColorChannelSpec {
    /// Builds a range, ordering the bounds.
    pub fn range(a: u8, b: u8) -> Self {
        ColorChannelSpec::Range {
            min: a.min(b),
            max: a.max(b),
            rate: None,
        }
    }

    pub fn sample(&self, rng: &mut fastrand::Rng) -> u8 {
        match *self {
            ColorChannelSpec::Fixed(value) => value,
            ColorChannelSpec::Range { min, max, .. } => {
                round_half_up(rng.f64() * (max as f64 - min as f64) + min as f64) as u8
            }
        }
    }
}

/// Channel-wise color specification. Absent channels defer to a fallback spec.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelSpecs {
    pub red: Option<ColorChannelSpec>,
    pub green: Option<ColorChannelSpec>,
    pub blue: Option<ColorChannelSpec>,
    pub alpha: Option<f64>,
    pub rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum ColorSpec {
    /// A literal color name, passed through wherever a color is required.
    Named(String),
    Channels(ChannelSpecs),
}

impl Default for ColorSpec {
    fn default() -> Self {
        ColorSpec::Channels(ChannelSpecs::default())
    }
}

impl From<Value> for ColorSpec {
    fn from(raw: Value) -> Self {
        normalize(&raw)
    }
}

impl From<Rgb> for ColorSpec {
    fn from(color: Rgb) -> Self {
        ColorSpec::Channels(ChannelSpecs {
            red: Some(ColorChannelSpec::Fixed(color.red)),
            green: Some(ColorChannelSpec::Fixed(color.green)),
            blue: Some(ColorChannelSpec::Fixed(color.blue)),
            ..Default::default()
        })
    }
}

impl ColorSpec {
    /// The same channel specification for red, green and blue.
    pub fn uniform(channel: ColorChannelSpec) -> Self {
        ColorSpec::Channels(ChannelSpecs {
            red: Some(channel),
            green: Some(channel),
            blue: Some(channel),
            ..Default::default()
        })
    }

    /// Replaces a named spec with its RGB value. A name that is not a known
    /// color is reported once and replaced by `fallback`.
    pub fn resolve_name(self, fallback: ColorSpec) -> ColorSpec {
        match self {
            ColorSpec::Named(name) => match parse_named(&name) {
                Some(color) => ColorSpec::from(color),
                None => {
                    warn!("\"{name}\" does not name a known color, using {fallback:?}");
                    fallback
                }
            },
            spec => spec,
        }
    }

    pub fn channel(&self, channel: Channel) -> Option<&ColorChannelSpec> {
        match self {
            ColorSpec::Named(_) => None,
            ColorSpec::Channels(specs) => match channel {
                Channel::Red => specs.red.as_ref(),
                Channel::Green => specs.green.as_ref(),
                Channel::Blue => specs.blue.as_ref(),
            },
        }
    }
}

/// The result of sampling a [`ColorSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Paint {
    Rgb(Rgb),
    Named(String),
}

impl Paint {
    pub fn to_rgb(&self) -> Option<Rgb> {
        match self {
            Paint::Rgb(color) => Some(*color),
            Paint::Named(name) => parse_named(name),
        }
    }
}

/// Normalizes a raw color value into a [`ColorSpec`].
///
/// Malformed channels are reported and replaced by [`FULL_RANGE`]. A missing
/// (or `null`) value yields a spec with no channels, which defers entirely to
/// whatever fallback it is sampled against.
pub fn normalize(raw: &Value) -> ColorSpec {
    normalize_over(raw, &ColorSpec::default())
}

/// Like [`normalize`], but every channel the raw value leaves out is taken
/// from `defaults`, and a range object missing one bound takes it from the
/// default channel.
pub fn normalize_over(raw: &Value, defaults: &ColorSpec) -> ColorSpec {
    let channel = |raw: Option<&Value>, channel: Channel| {
        channel_or_report(raw, defaults.channel(channel).copied())
    };
    match raw {
        Value::String(name) => ColorSpec::Named(name.clone()),
        Value::Number(_) => {
            ColorSpec::uniform(channel_or_report(Some(raw), None).unwrap_or(FULL_RANGE))
        }
        Value::Object(map) => {
            let pick = |long: &str, short: &str| {
                map.get(long)
                    .filter(|v| !v.is_null())
                    .or_else(|| map.get(short))
            };
            ColorSpec::Channels(ChannelSpecs {
                red: channel(pick("red", "r"), Channel::Red),
                green: channel(pick("green", "g"), Channel::Green),
                blue: channel(pick("blue", "b"), Channel::Blue),
                alpha: pick("alpha", "a").and_then(Value::as_f64),
                rate: map.get("rate").and_then(Value::as_f64),
            })
        }
        Value::Array(items) => ColorSpec::Channels(ChannelSpecs {
            red: channel(items.first(), Channel::Red),
            green: channel(items.get(1), Channel::Green),
            blue: channel(items.get(2), Channel::Blue),
            alpha: items.get(3).and_then(Value::as_f64),
            rate: None,
        }),
        Value::Null => defaults.clone(),
        Value::Bool(_) => {
            warn!("{}", ColorSpecError::Malformed(raw.to_string()));
            defaults.clone()
        }
    }
}

fn channel_or_report(
    raw: Option<&Value>,
    default: Option<ColorChannelSpec>,
) -> Option<ColorChannelSpec> {
    let Some(raw) = raw.filter(|v| !v.is_null()) else {
        return default;
    };
    match ensure_format(raw, default) {
        Ok(spec) => Some(spec),
        Err(err) => {
            warn!("Format Error : {err}");
            Some(FULL_RANGE)
        }
    }
}

fn ensure_format(
    raw: &Value,
    default: Option<ColorChannelSpec>,
) -> Result<ColorChannelSpec, ColorSpecError> {
    match raw {
        Value::Number(_) => channel_value(raw).map(ColorChannelSpec::Fixed),
        Value::Object(map) => {
            let (default_min, default_max) = match default {
                Some(ColorChannelSpec::Fixed(value)) => (Some(value), Some(value)),
                Some(ColorChannelSpec::Range { min, max, .. }) => (Some(min), Some(max)),
                None => (None, None),
            };
            let bound = |key: &str, default: Option<u8>| match map.get(key) {
                Some(value) => channel_value(value),
                None => default.ok_or_else(|| ColorSpecError::Malformed(raw.to_string())),
            };
            let (a, b) = (bound("min", default_min)?, bound("max", default_max)?);
            Ok(ColorChannelSpec::Range {
                min: a.min(b),
                max: a.max(b),
                rate: map.get("rate").and_then(Value::as_f64),
            })
        }
        Value::Array(items) => match items.as_slice() {
            [single] => ensure_format(single, default),
            [a, b] => Ok(ColorChannelSpec::range(channel_value(a)?, channel_value(b)?)),
            [a, b, rate] => {
                let (a, b) = (channel_value(a)?, channel_value(b)?);
                Ok(ColorChannelSpec::Range {
                    min: a.min(b),
                    max: a.max(b),
                    rate: rate.as_f64(),
                })
            }
            _ => Err(ColorSpecError::Malformed(raw.to_string())),
        },
        _ => Err(ColorSpecError::Malformed(raw.to_string())),
    }
}

fn channel_value(raw: &Value) -> Result<u8, ColorSpecError> {
    let value = raw
        .as_f64()
        .ok_or_else(|| ColorSpecError::Malformed(raw.to_string()))?;
    if !(0.0..=255.0).contains(&value) {
        return Err(ColorSpecError::OutOfRange(value));
    }
    Ok(round_half_up(value) as u8)
}

/// Samples every channel of `spec`. A channel the spec leaves out is taken
/// from `fallback`, and if that leaves it out too, from [`UNSET_CHANNEL`].
/// Named specs come back verbatim.
pub fn sample_color(spec: &ColorSpec, fallback: &ColorSpec, rng: &mut fastrand::Rng) -> Paint {
    if let ColorSpec::Named(name) = spec {
        return Paint::Named(name.clone());
    }
    let mut color = Rgb::BLACK;
    for channel in Channel::ALL {
        let channel_spec = spec
            .channel(channel)
            .or_else(|| fallback.channel(channel))
            .unwrap_or(&UNSET_CHANNEL);
        color.set_channel(channel, channel_spec.sample(rng));
    }
    Paint::Rgb(color)
}

/// Turns `#rgb`, `#rrggbb` or a basic CSS color name into RGB.
pub fn parse_named(name: &str) -> Option<Rgb> {
    let name = name.trim();
    if let Some(hex) = name.strip_prefix('#') {
        return parse_hex(hex);
    }
    let rgb = match name.to_ascii_lowercase().as_str() {
        "black" => Rgb::new(0, 0, 0),
        "white" => Rgb::new(255, 255, 255),
        "red" => Rgb::new(255, 0, 0),
        "lime" => Rgb::new(0, 255, 0),
        "green" => Rgb::new(0, 128, 0),
        "blue" => Rgb::new(0, 0, 255),
        "yellow" => Rgb::new(255, 255, 0),
        "cyan" | "aqua" => Rgb::new(0, 255, 255),
        "magenta" | "fuchsia" => Rgb::new(255, 0, 255),
        "gray" | "grey" => Rgb::new(128, 128, 128),
        "silver" => Rgb::new(192, 192, 192),
        "maroon" => Rgb::new(128, 0, 0),
        "olive" => Rgb::new(128, 128, 0),
        "navy" => Rgb::new(0, 0, 128),
        "purple" => Rgb::new(128, 0, 128),
        "teal" => Rgb::new(0, 128, 128),
        "orange" => Rgb::new(255, 165, 0),
        _ => return None,
    };
    Some(rgb)
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|d| d * 17);
    let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Rgb::new(digit(0)?, digit(1)?, digit(2)?)),
        6 => Some(Rgb::new(pair(0)?, pair(2)?, pair(4)?)),
        _ => None,
    }
}

/// Which colors new cells get.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorPolicy {
    /// Sampled for births when random coloring is enabled.
    pub random_color: Option<ColorSpec>,
    /// Sampled otherwise, and the fallback for every missing channel.
    pub default_color: ColorSpec,
}

impl ColorPolicy {
    pub fn birth_color(&self, rng: &mut fastrand::Rng) -> Rgb {
        let spec = self.random_color.as_ref().unwrap_or(&self.default_color);
        sample_color(spec, &self.default_color, rng)
            .to_rgb()
            .unwrap_or_else(|| {
                warn!("birth color {spec:?} does not name a known color, using black");
                Rgb::BLACK
            })
    }

    /// Initial color of a cell: a birth color when alive, black when dead.
    pub fn cell_color(&self, alive: bool, rng: &mut fastrand::Rng) -> Rgb {
        if alive {
            self.birth_color(rng)
        } else {
            Rgb::BLACK
        }
    }

    /// Samples `spec` down to a concrete color, with the default color as fallback.
    pub fn concrete(&self, spec: &ColorSpec, rng: &mut fastrand::Rng) -> Rgb {
        let paint = sample_color(spec, &self.default_color, rng);
        match paint.to_rgb() {
            Some(color) => color,
            None => {
                warn!("unknown color {paint:?}, generating a birth color instead");
                self.birth_color(rng)
            }
        }
    }
}

#[inline]
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}
