//! RGB lighting: effect compilation and the animation buffer upload
//!
//! The controller has nine LED zones: a four-zone ring around each stick and
//! one zone on the front. The firmware plays a looped animation of up to
//! eight keyframes stored in profile memory; every effect here is compiled to
//! such a keyframe list.

use std::fmt;
use std::str::FromStr;

use claw_transport::{
    ClawCommand, ControlChannel, TransportError, WriteProfileData, MAX_PROFILE_CHUNK,
};
use tracing::{debug, info};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::ClawError;
use crate::firmware::RgbAddressTable;

/// LED zones per keyframe
pub const ZONE_COUNT: usize = 9;

/// Maximum keyframes in one animation
pub const MAX_FRAMES: usize = 8;

/// Device speed units (frame period); 0 is fastest
pub const DEVICE_SPEED_MAX: u8 = 20;

/// User-facing speed and brightness range
pub const USER_SCALE_MAX: u8 = 100;

/// Marker byte in the animation header
const EFFECT_MARKER: u8 = 0x09;

const CHROMA_HUES: [u16; 6] = [0, 60, 120, 180, 240, 300];
const RAINBOW_HUES: [u16; 4] = [0, 90, 180, 270];

/// Zones making up one stick ring
const RING_SIZE: usize = 4;

/// Zone index of the single front LED
const FRONT_ZONE: usize = 8;

/// RGB color value
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, IntoBytes, FromBytes, KnownLayout, Immutable,
)]
#[repr(C)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0 };
    pub const WHITE: Self = Self {
        r: 255,
        g: 255,
        b: 255,
    };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = ClawError;

    /// Parse `R,G,B` with each channel in 0..=255
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ClawError::InvalidParameter(format!("bad color '{s}', want R,G,B"));
        let channels = s
            .split(',')
            .map(|c| c.trim().parse::<u8>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        match channels.as_slice() {
            &[r, g, b] => Ok(Self { r, g, b }),
            _ => Err(invalid()),
        }
    }
}

/// One 9-zone color snapshot
pub type Keyframe = [Rgb; ZONE_COUNT];

/// Integer HSV to RGB (hue 0..=359, saturation and value 0..=255)
pub fn hsv_to_rgb(h: u16, s: u8, v: u8) -> Rgb {
    if s == 0 {
        return Rgb::new(v, v, v);
    }

    let h = u32::from(h % 360);
    let s = u32::from(s);
    let v = u32::from(v);

    let region = h / 60;
    let remainder = (h - region * 60) * 255 / 60;

    let p = (v * (255 - s)) >> 8;
    let q = (v * (255 - ((s * remainder) >> 8))) >> 8;
    let t = (v * (255 - ((s * (255 - remainder)) >> 8))) >> 8;

    let (r, g, b) = match region {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    Rgb::new(r as u8, g as u8, b as u8)
}

/// Map user speed (0 slow ..= 100 fast) to device units (20 ..= 0)
pub fn speed_to_device(user: u8) -> u8 {
    let user = u16::from(user.min(USER_SCALE_MAX));
    ((100 - user) * u16::from(DEVICE_SPEED_MAX) / 100) as u8
}

/// [`speed_to_device`] bounded to `[min, max]`
pub fn speed_to_device_clamped(user: u8, min: u8, max: u8) -> u8 {
    speed_to_device(user).clamp(min, max)
}

/// Built-in lighting effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedEffect {
    Monocolor,
    Breathe,
    Chroma,
    Rainbow,
    Custom,
}

impl LedEffect {
    pub const ALL: [LedEffect; 5] = [
        Self::Monocolor,
        Self::Breathe,
        Self::Chroma,
        Self::Rainbow,
        Self::Custom,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Monocolor => "monocolor",
            Self::Breathe => "breathe",
            Self::Chroma => "chroma",
            Self::Rainbow => "rainbow",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for LedEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LedEffect {
    type Err = ClawError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.name() == s.trim())
            .ok_or_else(|| ClawError::InvalidParameter(format!("unknown effect '{s}'")))
    }
}

/// Animation buffer header
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct RgbHeader {
    _reserved: u8,
    pub frame_count: u8,
    pub marker: u8,
    pub speed: u8,
    pub brightness: u8,
}

/// A compiled animation, ready to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbConfig {
    /// Device speed units
    pub speed: u8,
    /// 0..=100
    pub brightness: u8,
    pub frames: Vec<Keyframe>,
}

impl RgbConfig {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn header(&self) -> RgbHeader {
        RgbHeader {
            _reserved: 0,
            frame_count: self.frames.len() as u8,
            marker: EFFECT_MARKER,
            speed: self.speed,
            brightness: self.brightness,
        }
    }

    /// Header followed by `frame_count * 9` colors
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = self.header().as_bytes().to_vec();
        for frame in &self.frames {
            buf.extend_from_slice(frame.as_bytes());
        }
        buf
    }
}

/// Parse keyframes: frames separated by `;`, zones by whitespace, each zone `R,G,B`
pub fn parse_keyframes(text: &str) -> Result<Vec<Keyframe>, ClawError> {
    let frames = text
        .split(';')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(|frame| {
            let zones = frame
                .split_whitespace()
                .map(str::parse::<Rgb>)
                .collect::<Result<Vec<_>, _>>()?;
            <[Rgb; ZONE_COUNT]>::try_from(zones.as_slice()).map_err(|_| {
                ClawError::InvalidParameter(format!(
                    "keyframe has {} zones, want {ZONE_COUNT}",
                    zones.len()
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if frames.is_empty() {
        return Err(ClawError::NoKeyframes);
    }
    if frames.len() > MAX_FRAMES {
        return Err(ClawError::InvalidParameter(format!(
            "{} keyframes, max {MAX_FRAMES}",
            frames.len()
        )));
    }
    Ok(frames)
}

pub fn format_keyframes(frames: &[Keyframe]) -> String {
    frames
        .iter()
        .map(|frame| {
            frame
                .iter()
                .map(Rgb::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// User-facing lighting state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedState {
    pub enabled: bool,
    pub effect: LedEffect,
    /// 0 (slow) ..= 100 (fast)
    pub speed: u8,
    /// 0..=100
    pub brightness: u8,
    pub color: Rgb,
    pub keyframes: Vec<Keyframe>,
}

impl Default for LedState {
    fn default() -> Self {
        Self {
            enabled: true,
            effect: LedEffect::Monocolor,
            speed: 50,
            brightness: 100,
            color: Rgb::WHITE,
            keyframes: Vec::new(),
        }
    }
}

impl LedState {
    /// Build the animation for the current state
    pub fn compile(&self) -> Result<RgbConfig, ClawError> {
        if !self.enabled {
            return Ok(RgbConfig {
                speed: 0,
                brightness: 0,
                frames: vec![[Rgb::BLACK; ZONE_COUNT]],
            });
        }

        let (speed, frames) = match self.effect {
            LedEffect::Monocolor => (0, vec![[self.color; ZONE_COUNT]]),
            LedEffect::Breathe => (
                speed_to_device_clamped(self.speed, 0, 15),
                vec![[self.color; ZONE_COUNT], [Rgb::BLACK; ZONE_COUNT]],
            ),
            LedEffect::Chroma => (
                speed_to_device_clamped(self.speed, 0, 10),
                CHROMA_HUES
                    .iter()
                    .map(|&h| [hsv_to_rgb(h, 255, 255); ZONE_COUNT])
                    .collect(),
            ),
            LedEffect::Rainbow => (
                speed_to_device_clamped(self.speed, 0, 12),
                (0..RAINBOW_HUES.len()).map(rainbow_frame).collect(),
            ),
            LedEffect::Custom => {
                if self.keyframes.is_empty() {
                    return Err(ClawError::NoKeyframes);
                }
                (speed_to_device(self.speed), self.keyframes.clone())
            }
        };

        Ok(RgbConfig {
            speed,
            brightness: self.brightness,
            frames,
        })
    }
}

/// Both stick rings rotate through the hue list; the front zone cycles
fn rainbow_frame(frame: usize) -> Keyframe {
    let mut zones = [Rgb::BLACK; ZONE_COUNT];
    for (zone, color) in zones.iter_mut().enumerate().take(2 * RING_SIZE) {
        let hue = RAINBOW_HUES[(zone % RING_SIZE + frame) % RAINBOW_HUES.len()];
        *color = hsv_to_rgb(hue, 255, 255);
    }
    zones[FRONT_ZONE] = hsv_to_rgb(RAINBOW_HUES[frame % RAINBOW_HUES.len()], 255, 255);
    zones
}

/// Upload an animation in acknowledged chunks
///
/// If the first chunk cannot be sent the device is untouched and the plain
/// error is returned. Any later failure leaves a partially written buffer
/// and is reported as [`ClawError::PartialWrite`].
pub async fn write_rgb(
    channel: &mut ControlChannel,
    table: &RgbAddressTable,
    config: &RgbConfig,
) -> Result<(), ClawError> {
    let buf = config.to_bytes();
    let total = buf.len();
    debug!(
        "Uploading {} frame animation ({} bytes) at {:04x}",
        config.frame_count(),
        total,
        table.base
    );

    let mut written = 0;
    for chunk in buf.chunks(MAX_PROFILE_CHUNK) {
        let address = table.base.wrapping_add(written as u16);
        let write = WriteProfileData::new(address, chunk)?;

        if let Err(e) = channel.send(WriteProfileData::COMMAND_TYPE, &write.body()).await {
            if written == 0 {
                return Err(e.into());
            }
            return Err(partial_write(written, total, e));
        }
        if let Err(e) = channel.await_ack().await {
            return Err(partial_write(written, total, e));
        }
        written += chunk.len();
    }

    info!(
        "Lighting updated: {} frame(s), speed {}, brightness {}",
        config.frame_count(),
        config.speed,
        config.brightness
    );
    Ok(())
}

fn partial_write(written: usize, total: usize, e: TransportError) -> ClawError {
    ClawError::PartialWrite {
        written,
        total,
        source: Box::new(e.into()),
    }
}
