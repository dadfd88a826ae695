//! Frame payload decoders
//!
//! Each [`Decoder`] variant describes one payload layout. Decoding is pure
//! and total over the declared minimum length: a shorter payload yields
//! [`DecodeError::TooShort`], never a panic.

use crate::error::DecodeError;

/// Miles to kilometres
pub const KM_PER_MILE: f32 = 1.609344;

/// Raw throttle value at closed pedal
const THROTTLE_RAW_MIN: f32 = 255.0;
/// Raw throttle value at wide open pedal
const THROTTLE_RAW_MAX: f32 = 65064.0;

/// Result of decoding one frame
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Raw wheel pulse counter, consumed by the speed estimator only
    SpeedCounter(u16),
    /// Named physical quantities ready to publish
    Quantities(Vec<(&'static str, f32)>),
}

impl Decoded {
    /// Look up a quantity by name (None for the speed counter)
    pub fn get(&self, name: &str) -> Option<f32> {
        match self {
            Decoded::SpeedCounter(_) => None,
            Decoded::Quantities(values) => values
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| *v),
        }
    }
}

/// Payload layouts understood by the decode table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    /// u16 LE @0: rolling wheel pulse counter
    SpeedCounter,
    /// u16 LE @4 / 4 = rpm, u16 LE @2 = throttle raw, byte 7 = accelerator
    EngineRpmThrottle,
    /// byte 0 - 48 = coolant °C
    CoolantTemp,
    /// u16 LE @0 and @2, each / 160 = left/right tank litres
    FuelTank,
    /// u24 LE @0 = odometer km, u16 LE @6 / 16 = range km, bytes 3..=5 = gauge
    OdometerRange,
    /// packed 12/4-bit fields: average economy (mpg UK) and average speed
    AverageEconomy,
}

impl Decoder {
    /// Minimum payload length the decoder needs
    pub fn min_len(self) -> usize {
        match self {
            Decoder::SpeedCounter => 2,
            Decoder::EngineRpmThrottle => 8,
            Decoder::CoolantTemp => 1,
            Decoder::FuelTank => 4,
            Decoder::OdometerRange => 8,
            Decoder::AverageEconomy => 3,
        }
    }

    /// Decode a payload received on `frame_id`
    pub fn decode(self, frame_id: u32, data: &[u8]) -> Result<Decoded, DecodeError> {
        let expected = self.min_len();
        if data.len() < expected {
            return Err(DecodeError::TooShort {
                frame_id,
                expected,
                actual: data.len(),
            });
        }
        let too_short = || DecodeError::TooShort {
            frame_id,
            expected,
            actual: data.len(),
        };

        let decoded = match self {
            Decoder::SpeedCounter => Decoded::SpeedCounter(u16_le(data, 0).ok_or_else(too_short)?),
            Decoder::EngineRpmThrottle => {
                let rpm = f32::from(u16_le(data, 4).ok_or_else(too_short)?) / 4.0;
                let throttle_raw = u16_le(data, 2).ok_or_else(too_short)?;
                let accel = byte(data, 7).ok_or_else(too_short)?;

                Decoded::Quantities(vec![
                    ("rpm", rpm),
                    ("throttleRaw", f32::from(throttle_raw)),
                    ("throttlePct", throttle_percent(throttle_raw)),
                    ("accelByte7", f32::from(accel)),
                ])
            }
            Decoder::CoolantTemp => {
                let raw = byte(data, 0).ok_or_else(too_short)?;
                Decoded::Quantities(vec![("engineTempC", f32::from(raw) - 48.0)])
            }
            Decoder::FuelTank => {
                let left = f32::from(u16_le(data, 0).ok_or_else(too_short)?) / 160.0;
                let right = f32::from(u16_le(data, 2).ok_or_else(too_short)?) / 160.0;

                Decoded::Quantities(vec![
                    ("fuelLeftLiters", left),
                    ("fuelRightLiters", right),
                    ("fuelLiters", left + right),
                ])
            }
            Decoder::OdometerRange => {
                let odometer = u24_le(data, 0).ok_or_else(too_short)?;
                let range = u16_le(data, 6).ok_or_else(too_short)?;
                let gauge = byte(data, 3).ok_or_else(too_short)?;
                let left_damped = byte(data, 4).ok_or_else(too_short)?;
                let right_damped = byte(data, 5).ok_or_else(too_short)?;

                Decoded::Quantities(vec![
                    ("odometerKm", odometer as f32),
                    ("rangeKm", f32::from(range) / 16.0),
                    ("fuelGaugeLiters", f32::from(gauge)),
                    ("fuelLeftDamped", f32::from(left_damped)),
                    ("fuelRightDamped", f32::from(right_damped)),
                ])
            }
            Decoder::AverageEconomy => {
                let b0 = byte(data, 0).ok_or_else(too_short)?;
                let b1 = byte(data, 1).ok_or_else(too_short)?;
                let b2 = byte(data, 2).ok_or_else(too_short)?;

                // 12-bit economy: b2 high 8 bits, upper nibble of b1 low 4 bits
                let raw_mpg = (u16::from(b2) << 4) | u16::from(b1 >> 4);
                // 12-bit speed: lower nibble of b1 high 4 bits, b0 low 8 bits
                let raw_mph = (u16::from(b1 & 0x0F) << 8) | u16::from(b0);
                let avg_mph = f32::from(raw_mph) / 10.0;

                Decoded::Quantities(vec![
                    ("avgMpgUk", f32::from(raw_mpg) / 10.0),
                    ("avgMph", avg_mph),
                    ("avgKmh", avg_mph * KM_PER_MILE),
                ])
            }
        };

        Ok(decoded)
    }
}

/// Piecewise-linear throttle mapping clamped to [0, 100]
fn throttle_percent(raw: u16) -> f32 {
    let raw = f32::from(raw);
    if raw <= THROTTLE_RAW_MIN {
        return 0.0;
    }
    let x = (raw - THROTTLE_RAW_MIN) / (THROTTLE_RAW_MAX - THROTTLE_RAW_MIN);
    x.clamp(0.0, 1.0) * 100.0
}

fn byte(data: &[u8], offset: usize) -> Option<u8> {
    data.get(offset).copied()
}

fn u16_le(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn u24_le(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 3)?;
    Some(u32::from(bytes[0]) | (u32::from(bytes[1]) << 8) | (u32::from(bytes[2]) << 16))
}
