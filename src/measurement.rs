//! Blood Pressure Measurement characteristic (0x2A35) encoding.
//!
//! ```text
//!  byte  0      1..6                    7..13      14..15  16     17..18
//!      ┌─────┬───────────────────────┬──────────┬───────┬──────┬────────┐
//!      │flags│ systolic diastolic MAP│timestamp │ pulse │ user │ status │
//!      │     │ (3 × SFLOAT)          │(optional)│ (opt) │ (opt)│ (opt)  │
//!      └─────┴───────────────────────┴──────────┴───────┴──────┴────────┘
//! ```
//!
//! Pressure and pulse values are IEEE-11073 16-bit SFLOATs: a signed 4-bit
//! base-10 exponent over a signed 12-bit mantissa.
//!
//! The value is exactly the fields the flags announce, so a full reading is
//! 19 bytes. Older firmware for this board sent a 21-byte buffer with two
//! trailing zero bytes; a 0x2A35 client stops at the status field and never
//! reads them, so they are not emitted.

use heapless::Vec;

/// Largest possible encoding: every optional field present.
pub const MEASUREMENT_MAX_LEN: usize = 19;

pub type MeasurementPayload = Vec<u8, MEASUREMENT_MAX_LEN>;

// Flags byte
const FLAG_UNIT_KPA: u8 = 1 << 0;
const FLAG_TIMESTAMP: u8 = 1 << 1;
const FLAG_PULSE_RATE: u8 = 1 << 2;
const FLAG_USER_ID: u8 = 1 << 3;
const FLAG_STATUS: u8 = 1 << 4;

// ── SFLOAT ────────────────────────────────────────────────────

/// IEEE-11073 16-bit short float.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sfloat(u16);

impl Sfloat {
    pub const NAN: Sfloat = Sfloat(0x07FF);
    /// Not at this resolution.
    pub const NRES: Sfloat = Sfloat(0x0800);

    const MANTISSA_MAX: i32 = 0x07FD;
    const MANTISSA_MIN: i32 = -0x07FD;

    /// Encode an integer, trading precision for exponent when the value
    /// does not fit the 12-bit mantissa.
    pub fn from_integer(value: i32) -> Self {
        let mut mantissa = value;
        let mut exponent: i32 = 0;
        while !(Self::MANTISSA_MIN..=Self::MANTISSA_MAX).contains(&mantissa) {
            if exponent == 7 {
                return Self::NRES;
            }
            mantissa /= 10;
            exponent += 1;
        }
        let raw = ((exponent as u16 & 0x0F) << 12) | (mantissa as u16 & 0x0FFF);
        Self(raw)
    }

    pub fn to_bits(self) -> u16 {
        self.0
    }

    pub fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }
}

// ── Fields ────────────────────────────────────────────────────

/// Date-time as the Bluetooth SIG Date Time characteristic lays it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

impl Timestamp {
    fn to_bytes(self) -> [u8; 7] {
        let [y0, y1] = self.year.to_le_bytes();
        [y0, y1, self.month, self.day, self.hours, self.minutes, self.seconds]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PressureUnit {
    #[default]
    MmHg,
    KPa,
}

/// One blood-pressure reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BloodPressureMeasurement {
    pub unit: PressureUnit,
    pub systolic: u16,
    pub diastolic: u16,
    pub mean_arterial: u16,
    pub timestamp: Option<Timestamp>,
    /// Beats per minute.
    pub pulse_rate: Option<u16>,
    pub user_id: Option<u8>,
    /// Measurement status bit field (body movement, cuff fit, ...).
    pub status: Option<u16>,
}

impl BloodPressureMeasurement {
    /// The fixed reading the device notifies to a subscribed peer.
    pub fn sample() -> Self {
        Self {
            unit: PressureUnit::MmHg,
            systolic: 128,
            diastolic: 92,
            mean_arterial: 104,
            timestamp: Some(Timestamp {
                year: 2024,
                month: 4,
                day: 18,
                hours: 18,
                minutes: 40,
                seconds: 0,
            }),
            pulse_rate: Some(96),
            user_id: Some(1),
            status: Some(0),
        }
    }

    pub fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.unit == PressureUnit::KPa {
            flags |= FLAG_UNIT_KPA;
        }
        if self.timestamp.is_some() {
            flags |= FLAG_TIMESTAMP;
        }
        if self.pulse_rate.is_some() {
            flags |= FLAG_PULSE_RATE;
        }
        if self.user_id.is_some() {
            flags |= FLAG_USER_ID;
        }
        if self.status.is_some() {
            flags |= FLAG_STATUS;
        }
        flags
    }

    /// Characteristic value, ready for a notification.
    pub fn encode(&self) -> MeasurementPayload {
        let mut out = MeasurementPayload::new();
        // Capacity covers every optional field, so pushes cannot fail.
        let mut put = |bytes: &[u8]| {
            let _ = out.extend_from_slice(bytes);
        };

        put(&[self.flags()]);
        for value in [self.systolic, self.diastolic, self.mean_arterial] {
            put(&Sfloat::from_integer(i32::from(value)).to_le_bytes());
        }
        if let Some(ts) = self.timestamp {
            put(&ts.to_bytes());
        }
        if let Some(pulse) = self.pulse_rate {
            put(&Sfloat::from_integer(i32::from(pulse)).to_le_bytes());
        }
        if let Some(user) = self.user_id {
            put(&[user]);
        }
        if let Some(status) = self.status {
            put(&status.to_le_bytes());
        }
        out
    }
}
