//! RGB status LED adapter.
//!
//! Three PWM channels drive discrete R/G/B LEDs (or a common-cathode RGB
//! LED).  Any `embedded_hal::pwm::SetDutyCycle` works: LEDC channels on
//! the device, recording fakes in tests.
//!
//! | Indication | Colour |
//! |------------|--------|
//! | active     | green  |
//! | busy       | orange |
//! | fault      | red    |
//! | idle       | off    |
//! | nothing    | off    |

use embedded_hal::pwm::SetDutyCycle;
use log::warn;

use crate::app::ports::IndicatorPort;

/// Colour as (R, G, B) tuple, each 0–255.
pub type Rgb = (u8, u8, u8);

pub const GREEN: Rgb = (0, 255, 0);
pub const ORANGE: Rgb = (255, 96, 0);
pub const RED: Rgb = (255, 0, 0);
pub const OFF: Rgb = (0, 0, 0);

/// Last indication requested by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indication {
    Idle,
    Active,
    Busy,
    Fault,
    Nothing,
}

impl Indication {
    pub const fn colour(self) -> Rgb {
        match self {
            Self::Active => GREEN,
            Self::Busy => ORANGE,
            Self::Fault => RED,
            Self::Idle | Self::Nothing => OFF,
        }
    }
}

pub struct StatusLed<R, G, B> {
    red: R,
    green: G,
    blue: B,
    current: Rgb,
    indication: Indication,
}

impl<R, G, B> StatusLed<R, G, B>
where
    R: SetDutyCycle,
    G: SetDutyCycle,
    B: SetDutyCycle,
{
    /// Takes ownership of the channels and switches the LED off.
    pub fn new(red: R, green: G, blue: B) -> Self {
        let mut led = Self {
            red,
            green,
            blue,
            current: OFF,
            indication: Indication::Nothing,
        };
        led.set_colour(OFF);
        led
    }

    pub fn set_colour(&mut self, (r, g, b): Rgb) {
        let ok = set_level(&mut self.red, r)
            & set_level(&mut self.green, g)
            & set_level(&mut self.blue, b);
        if !ok {
            warn!("StatusLed: PWM update failed for ({r}, {g}, {b})");
        }
        self.current = (r, g, b);
    }

    pub fn current_colour(&self) -> Rgb {
        self.current
    }

    pub fn indication(&self) -> Indication {
        self.indication
    }

    fn show(&mut self, indication: Indication) {
        self.indication = indication;
        self.set_colour(indication.colour());
    }
}

/// Scale an 8-bit level onto the channel's duty range.
fn set_level<C: SetDutyCycle>(channel: &mut C, level: u8) -> bool {
    let max = u32::from(channel.max_duty_cycle());
    let duty = (u32::from(level) * max / 255) as u16;
    channel.set_duty_cycle(duty).is_ok()
}

impl<R, G, B> IndicatorPort for StatusLed<R, G, B>
where
    R: SetDutyCycle,
    G: SetDutyCycle,
    B: SetDutyCycle,
{
    fn show_idle(&mut self) {
        self.show(Indication::Idle);
    }

    fn show_active(&mut self) {
        self.show(Indication::Active);
    }

    fn show_busy(&mut self) {
        self.show(Indication::Busy);
    }

    fn show_fault(&mut self) {
        self.show(Indication::Fault);
    }

    fn show_nothing(&mut self) {
        self.show(Indication::Nothing);
    }
}
