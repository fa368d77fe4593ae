//! Trigger input levels read from Raspberry Pi GPIO.

use rppal::gpio::{Gpio, InputPin};
use trigger_traits::{TriggerInput, TriggerInputs};

use crate::error::{HwError, Result};

/// Level source for the decoder's polarity gate and polled cam.
///
/// An input without a pin reads high.
pub struct GpioInputs {
    primary: InputPin,
    secondary: Option<InputPin>,
    tertiary: Option<InputPin>,
}

impl GpioInputs {
    pub fn new(primary: u8, secondary: Option<u8>, tertiary: Option<u8>) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let open = |pin: u8| -> Result<InputPin> {
            gpio.get(pin)
                .map(|p| p.into_input())
                .map_err(|e| HwError::Gpio(format!("open pin {pin}: {e}")))
        };
        let inputs = Self {
            primary: open(primary)?,
            secondary: secondary.map(open).transpose()?,
            tertiary: tertiary.map(open).transpose()?,
        };
        tracing::info!(primary, ?secondary, ?tertiary, "gpio trigger inputs ready");
        Ok(inputs)
    }
}

impl TriggerInputs for GpioInputs {
    fn is_high(&self, input: TriggerInput) -> bool {
        let pin = match input {
            TriggerInput::Primary => Some(&self.primary),
            TriggerInput::Secondary => self.secondary.as_ref(),
            TriggerInput::Tertiary => self.tertiary.as_ref(),
        };
        pin.is_none_or(InputPin::is_high)
    }
}
