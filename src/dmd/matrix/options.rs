/*
 *  dmd/matrix/options.rs
 *
 *  rgbdmd - pixels out the door
 *  (c) 2020-26 Stuart Hunter
 *
 *  Enumerated rpi-rgb-led-matrix driver options
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

//! Driver options for the native matrix library.
//!
//! Every option is `None` until configured; unset options are passed to the
//! library as zero/null, which the C API reads as "use the built-in default".
//! Keys are the option names used by the library's own bindings so an
//! existing `rpi_dmd` config section can be copied over verbatim.

use serde::Serialize;
use serde_yaml::Value;

use crate::config::ConfigError;

/// Option names accepted in the `rpi_dmd` section
pub const MATRIX_OPTION_KEYS: &[&str] = &[
    "hardware_mapping",
    "rows",
    "cols",
    "chain_length",
    "parallel",
    "pwm_bits",
    "pwm_lsb_nanoseconds",
    "pwm_dither_bits",
    "brightness",
    "scan_mode",
    "row_address_type",
    "multiplexing",
    "led_rgb_sequence",
    "pixel_mapper_config",
    "panel_type",
    "disable_hardware_pulsing",
    "show_refresh_rate",
    "inverse_colors",
    "limit_refresh_rate_hz",
    "gpio_slowdown",
    "daemon",
    "drop_privileges",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatrixOptions {
    // panel options (RGBLedMatrixOptions)
    pub hardware_mapping: Option<String>,
    pub rows: Option<i32>,
    pub cols: Option<i32>,
    pub chain_length: Option<i32>,
    pub parallel: Option<i32>,
    pub pwm_bits: Option<i32>,
    pub pwm_lsb_nanoseconds: Option<i32>,
    pub pwm_dither_bits: Option<i32>,
    pub brightness: Option<i32>,
    pub scan_mode: Option<i32>,
    pub row_address_type: Option<i32>,
    pub multiplexing: Option<i32>,
    pub led_rgb_sequence: Option<String>,
    pub pixel_mapper_config: Option<String>,
    pub panel_type: Option<String>,
    pub disable_hardware_pulsing: Option<bool>,
    pub show_refresh_rate: Option<bool>,
    pub inverse_colors: Option<bool>,
    pub limit_refresh_rate_hz: Option<i32>,

    // runtime options (RGBLedRuntimeOptions)
    pub gpio_slowdown: Option<i32>,
    pub daemon: Option<bool>,
    pub drop_privileges: Option<bool>,
}

impl MatrixOptions {
    /// Build options by copying every key/value pair, failing on the first
    /// key the driver does not know or whose value it cannot take.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a String, &'a Value)>,
    {
        let mut options = Self::default();
        for (key, value) in pairs {
            options.set(key, value)?;
        }
        Ok(options)
    }

    /// Set a single option by name
    pub fn set(&mut self, key: &str, value: &Value) -> Result<(), ConfigError> {
        match key {
            "hardware_mapping" => self.hardware_mapping = Some(text(key, value)?),
            "rows" => self.rows = Some(int(key, value)?),
            "cols" => self.cols = Some(int(key, value)?),
            "chain_length" => self.chain_length = Some(int(key, value)?),
            "parallel" => self.parallel = Some(int(key, value)?),
            "pwm_bits" => self.pwm_bits = Some(int(key, value)?),
            "pwm_lsb_nanoseconds" => self.pwm_lsb_nanoseconds = Some(int(key, value)?),
            "pwm_dither_bits" => self.pwm_dither_bits = Some(int(key, value)?),
            "brightness" => {
                let b = int(key, value)?;
                if !(0..=100).contains(&b) {
                    return Err(rejected(key, value));
                }
                self.brightness = Some(b);
            }
            "scan_mode" => self.scan_mode = Some(int(key, value)?),
            "row_address_type" => self.row_address_type = Some(int(key, value)?),
            "multiplexing" => self.multiplexing = Some(int(key, value)?),
            "led_rgb_sequence" => self.led_rgb_sequence = Some(text(key, value)?),
            "pixel_mapper_config" => self.pixel_mapper_config = Some(text(key, value)?),
            "panel_type" => self.panel_type = Some(text(key, value)?),
            "disable_hardware_pulsing" => self.disable_hardware_pulsing = Some(flag(key, value)?),
            "show_refresh_rate" => self.show_refresh_rate = Some(flag(key, value)?),
            "inverse_colors" => self.inverse_colors = Some(flag(key, value)?),
            "limit_refresh_rate_hz" => self.limit_refresh_rate_hz = Some(int(key, value)?),
            "gpio_slowdown" => {
                // the C API reads 0 as unset, so 0 could never take effect
                let slowdown = int(key, value)?;
                if slowdown < 1 {
                    return Err(rejected(key, value));
                }
                self.gpio_slowdown = Some(slowdown);
            }
            "daemon" => self.daemon = Some(flag(key, value)?),
            "drop_privileges" => self.drop_privileges = Some(flag(key, value)?),
            _ => return Err(rejected(key, value)),
        }
        Ok(())
    }
}

/// Render a YAML scalar the way it was written, for error messages
pub fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_else(|_| format!("{:?}", other)),
    }
}

fn rejected(key: &str, value: &Value) -> ConfigError {
    ConfigError::RejectedOption {
        key: key.to_string(),
        value: describe_value(value),
    }
}

fn int(key: &str, value: &Value) -> Result<i32, ConfigError> {
    value.as_i64()
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| rejected(key, value))
}

fn text(key: &str, value: &Value) -> Result<String, ConfigError> {
    value.as_str()
        .map(str::to_string)
        .ok_or_else(|| rejected(key, value))
}

// 0/1 are accepted alongside true/false
fn flag(key: &str, value: &Value) -> Result<bool, ConfigError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) if n.as_i64() == Some(0) => Ok(false),
        Value::Number(n) if n.as_i64() == Some(1) => Ok(true),
        _ => Err(rejected(key, value)),
    }
}
