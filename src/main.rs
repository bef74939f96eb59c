//! Firmware entry point (ESP32-C3, feature `esp`).
//!
//! Wires the hardware to the control core: GPIO any-edge interrupts
//! feed [`InputShared`], the I²C SSD1306 renders frames, and the main
//! loop advances [`App::tick`] once per ~50 ms slice. Connectivity and
//! time sync degrade gracefully - the loop starts either way.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{Gpio10, Gpio8, Output, PinDriver};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::FromValueType;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use esp_idf_sys::esp;
use log::{info, warn};

use dosewatch::app::App;
use dosewatch::config::{self, TICK_MS};
use dosewatch::error::Error;
use dosewatch::input::InputShared;
use dosewatch::platform::{Frame, Platform};
use dosewatch::remote::esp::EspTransport;
use dosewatch::remote::RemoteStore;
use dosewatch::settings::Settings;
use dosewatch::ui::display::{self, Oled};
use dosewatch::wifi;

/// Input state shared with the two ISR callbacks.
static INPUT: InputShared = InputShared::new();

/// Epochs below this are the unsynchronized boot clock, not wall time.
const EPOCH_VALID_FLOOR: i64 = 1_600_000_000;

const NVS_NAMESPACE: &str = "dosewatch";
const NVS_SETTINGS_KEY: &str = "settings_json";

// ── ISR callbacks ─────────────────────────────────────────────
//
// Restricted to level reads and atomic updates; see `input`.

fn isr_now_ms() -> u32 {
    (unsafe { esp_idf_sys::esp_timer_get_time() } / 1000) as u32
}

unsafe extern "C" fn encoder_isr(_arg: *mut core::ffi::c_void) {
    let a = esp_idf_sys::gpio_get_level(config::PIN_ENC_A) != 0;
    let b = esp_idf_sys::gpio_get_level(config::PIN_ENC_B) != 0;
    INPUT.on_encoder_edge(a, b, isr_now_ms());
}

unsafe extern "C" fn switch_isr(_arg: *mut core::ffi::c_void) {
    // Active-low: pressed when the line reads low.
    let pressed = esp_idf_sys::gpio_get_level(config::PIN_SWITCH) == 0;
    INPUT.on_switch_edge(pressed, isr_now_ms());
}

/// Configure the three input lines and attach the ISR handlers.
fn init_inputs() -> anyhow::Result<()> {
    use esp_idf_sys as sys;

    for pin in [config::PIN_ENC_A, config::PIN_ENC_B, config::PIN_SWITCH] {
        unsafe {
            esp!(sys::gpio_set_direction(pin, sys::gpio_mode_t_GPIO_MODE_INPUT))?;
            esp!(sys::gpio_set_pull_mode(
                pin,
                sys::gpio_pull_mode_t_GPIO_PULLUP_ONLY
            ))?;
            esp!(sys::gpio_set_intr_type(
                pin,
                sys::gpio_int_type_t_GPIO_INTR_ANYEDGE
            ))?;
        }
    }

    unsafe {
        esp!(sys::gpio_install_isr_service(0))?;
        esp!(sys::gpio_isr_handler_add(
            config::PIN_ENC_A,
            Some(encoder_isr),
            core::ptr::null_mut()
        ))?;
        esp!(sys::gpio_isr_handler_add(
            config::PIN_ENC_B,
            Some(encoder_isr),
            core::ptr::null_mut()
        ))?;
        esp!(sys::gpio_isr_handler_add(
            config::PIN_SWITCH,
            Some(switch_isr),
            core::ptr::null_mut()
        ))?;
    }

    Ok(())
}

// ── Board ─────────────────────────────────────────────────────

/// Concrete platform: monotonic timer, system clock, output lines.
struct Board<'d> {
    display: Oled<I2cDriver<'d>>,
    led: PinDriver<'d, Gpio8, Output>,
    buzzer: PinDriver<'d, Gpio10, Output>,
}

impl Board<'_> {
    fn render(&mut self, frame: &Frame) {
        display::render(&mut self.display, frame);
    }
}

impl Platform for Board<'_> {
    fn now_ms(&self) -> u32 {
        isr_now_ms()
    }

    fn epoch_now(&self) -> Option<i64> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
        let epoch = now.as_secs() as i64;
        (epoch >= EPOCH_VALID_FLOOR).then_some(epoch)
    }

    fn delay_ms(&mut self, ms: u32) {
        FreeRtos::delay_ms(ms);
    }

    fn set_led(&mut self, on: bool) {
        let _ = if on {
            self.led.set_high()
        } else {
            self.led.set_low()
        };
    }

    fn set_buzzer(&mut self, on: bool) {
        let _ = if on {
            self.buzzer.set_high()
        } else {
            self.buzzer.set_low()
        };
    }

    fn set_invert(&mut self, on: bool) {
        let _ = self.display.set_invert(on);
    }
}

// ── Settings persistence ──────────────────────────────────────

/// Load settings from NVS, falling back to the hard-coded defaults and
/// best-effort rewriting the blob when it is missing or unreadable.
fn load_settings(partition: EspDefaultNvsPartition) -> Settings {
    let mut nvs: EspNvs<NvsDefault> = match EspNvs::new(partition, NVS_NAMESPACE, true) {
        Ok(nvs) => nvs,
        Err(e) => {
            warn!("{} ({e}); using defaults", Error::Storage);
            return Settings::default();
        }
    };

    let mut buf = [0u8; 256];
    match nvs.get_str(NVS_SETTINGS_KEY, &mut buf) {
        Ok(Some(text)) => match Settings::from_json(text) {
            Ok(settings) => {
                info!("settings loaded: {settings:?}");
                return settings;
            }
            Err(e) => warn!("settings blob unreadable ({e}); rewriting defaults"),
        },
        Ok(None) => info!("no stored settings; writing defaults"),
        Err(e) => warn!("{} ({e}); using defaults", Error::Storage),
    }

    let defaults = Settings::default();
    if let Err(e) = nvs.set_str(NVS_SETTINGS_KEY, &defaults.to_json()) {
        warn!("settings rewrite failed ({e})");
    }
    defaults
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();
    info!("dosewatch v{}", env!("CARGO_PKG_VERSION"));

    let peripherals = Peripherals::take().context("peripherals")?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    // 1. Settings (read-only for the rest of the process lifetime).
    let settings = load_settings(nvs_partition.clone());

    // 2. Connectivity. Missing credentials or a failed association
    //    both degrade to the offline store; the loop runs regardless.
    let mut _wifi = None;
    let mut _sntp = None;
    let store = match (
        config::WIFI_SSID,
        config::WIFI_PASS,
        config::API_URL,
        config::API_KEY,
    ) {
        (Some(ssid), Some(pass), Some(url), Some(key)) => {
            match wifi::connect(peripherals.modem, sysloop, nvs_partition, ssid, pass) {
                Ok(connected) => {
                    _wifi = Some(connected);
                    _sntp = wifi::start_sntp().ok();
                    RemoteStore::new(EspTransport::new(url, key))
                }
                Err(e) => {
                    warn!("wifi failed ({e}); running offline");
                    RemoteStore::offline()
                }
            }
        }
        _ => {
            warn!("{}; running offline", Error::ConfigMissing);
            RemoteStore::offline()
        }
    };

    // 3. Display.
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio5,
        peripherals.pins.gpio6,
        &I2cConfig::new().baudrate(config::I2C_FREQ_HZ.Hz()),
    )?;
    let mut board = Board {
        display: display::init(i2c),
        led: PinDriver::output(peripherals.pins.gpio8)?,
        buzzer: PinDriver::output(peripherals.pins.gpio10)?,
    };

    // 4. Inputs.
    init_inputs()?;

    // 5. The cooperative loop. Nothing below this line returns.
    let mut app = App::new(settings, store);
    info!("entering main loop");
    loop {
        let frame = app.tick(&INPUT, &mut board);
        board.render(&frame);
        FreeRtos::delay_ms(TICK_MS);
    }
}
