//! Wi-Fi association and SNTP startup (firmware builds only).
//!
//! Thin blocking wrappers around the ESP-IDF services. Failures here
//! degrade the device to its offline display state; they never stop
//! the main loop from starting.

use anyhow::{anyhow, Context};
use embedded_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sntp::EspSntp;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::info;

/// Associate with the configured access point, blocking until the
/// interface is up.
pub fn connect(
    modem: Modem,
    sysloop: EspSystemEventLoop,
    nvs: EspDefaultNvsPartition,
    ssid: &str,
    pass: &str,
) -> anyhow::Result<BlockingWifi<EspWifi<'static>>> {
    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(modem, sysloop.clone(), Some(nvs)).context("wifi driver init")?,
        sysloop,
    )
    .context("wifi event loop")?;

    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: ssid.try_into().map_err(|_| anyhow!("ssid too long"))?,
        password: pass.try_into().map_err(|_| anyhow!("passphrase too long"))?,
        auth_method: AuthMethod::WPA2Personal,
        ..Default::default()
    }))?;

    wifi.start()?;
    wifi.connect()?;
    wifi.wait_netif_up()?;

    info!("wifi up: {ssid}");
    Ok(wifi)
}

/// Start SNTP. Synchronization completes in the background; the loop
/// treats the wall clock as unknown until it does.
pub fn start_sntp() -> anyhow::Result<EspSntp<'static>> {
    let sntp = EspSntp::new_default().context("sntp init")?;
    info!("sntp started");
    Ok(sntp)
}
