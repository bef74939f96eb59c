//! Build script - forwards Wi-Fi and record-store credentials from an
//! optional `.env` file into compile-time environment variables.
//!
//! Missing `.env` (or missing keys) is fine: the corresponding
//! `option_env!` consts resolve to `None` and the firmware boots into
//! its offline display state.

fn main() {
    if dotenvy::dotenv().is_ok() {
        for key in [
            "DOSEWATCH_WIFI_SSID",
            "DOSEWATCH_WIFI_PASS",
            "DOSEWATCH_API_URL",
            "DOSEWATCH_API_KEY",
        ] {
            if let Ok(value) = std::env::var(key) {
                println!("cargo:rustc-env={key}={value}");
            }
        }
    }

    println!("cargo:rerun-if-changed=.env");
    println!("cargo:rerun-if-changed=build.rs");
}
