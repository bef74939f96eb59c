//! Hardware user-interface glue (firmware builds only).
//!
//! The control core emits [`crate::platform::Frame`] values; this
//! module owns the SSD1306 sink that renders them.

pub mod display;
