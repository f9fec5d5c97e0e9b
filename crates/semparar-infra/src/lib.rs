//! Infrastructure adapters for the Sem Parar report service.
//!
//! Implements the seams `semparar-core` is written against: the MQTT
//! transport (rumqttc) behind [`semparar_core::channel::Transport`], the
//! WebDriver session (fantoccini) behind [`semparar_core::ui::UiDriver`],
//! and the environment settings loader.

pub mod mqtt;
pub mod settings;
pub mod webdriver;
