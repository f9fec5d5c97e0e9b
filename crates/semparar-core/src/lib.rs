//! Correlation engine and report workflow for the Sem Parar report service.
//!
//! This crate is written against two collaborator seams and never touches
//! MQTT or WebDriver directly:
//!
//! - [`channel::Transport`] -- publishing raw payloads on the bus;
//! - [`ui::UiDriver`] / [`ui::UiLauncher`] -- the browser-automation
//!   primitives the workflow calls into.
//!
//! `semparar-infra` provides the rumqttc and fantoccini implementations.

pub mod bus;
pub mod captcha;
pub mod channel;
pub mod dispatch;
pub mod supervisor;
pub mod ui;
pub mod workflow;
