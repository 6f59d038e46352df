#![allow(dead_code, unused_imports)]
pub mod atg;
pub mod builder_macro;
pub mod authentication_list_management;
pub mod cache;
pub mod common;
pub mod core;
pub mod error;
pub mod event;
pub mod firmware_management;
pub mod session;
pub mod smart_charging;
pub mod station;
pub mod timers;
pub mod transport;
pub mod validator;
pub mod wire;
#[macro_use]
extern crate lazy_static;
