#![deny(warnings)]

pub mod config;
pub mod decode;
pub mod emotion;
