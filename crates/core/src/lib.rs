#![deny(rust_2018_idioms)]

pub mod commands;
pub mod component;
pub mod platform;
pub mod sender;
pub mod session;
pub mod translation;

#[cfg(test)]
mod testing;
