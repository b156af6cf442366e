#[macro_use]
extern crate serde;

pub mod commands;
pub mod error;
pub mod exec;
pub mod fabric;
pub mod ipam;
pub mod network;
pub mod plugin;
pub mod store;

#[cfg(test)]
mod test;
