pub mod classify;
pub mod commands;
pub mod connection;
pub mod discovery;
pub mod escpos;
pub mod models;
pub mod resolver;

#[cfg(test)]
pub mod testing;
