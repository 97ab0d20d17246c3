pub mod alert;
pub mod config;
pub mod error;
pub mod homework;
pub mod logging;
pub mod poller;

#[cfg(test)]
mod test_support;
