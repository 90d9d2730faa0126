pub mod common;

mod listing_tests;
mod monitor_tests;
