#![cfg(unix)]

mod common;
mod publish_tests;
mod remove_tests;
