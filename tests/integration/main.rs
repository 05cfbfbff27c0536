//! Integration tests for listing-harvest

mod pipeline_tests;
