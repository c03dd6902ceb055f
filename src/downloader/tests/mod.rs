use super::*;
use crate::downloader::test_helpers::{
    SAMPLE_CSV, StubStrategy, create_test_downloader, wait_for_terminal,
};
use crate::progress::TaskStatus;
use std::time::Duration;
