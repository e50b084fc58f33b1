use super::test_helpers::*;
use super::*;
use crate::types::{JobSnapshot, JobState};
use std::time::Duration;

mod progress;
