// Copyright (c) The minnow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod cache_tests;
mod dsl_tests;
mod fixture_helpers;
mod invalidator_tests;
mod key_tests;
