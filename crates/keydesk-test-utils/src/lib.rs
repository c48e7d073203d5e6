// SPDX-FileCopyrightText: 2026 Keydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for keydesk integration tests.

pub mod harness;
pub mod mock_channel;

pub use harness::{BrokerHarness, BrokerHarnessBuilder};
pub use mock_channel::MockChannel;
