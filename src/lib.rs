// Copyright 2026 The Delta Relay Project
// SPDX-License-Identifier: Apache-2.0

pub mod config;
pub mod message;
pub mod proxy;
pub mod stream;
pub mod transcript;
pub mod upstream;
