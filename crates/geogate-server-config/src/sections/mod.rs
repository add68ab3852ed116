// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod anomaly;
mod database;
mod files;
mod logging;
mod policy;

pub use anomaly::*;
pub use database::*;
pub use files::*;
pub use logging::*;
pub use policy::*;
