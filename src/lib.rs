// Copyright (c) 2025 Ledgerbook Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod db;
pub mod error;
pub mod models;
pub mod sanitize;
pub mod services;
pub mod utils;

pub use error::{Error, Result};
