// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analysis history endpoints

pub mod handler;
pub mod response;

pub use handler::{delete_analysis_handler, get_analysis_handler, list_analyses_handler};
pub use response::DeleteResponse;
