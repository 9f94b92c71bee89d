// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Export API endpoint module
//!
//! Provides /api/export/{id} for downloading annotations as a ZIP archive
//! and /api/exports for the export log.

pub mod handler;
pub mod request;

pub use handler::{export_handler, list_exports_handler};
pub use request::ExportQuery;
