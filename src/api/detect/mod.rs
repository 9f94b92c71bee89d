// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection API endpoint module
//!
//! Provides POST /api/detect for synchronous object detection on an upload.

pub mod handler;

pub use handler::detect_handler;
