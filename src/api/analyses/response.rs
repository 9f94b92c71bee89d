// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body returned by the DELETE endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub id: Uuid,
}

impl DeleteResponse {
    pub fn new(id: Uuid) -> Self {
        Self { deleted: true, id }
    }
}
