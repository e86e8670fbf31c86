// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// 手动触发请求DTO
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[validate(schema(function = "validate_id_range"))]
pub struct ManualRunRequestDto {
    /// 起始ID（包含）
    #[validate(range(min = 1))]
    pub start_id: i64,
    /// 结束ID（包含）
    #[validate(range(min = 1))]
    pub end_id: i64,
}

fn validate_id_range(req: &ManualRunRequestDto) -> Result<(), validator::ValidationError> {
    if req.end_id < req.start_id {
        let mut err = validator::ValidationError::new("id_range");
        err.message = Some("end_id must not be before start_id".into());
        return Err(err);
    }
    Ok(())
}

/// 任务列表查询DTO
#[derive(Debug, Default, Deserialize, Serialize, Validate)]
pub struct JobListQueryDto {
    /// 返回数量上限
    #[validate(range(min = 1, max = 200))]
    pub limit: Option<u64>,
}

impl JobListQueryDto {
    pub fn limit_or_default(&self) -> u64 {
        self.limit.unwrap_or(20)
    }
}
