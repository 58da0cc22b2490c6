/*
 * @Author       : 老董
 * @Date         : 2026-10-12
 * @Description  : 参数配置记录：参数名（用于权值共享）与初始化方式
 */

use crate::errors::ProgramError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 参数初始化方式（仅作描述，不在建图时生成数值）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Initializer {
    /// [min, max] 均匀分布
    UniformRandom { min: f32, max: f32 },
    /// 正态分布
    Gaussian { mean: f32, std: f32 },
    /// 常量填充
    Constant { value: f32 },
}

impl Initializer {
    /// 权重默认初始化：U(-1, 1)
    pub const fn default_weight() -> Self {
        Self::UniformRandom {
            min: -1.0,
            max: 1.0,
        }
    }

    /// 偏置默认初始化：全零
    pub const fn default_bias() -> Self {
        Self::Constant { value: 0.0 }
    }

    pub(crate) fn validate(&self) -> Result<(), ProgramError> {
        match *self {
            Self::UniformRandom { min, max } if !(min <= max) => Err(
                ProgramError::InvalidOperation(format!(
                    "均匀分布初始化要求 min ≤ max，实际 min={min}, max={max}"
                )),
            ),
            Self::Gaussian { std, .. } if !(std >= 0.0) => Err(ProgramError::InvalidOperation(
                format!("正态分布初始化要求 std ≥ 0，实际 std={std}"),
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Initializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UniformRandom { min, max } => write!(f, "uniform_random(min={min}, max={max})"),
            Self::Gaussian { mean, std } => write!(f, "gaussian(mean={mean}, std={std})"),
            Self::Constant { value } => write!(f, "constant(value={value})"),
        }
    }
}

/// 参数属性
///
/// - `name` 为 None 时由层自动生成唯一名称
/// - `name` 指向已存在的参数时，两个算子共享同一参数变量（权值共享），此时 `initializer` 被忽略
///
/// # 示例
/// ```
/// use layer_graph::program::{Initializer, ParamAttr};
///
/// let first = ParamAttr::named("shared_w")
///     .with_initializer(Initializer::UniformRandom { min: -1.0, max: 1.0 });
/// let again = ParamAttr::named("shared_w");
/// assert_eq!(first.name, again.name);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamAttr {
    pub name: Option<String>,
    pub initializer: Option<Initializer>,
}

impl ParamAttr {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按名称引用（或首次声明）参数
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            initializer: None,
        }
    }

    pub fn with_initializer(mut self, initializer: Initializer) -> Self {
        self.initializer = Some(initializer);
        self
    }
}
