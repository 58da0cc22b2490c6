/*
 * @Author       : 老董
 * @Date         : 2026-10-12
 * @Description  : Program 模块的基础类型：程序 ID、数据类型、变量角色、激活与池化种类
 */

use crate::errors::ProgramError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 程序 ID（进程内唯一），用于识别变量句柄的归属
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgramId(pub u64);

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "程序#{}", self.0)
    }
}

/// 元素数据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl DataType {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    pub const fn is_integer(&self) -> bool {
        matches!(self, Self::Int32 | Self::Int64)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DataType {
    type Err = ProgramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bool" => Ok(Self::Bool),
            "int32" => Ok(Self::Int32),
            "int64" => Ok(Self::Int64),
            "float32" => Ok(Self::Float32),
            "float64" => Ok(Self::Float64),
            _ => Err(ProgramError::UnknownDataType(s.to_string())),
        }
    }
}

/// 变量在程序中的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarRole {
    /// 数据输入（由 `data` 层声明）
    Input,
    /// 可训练参数
    Parameter,
    /// 算子输出（中间结果）
    Output,
    /// 反向传播产生的梯度
    Gradient,
}

impl VarRole {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Parameter => "parameter",
            Self::Output => "output",
            Self::Gradient => "gradient",
        }
    }
}

impl fmt::Display for VarRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 激活函数种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Sigmoid,
    Tanh,
    Softmax,
    Exp,
    Abs,
}

impl Activation {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Relu => "relu",
            Self::Sigmoid => "sigmoid",
            Self::Tanh => "tanh",
            Self::Softmax => "softmax",
            Self::Exp => "exp",
            Self::Abs => "abs",
        }
    }

    /// 解析层参数中的激活名称
    ///
    /// `None`、`"none"`、`"linear"` 和空串表示不使用激活；其余未识别名称返回 `UnknownActivation`。
    ///
    /// # 示例
    /// ```
    /// use layer_graph::program::Activation;
    ///
    /// assert_eq!(Activation::parse(Some("relu")).unwrap(), Some(Activation::Relu));
    /// assert_eq!(Activation::parse(None).unwrap(), None);
    /// assert!(Activation::parse(Some("not_a_real_activation")).is_err());
    /// ```
    pub fn parse(name: Option<&str>) -> Result<Option<Self>, ProgramError> {
        match name {
            None | Some("" | "none" | "linear") => Ok(None),
            Some(name) => name.parse().map(Some),
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Activation {
    type Err = ProgramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relu" => Ok(Self::Relu),
            "sigmoid" => Ok(Self::Sigmoid),
            "tanh" => Ok(Self::Tanh),
            "softmax" => Ok(Self::Softmax),
            "exp" => Ok(Self::Exp),
            "abs" => Ok(Self::Abs),
            _ => Err(ProgramError::UnknownActivation(s.to_string())),
        }
    }
}

/// 池化种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolType {
    #[default]
    Max,
    Avg,
}

impl PoolType {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Max => "max",
            Self::Avg => "avg",
        }
    }
}

impl fmt::Display for PoolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
