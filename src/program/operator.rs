/*
 * @Author       : 老董
 * @Date         : 2026-10-13
 * @Description  : 算子描述：种类 + 类型化属性 + 具名输入/输出槽
 */

use super::shape::DynamicShape;
use super::types::{Activation, DataType, PoolType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 算子种类（包含类型特定属性）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpKind {
    Fc {
        size: usize,
        #[serde(default)]
        activation: Option<Activation>,
    },
    Conv2d {
        num_filters: usize,
        filter_size: (usize, usize),
        stride: (usize, usize),
        padding: (usize, usize),
        groups: usize,
        #[serde(default)]
        activation: Option<Activation>,
    },
    Pool2d {
        pool_type: PoolType,
        pool_size: (usize, usize),
        stride: (usize, usize),
        padding: (usize, usize),
        global_pooling: bool,
    },
    LookupTable {
        is_sparse: bool,
    },
    Concat {
        axis: usize,
    },
    Sum,
    CrossEntropy,
    SquareErrorCost,
    Mean,
    /// 反向传播追加的梯度算子，`forward` 为其对应的前向算子种类
    Grad {
        forward: Box<OpKind>,
    },
}

impl OpKind {
    /// 算子类型名（梯度算子为 `<前向类型>_grad`）
    pub fn type_name(&self) -> String {
        match self {
            Self::Fc { .. } => "fc".to_string(),
            Self::Conv2d { .. } => "conv2d".to_string(),
            Self::Pool2d { .. } => "pool2d".to_string(),
            Self::LookupTable { .. } => "lookup_table".to_string(),
            Self::Concat { .. } => "concat".to_string(),
            Self::Sum => "sum".to_string(),
            Self::CrossEntropy => "cross_entropy".to_string(),
            Self::SquareErrorCost => "square_error_cost".to_string(),
            Self::Mean => "mean".to_string(),
            Self::Grad { forward } => format!("{}_grad", forward.type_name()),
        }
    }

    pub const fn is_grad(&self) -> bool {
        matches!(self, Self::Grad { .. })
    }

    /// 属性的文本形式，如 `size=1, act=relu`；无属性时为空串
    pub fn attrs_string(&self) -> String {
        fn act(a: &Option<Activation>) -> String {
            a.map_or_else(|| "none".to_string(), |a| a.to_string())
        }
        match self {
            Self::Fc { size, activation } => format!("size={size}, act={}", act(activation)),
            Self::Conv2d {
                num_filters,
                filter_size,
                stride,
                padding,
                groups,
                activation,
            } => format!(
                "num_filters={num_filters}, filter_size={}x{}, stride={}x{}, padding={}x{}, groups={groups}, act={}",
                filter_size.0,
                filter_size.1,
                stride.0,
                stride.1,
                padding.0,
                padding.1,
                act(activation)
            ),
            Self::Pool2d {
                pool_type,
                pool_size,
                stride,
                padding,
                global_pooling,
            } => format!(
                "pool_type={pool_type}, pool_size={}x{}, stride={}x{}, padding={}x{}, global={global_pooling}",
                pool_size.0, pool_size.1, stride.0, stride.1, padding.0, padding.1
            ),
            Self::LookupTable { is_sparse } => format!("is_sparse={is_sparse}"),
            Self::Concat { axis } => format!("axis={axis}"),
            Self::Sum | Self::CrossEntropy | Self::SquareErrorCost | Self::Mean => String::new(),
            Self::Grad { forward } => forward.attrs_string(),
        }
    }
}

/// 具名槽及其绑定的变量名
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpArg {
    pub parameter: String,
    pub arguments: Vec<String>,
}

impl OpArg {
    pub fn new(parameter: &str, arguments: Vec<String>) -> Self {
        Self {
            parameter: parameter.to_string(),
            arguments,
        }
    }
}

impl fmt::Display for OpArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=[{}]", self.parameter, self.arguments.join(", "))
    }
}

/// 算子描述（追加后不可变）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpDesc {
    /// 在程序中的追加序号
    pub index: usize,
    pub kind: OpKind,
    pub inputs: Vec<OpArg>,
    pub outputs: Vec<OpArg>,
}

impl OpDesc {
    pub fn type_name(&self) -> String {
        self.kind.type_name()
    }

    /// 获取指定输入槽绑定的变量名
    pub fn input(&self, parameter: &str) -> Option<&[String]> {
        self.inputs
            .iter()
            .find(|arg| arg.parameter == parameter)
            .map(|arg| arg.arguments.as_slice())
    }

    /// 获取指定输出槽绑定的变量名
    pub fn output(&self, parameter: &str) -> Option<&[String]> {
        self.outputs
            .iter()
            .find(|arg| arg.parameter == parameter)
            .map(|arg| arg.arguments.as_slice())
    }

    /// 按槽顺序展开的全部输入变量名（可能有重复）
    pub fn input_names(&self) -> impl Iterator<Item = &str> {
        self.inputs
            .iter()
            .flat_map(|arg| arg.arguments.iter().map(String::as_str))
    }

    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs
            .iter()
            .flat_map(|arg| arg.arguments.iter().map(String::as_str))
    }
}

impl fmt::Display for OpDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |args: &[OpArg]| {
            args.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(
            f,
            "#{} {}({}) -> ({})",
            self.index,
            self.type_name(),
            join(&self.inputs),
            join(&self.outputs)
        )?;
        let attrs = self.kind.attrs_string();
        if !attrs.is_empty() {
            write!(f, " {{{attrs}}}")?;
        }
        Ok(())
    }
}

/// 算子输出规格：输出槽、形状、类型，以及可选的显式变量名
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSpec {
    pub parameter: String,
    pub shape: DynamicShape,
    pub data_type: DataType,
    pub name: Option<String>,
}

impl OutputSpec {
    pub fn new(parameter: &str, shape: DynamicShape, data_type: DataType) -> Self {
        Self {
            parameter: parameter.to_string(),
            shape,
            data_type,
            name: None,
        }
    }

    /// 指定输出变量名（未指定时按 `<算子类型>_<n>.tmp_<i>` 生成）
    pub fn named(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }
}
