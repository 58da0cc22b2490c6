/*
 * @Author       : 老董
 * @Date         : 2026-10-12
 * @Description  : 变量描述与变量句柄
 */

use super::attr::Initializer;
use super::shape::DynamicShape;
use super::types::{DataType, ProgramId, VarRole};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 程序中一个命名变量的完整描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDesc {
    pub name: String,
    pub shape: DynamicShape,
    pub data_type: DataType,
    pub role: VarRole,
    /// 仅参数有意义
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initializer: Option<Initializer>,
    /// 为 true 时反向传播不穿过该变量（数据输入默认如此）
    #[serde(default)]
    pub stop_gradient: bool,
    /// 梯度变量所对应的前向变量
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grad_of: Option<String>,
}

impl VarDesc {
    pub(in crate::program) fn new(
        name: &str,
        shape: DynamicShape,
        data_type: DataType,
        role: VarRole,
    ) -> Self {
        Self {
            name: name.to_string(),
            shape,
            data_type,
            role,
            initializer: None,
            stop_gradient: matches!(role, VarRole::Input),
            grad_of: None,
        }
    }

    /// 形状与类型的简短描述（用于冲突报错）
    pub(in crate::program) fn signature(&self) -> String {
        format!("{} {}", self.data_type, self.shape)
    }
}

impl fmt::Display for VarDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} : {} {} {}",
            self.name, self.data_type, self.shape, self.role
        )?;
        if let Some(init) = &self.initializer {
            write!(f, " init={init}")?;
        }
        if self.stop_gradient && self.role != VarRole::Input {
            write!(f, " stop_gradient")?;
        }
        if let Some(fwd) = &self.grad_of {
            write!(f, " grad_of={fwd}")?;
        }
        Ok(())
    }
}

/// 变量句柄：指向某个 Program 中的一个命名变量
///
/// 句柄只对创建它的 Program 有效，传给其他 Program 会得到 `ForeignHandle` 错误。
#[derive(Debug, Clone, PartialEq)]
pub struct VarHandle {
    program_id: ProgramId,
    name: String,
    shape: DynamicShape,
    data_type: DataType,
}

impl VarHandle {
    pub(in crate::program) fn new(program_id: ProgramId, desc: &VarDesc) -> Self {
        Self {
            program_id,
            name: desc.name.clone(),
            shape: desc.shape.clone(),
            data_type: desc.data_type,
        }
    }

    pub const fn program_id(&self) -> ProgramId {
        self.program_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn shape(&self) -> &DynamicShape {
        &self.shape
    }

    pub const fn data_type(&self) -> DataType {
        self.data_type
    }
}

impl fmt::Display for VarHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({} {})", self.name, self.data_type, self.shape)
    }
}
