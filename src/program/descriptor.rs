/*
 * @Author       : 老董
 * @Date         : 2026-10-14
 * @Description  : 程序描述符（Program Descriptor）
 *                 可序列化的中间表示，供执行引擎或调试工具消费
 */

use super::operator::OpDesc;
use super::variable::VarDesc;
use crate::errors::ProgramError;
use serde::{Deserialize, Serialize};

/// 程序的可序列化描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramDescriptor {
    /// 格式版本（用于向后兼容）
    pub version: String,
    /// 程序名称
    pub name: String,
    /// 按声明顺序排列的变量
    pub vars: Vec<VarDesc>,
    /// 按追加顺序排列的算子
    pub ops: Vec<OpDesc>,
    /// 已追加反向传播的损失变量名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backward_loss: Option<String>,
}

impl ProgramDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            name: name.to_string(),
            vars: Vec::new(),
            ops: Vec::new(),
            backward_loss: None,
        }
    }

    /// 参数变量总元素数（含动态维度的参数不计入）
    pub fn total_params(&self) -> usize {
        self.vars
            .iter()
            .filter(|v| v.role == super::VarRole::Parameter)
            .filter_map(|v| v.shape.numel())
            .sum()
    }

    /// 转换为 JSON 字符串
    pub fn to_json(&self) -> Result<String, ProgramError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 从 JSON 字符串解析
    pub fn from_json(json: &str) -> Result<Self, ProgramError> {
        Ok(serde_json::from_str(json)?)
    }
}
