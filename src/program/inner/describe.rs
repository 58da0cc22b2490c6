/*
 * @Author       : 老董
 * @Date         : 2026-10-14
 * @Description  : Program 的文本渲染与描述符导出/导入
 */

use super::Program;
use crate::errors::ProgramError;
use crate::program::descriptor::ProgramDescriptor;
use crate::program::operator::OpDesc;
use crate::program::types::VarRole;
use std::collections::HashSet;
use std::fmt;

impl Program {
    // ========== 文本渲染 ==========

    /// 按声明/追加顺序渲染全部变量与算子
    ///
    /// 输出稳定且确定：以相同调用序列构建的两个程序渲染结果相同（不含进程内 ID）。
    /// 仅用于诊断和测试比对，不用于执行。
    ///
    /// # 示例
    /// ```
    /// use layer_graph::layers;
    /// use layer_graph::program::{DataType, Program};
    ///
    /// let mut program = Program::new();
    /// layers::data(&mut program, "x", &[13], DataType::Float32).unwrap();
    /// assert!(program.render().contains("x : float32 [?, 13] input"));
    /// ```
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "program {} ({} vars, {} ops)\n",
            self.name,
            self.vars.len(),
            self.ops.len()
        ));
        out.push_str("vars:\n");
        for var in &self.vars {
            out.push_str(&format!("  {var}\n"));
        }
        out.push_str("ops:\n");
        for op in &self.ops {
            out.push_str(&format!("  {op}\n"));
        }
        if let Some(loss) = &self.backward_loss {
            out.push_str(&format!("backward: {loss}\n"));
        }
        out
    }

    // ========== 描述符 ==========

    /// 导出程序的描述符
    pub fn describe(&self) -> ProgramDescriptor {
        let mut descriptor = ProgramDescriptor::new(&self.name);
        descriptor.vars = self.vars.clone();
        descriptor.ops = self.ops.clone();
        descriptor.backward_loss = self.backward_loss.clone();
        descriptor
    }

    /// 导出为 JSON 字符串
    pub fn to_json(&self) -> Result<String, ProgramError> {
        self.describe().to_json()
    }

    /// 从描述符重建程序（分配新的程序 ID）
    ///
    /// 重新校验变量名唯一、算子序号连续、算子只引用已声明的变量，
    /// 且每个输入在引用前已定义、每个输出只有一个生产者。
    pub fn from_descriptor(descriptor: &ProgramDescriptor) -> Result<Self, ProgramError> {
        let mut program = Self::with_name(&descriptor.name);
        for var in &descriptor.vars {
            if program.has_var(&var.name) {
                return Err(ProgramError::NameConflict {
                    name: var.name.clone(),
                    existing: var.signature(),
                    requested: "重复声明".to_string(),
                });
            }
            program.push_var(var.clone());
        }

        // 已定义的变量：数据、参数，以及没有生产算子的梯度（损失梯度种子）
        let produced: HashSet<&str> = descriptor
            .ops
            .iter()
            .flat_map(|op| op.output_names())
            .collect();
        let mut defined: HashSet<&str> = descriptor
            .vars
            .iter()
            .filter(|v| match v.role {
                VarRole::Input | VarRole::Parameter => true,
                VarRole::Gradient => !produced.contains(v.name.as_str()),
                VarRole::Output => false,
            })
            .map(|v| v.name.as_str())
            .collect();

        for (expected, op) in descriptor.ops.iter().enumerate() {
            if op.index != expected {
                return Err(ProgramError::InvalidOperation(format!(
                    "算子序号不连续：预期{expected}，实际{}",
                    op.index
                )));
            }
            for name in op.input_names() {
                if program.has_var(name) && !defined.contains(name) {
                    return Err(ProgramError::InvalidOperation(format!(
                        "算子#{expected}的输入`{name}`在其生产算子之前被引用"
                    )));
                }
            }
            for name in op.output_names() {
                if defined.contains(name) {
                    return Err(ProgramError::InvalidOperation(format!(
                        "算子#{expected}的输出`{name}`已由其他算子或声明定义"
                    )));
                }
            }
            let OpDesc {
                kind,
                inputs,
                outputs,
                ..
            } = op.clone();
            program.push_op(kind, inputs, outputs)?;
            defined.extend(op.output_names());
        }
        if let Some(loss) = &descriptor.backward_loss {
            if !program.has_var(loss) {
                return Err(ProgramError::VariableNotFound(loss.clone()));
            }
            program.backward_loss = Some(loss.clone());
        }
        Ok(program)
    }

    /// 从 JSON 字符串重建程序
    pub fn from_json(json: &str) -> Result<Self, ProgramError> {
        Self::from_descriptor(&ProgramDescriptor::from_json(json)?)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}
