/*
 * @Author       : 老董
 * @Date         : 2026-10-14
 * @Description  : Program 反向子图追加
 *
 * 只追加描述梯度计算的算子，不执行任何数值计算。
 */

use super::Program;
use crate::errors::ProgramError;
use crate::program::operator::{OpArg, OpKind};
use crate::program::types::VarRole;
use crate::program::variable::{VarDesc, VarHandle};
use std::collections::{HashMap, HashSet};
use tracing::info;

/// 梯度变量名后缀
pub const GRAD_SUFFIX: &str = "@GRAD";

/// 变量 `name` 的梯度变量名，如 `fc_0.w_0@GRAD`
pub fn grad_var_name(name: &str) -> String {
    format!("{name}{GRAD_SUFFIX}")
}

impl Program {
    /// 为标量损失追加反向子图
    ///
    /// 逆序遍历前向算子：位于通往 `loss` 的依赖链上、且至少有一个输入需要梯度的算子，
    /// 各追加一个 `<类型>_grad` 算子。被多个算子消费的变量，其各路部分梯度
    /// （`<var>@GRAD@RENAME@<k>`）由一个 `sum` 算子累加为 `<var>@GRAD`。
    ///
    /// 返回 `(参数, 参数梯度)` 列表（参数声明顺序）。
    ///
    /// 一个程序只允许追加一次反向子图：再次调用（无论损失是否相同）返回
    /// `AlreadyDifferentiated`，其中携带首次反向传播的损失名。
    pub fn append_backward(
        &mut self,
        loss: &VarHandle,
    ) -> Result<Vec<(VarHandle, VarHandle)>, ProgramError> {
        let loss_desc = self.resolve(loss)?;
        if !loss_desc.shape.is_scalar() {
            return Err(ProgramError::NonScalarLoss {
                name: loss_desc.name.clone(),
                shape: loss_desc.shape.clone(),
            });
        }
        if loss_desc.role != VarRole::Output {
            return Err(ProgramError::InvalidOperation(format!(
                "损失`{}`须为算子输出，实际为{}",
                loss_desc.name, loss_desc.role
            )));
        }
        let loss_name = loss_desc.name.clone();
        if let Some(previous) = &self.backward_loss {
            return Err(ProgramError::AlreadyDifferentiated(previous.clone()));
        }

        let requires = self.requires_grad_set();
        let relevant = self.relevant_ops(&loss_name, &requires);
        let mut consumers: HashMap<String, usize> = HashMap::new();
        for &index in &relevant {
            for name in self.ops[index].input_names() {
                if requires.contains(name) {
                    *consumers.entry(name.to_string()).or_insert(0) += 1;
                }
            }
        }

        let ops_before = self.ops.len();
        let pairs = self.atomic(|p| {
            p.build_backward(&loss_name, &relevant, &requires, &consumers)?;
            p.backward_loss = Some(loss_name.clone());
            p.param_grad_pairs()
        })?;

        info!(
            "{}: 为`{loss_name}`追加反向子图，新增{}个算子，覆盖{}个参数",
            self.name,
            self.ops.len() - ops_before,
            pairs.len()
        );
        Ok(pairs)
    }

    /// 需要梯度的变量集合：未 stop_gradient 的参数，以及任一输入需要梯度的算子的输出
    fn requires_grad_set(&self) -> HashSet<String> {
        let mut requires: HashSet<String> = self
            .vars
            .iter()
            .filter(|v| v.role == VarRole::Parameter && !v.stop_gradient)
            .map(|v| v.name.clone())
            .collect();

        for op in &self.ops {
            if !op.input_names().any(|name| requires.contains(name)) {
                continue;
            }
            for out in op.output_names() {
                if self.var(out).is_some_and(|v| !v.stop_gradient) {
                    requires.insert(out.to_string());
                }
            }
        }
        requires
    }

    /// 逆序列出通往 `loss` 的依赖链上、需要追加梯度算子的前向算子下标
    fn relevant_ops(&self, loss_name: &str, requires: &HashSet<String>) -> Vec<usize> {
        let mut needed: HashSet<&str> = HashSet::from([loss_name]);
        let mut relevant = Vec::new();

        for op in self.ops.iter().rev() {
            if !op.output_names().any(|name| needed.contains(name)) {
                continue;
            }
            let requiring: Vec<&str> = op
                .input_names()
                .filter(|name| requires.contains(*name))
                .collect();
            if requiring.is_empty() {
                continue;
            }
            relevant.push(op.index);
            needed.extend(requiring);
        }
        relevant
    }

    fn build_backward(
        &mut self,
        loss_name: &str,
        relevant: &[usize],
        requires: &HashSet<String>,
        consumers: &HashMap<String, usize>,
    ) -> Result<(), ProgramError> {
        // 损失梯度的种子（执行时填 1）
        self.push_grad_var(loss_name, &grad_var_name(loss_name))?;

        let mut partials: HashMap<String, Vec<String>> = HashMap::new();
        for &index in relevant {
            let op = self.ops[index].clone();

            // 先汇总各输出尚未累加的部分梯度
            for out in op.output_names() {
                self.accumulate_partials(out, &mut partials)?;
            }

            let mut inputs = op.inputs.clone();
            inputs.extend(op.outputs.iter().cloned());
            for arg in &op.outputs {
                let grads: Vec<String> = arg
                    .arguments
                    .iter()
                    .map(|name| grad_var_name(name))
                    .filter(|grad| self.has_var(grad))
                    .collect();
                if !grads.is_empty() {
                    inputs.push(OpArg::new(&grad_var_name(&arg.parameter), grads));
                }
            }

            let mut outputs = Vec::new();
            for arg in &op.inputs {
                let mut grads = Vec::new();
                for name in &arg.arguments {
                    if !requires.contains(name) {
                        continue;
                    }
                    let target = if consumers.get(name).copied().unwrap_or(0) > 1 {
                        let list = partials.entry(name.clone()).or_default();
                        let partial = format!("{}@RENAME@{}", grad_var_name(name), list.len());
                        list.push(partial.clone());
                        partial
                    } else {
                        grad_var_name(name)
                    };
                    self.push_grad_var(name, &target)?;
                    grads.push(target);
                }
                if !grads.is_empty() {
                    outputs.push(OpArg::new(&grad_var_name(&arg.parameter), grads));
                }
            }

            self.push_op(
                OpKind::Grad {
                    forward: Box::new(op.kind.clone()),
                },
                inputs,
                outputs,
            )?;
        }

        // 叶子变量（参数）的部分梯度在最后汇总
        let leaves: Vec<String> = self
            .vars
            .iter()
            .filter(|v| partials.contains_key(&v.name))
            .map(|v| v.name.clone())
            .collect();
        for name in leaves {
            self.accumulate_partials(&name, &mut partials)?;
        }
        Ok(())
    }

    /// 若 `name` 有待累加的部分梯度，追加一个 sum 算子得到 `name@GRAD`
    fn accumulate_partials(
        &mut self,
        name: &str,
        partials: &mut HashMap<String, Vec<String>>,
    ) -> Result<(), ProgramError> {
        let Some(parts) = partials.remove(name) else {
            return Ok(());
        };
        let grad = grad_var_name(name);
        self.push_grad_var(name, &grad)?;
        self.push_op(
            OpKind::Sum,
            vec![OpArg::new("X", parts)],
            vec![OpArg::new("Out", vec![grad])],
        )?;
        Ok(())
    }

    /// 注册与前向变量同形状、同类型的梯度变量
    fn push_grad_var(&mut self, forward: &str, grad: &str) -> Result<(), ProgramError> {
        let fwd = self
            .var(forward)
            .ok_or_else(|| ProgramError::VariableNotFound(forward.to_string()))?;
        if let Some(existing) = self.var(grad) {
            return Err(ProgramError::NameConflict {
                name: grad.to_string(),
                existing: existing.signature(),
                requested: format!("`{forward}`的梯度"),
            });
        }
        let mut desc = VarDesc::new(grad, fwd.shape.clone(), fwd.data_type, VarRole::Gradient);
        desc.grad_of = Some(forward.to_string());
        self.push_var(desc);
        Ok(())
    }

    fn param_grad_pairs(&self) -> Result<Vec<(VarHandle, VarHandle)>, ProgramError> {
        self.vars
            .iter()
            .filter(|v| v.role == VarRole::Parameter)
            .filter(|v| self.has_var(&grad_var_name(&v.name)))
            .map(|v| Ok((self.handle(&v.name)?, self.handle(&grad_var_name(&v.name))?)))
            .collect()
    }
}
