/*
 * @Author       : 老董
 * @Date         : 2026-10-13
 * @Description  : Program 核心操作：变量注册、参数创建、算子追加、原子回滚
 */

use super::{Checkpoint, Program};
use crate::errors::ProgramError;
use crate::program::attr::{Initializer, ParamAttr};
use crate::program::operator::{OpArg, OpDesc, OpKind, OutputSpec};
use crate::program::shape::DynamicShape;
use crate::program::types::{DataType, ProgramId, VarRole};
use crate::program::variable::{VarDesc, VarHandle};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

static NEXT_PROGRAM_ID: AtomicU64 = AtomicU64::new(1);

impl Program {
    // ========== 创建 ==========

    pub fn new() -> Self {
        Self::with_name("main_program")
    }

    pub fn with_name(name: &str) -> Self {
        Self {
            id: ProgramId(NEXT_PROGRAM_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.to_string(),
            ops: Vec::new(),
            vars: Vec::new(),
            var_index: HashMap::new(),
            name_counters: HashMap::new(),
            backward_loss: None,
        }
    }

    // ========== 基础访问器 ==========

    pub const fn id(&self) -> ProgramId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 按追加顺序的全部算子
    pub fn ops(&self) -> &[OpDesc] {
        &self.ops
    }

    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    /// 按声明顺序的全部变量
    pub fn vars(&self) -> &[VarDesc] {
        &self.vars
    }

    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    pub fn var(&self, name: &str) -> Option<&VarDesc> {
        self.var_index.get(name).map(|&i| &self.vars[i])
    }

    pub fn has_var(&self, name: &str) -> bool {
        self.var_index.contains_key(name)
    }

    /// 按名称取得现有变量的句柄
    pub fn handle(&self, name: &str) -> Result<VarHandle, ProgramError> {
        self.var(name)
            .map(|desc| VarHandle::new(self.id, desc))
            .ok_or_else(|| ProgramError::VariableNotFound(name.to_string()))
    }

    /// 全部参数变量（声明顺序）
    pub fn parameters(&self) -> Vec<&VarDesc> {
        self.vars
            .iter()
            .filter(|v| v.role == VarRole::Parameter)
            .collect()
    }

    /// 以指定类型名追加的算子
    pub fn ops_of_type(&self, type_name: &str) -> Vec<&OpDesc> {
        self.ops
            .iter()
            .filter(|op| op.type_name() == type_name)
            .collect()
    }

    /// 已追加反向传播的损失变量名
    pub fn backward_loss(&self) -> Option<&str> {
        self.backward_loss.as_deref()
    }

    /// 校验句柄属于本程序，并返回其变量描述
    pub fn resolve(&self, handle: &VarHandle) -> Result<&VarDesc, ProgramError> {
        if handle.program_id() != self.id {
            return Err(ProgramError::ForeignHandle {
                name: handle.name().to_string(),
                owner: handle.program_id(),
                target: self.id,
            });
        }
        self.var(handle.name())
            .ok_or_else(|| ProgramError::VariableNotFound(handle.name().to_string()))
    }

    // ========== 名称生成 ==========

    /// 生成唯一前缀，如 `fc_0`、`fc_1`
    ///
    /// 跳过已被现有变量占用的前缀（从描述符重建的程序没有名称计数）。
    pub fn unique_name(&mut self, key: &str) -> String {
        let (name, next) = self.next_unique_name(key);
        self.name_counters.insert(key.to_string(), next);
        name
    }

    fn peek_unique_name(&self, key: &str) -> String {
        self.next_unique_name(key).0
    }

    fn next_unique_name(&self, key: &str) -> (String, usize) {
        let mut counter = self.name_counters.get(key).copied().unwrap_or(0);
        loop {
            let name = format!("{key}_{counter}");
            counter += 1;
            if !self.prefix_in_use(&name) {
                return (name, counter);
            }
        }
    }

    fn prefix_in_use(&self, prefix: &str) -> bool {
        self.vars.iter().any(|v| {
            v.name
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
        })
    }

    // ========== 变量注册 ==========

    /// 注册变量
    ///
    /// 同名变量已存在时：形状与类型一致则幂等地返回等价句柄，否则返回 `NameConflict`。
    pub fn create_variable(
        &mut self,
        name: &str,
        shape: DynamicShape,
        data_type: DataType,
        role: VarRole,
    ) -> Result<VarHandle, ProgramError> {
        if name.is_empty() {
            return Err(ProgramError::InvalidOperation(
                "变量名不能为空".to_string(),
            ));
        }
        if let Some(existing) = self.var(name) {
            if existing.shape != shape || existing.data_type != data_type {
                return Err(ProgramError::NameConflict {
                    name: name.to_string(),
                    existing: existing.signature(),
                    requested: format!("{data_type} {shape}"),
                });
            }
            return Ok(VarHandle::new(self.id, existing));
        }
        Ok(self.push_var(VarDesc::new(name, shape, data_type, role)))
    }

    /// 创建（或共享）参数变量
    ///
    /// - `attr.name` 为空时以 `<prefix>` 作为参数名
    /// - `attr.name` 指向已有参数且形状/类型一致时，直接返回该参数（权值共享）
    pub fn create_parameter(
        &mut self,
        attr: &ParamAttr,
        prefix: &str,
        shape: DynamicShape,
        data_type: DataType,
        default_initializer: Initializer,
    ) -> Result<VarHandle, ProgramError> {
        if shape.has_dynamic_dims() {
            return Err(ProgramError::InvalidOperation(format!(
                "参数`{prefix}`的形状{shape}不能含动态维度"
            )));
        }
        let name = attr.name.clone().unwrap_or_else(|| prefix.to_string());

        if let Some(existing) = self.var(&name) {
            if existing.role != VarRole::Parameter
                || existing.shape != shape
                || existing.data_type != data_type
            {
                return Err(ProgramError::NameConflict {
                    name,
                    existing: format!("{} {}", existing.role, existing.signature()),
                    requested: format!("{} {data_type} {shape}", VarRole::Parameter),
                });
            }
            if attr.initializer.is_some() && attr.initializer != existing.initializer {
                warn!("共享参数`{name}`已存在，忽略新声明的初始化方式");
            }
            debug!("共享参数`{name}` {shape}");
            return Ok(VarHandle::new(self.id, existing));
        }

        let initializer = attr.initializer.unwrap_or(default_initializer);
        initializer.validate()?;
        let mut desc = VarDesc::new(&name, shape, data_type, VarRole::Parameter);
        desc.initializer = Some(initializer);
        Ok(self.push_var(desc))
    }

    pub(in crate::program) fn push_var(&mut self, desc: VarDesc) -> VarHandle {
        debug!("{}: 注册变量 {desc}", self.name);
        let handle = VarHandle::new(self.id, &desc);
        self.var_index.insert(desc.name.clone(), self.vars.len());
        self.vars.push(desc);
        handle
    }

    // ========== 算子追加 ==========

    /// 追加一个算子
    ///
    /// 所有输入句柄须属于本程序；按 `outputs` 合成全新的输出变量（已存在的名字视为冲突）。
    /// 相同参数的重复调用会追加不同的算子，不做去重。校验全部通过后才修改程序。
    pub fn append_operator(
        &mut self,
        kind: OpKind,
        inputs: &[(&str, &[&VarHandle])],
        outputs: &[OutputSpec],
    ) -> Result<Vec<VarHandle>, ProgramError> {
        let mut input_args = Vec::with_capacity(inputs.len());
        for (parameter, handles) in inputs {
            let mut arguments = Vec::with_capacity(handles.len());
            for handle in handles.iter() {
                arguments.push(self.resolve(handle)?.name.clone());
            }
            input_args.push(OpArg::new(parameter, arguments));
        }

        // 先确定全部输出名，再统一校验，避免部分写入
        let type_name = kind.type_name();
        let mut names = Vec::with_capacity(outputs.len());
        let mut auto_prefix: Option<String> = None;
        for (i, spec) in outputs.iter().enumerate() {
            let name = match &spec.name {
                Some(name) => name.clone(),
                None => {
                    let prefix = match &auto_prefix {
                        Some(p) => p.clone(),
                        None => {
                            let p = self.peek_unique_name(&type_name);
                            auto_prefix = Some(p.clone());
                            p
                        }
                    };
                    format!("{prefix}.tmp_{i}")
                }
            };
            names.push(name);
        }
        let mut seen = HashSet::new();
        for (name, spec) in names.iter().zip(outputs) {
            if name.is_empty() {
                return Err(ProgramError::InvalidOperation(
                    "输出变量名不能为空".to_string(),
                ));
            }
            if let Some(existing) = self.var(name) {
                return Err(ProgramError::NameConflict {
                    name: name.clone(),
                    existing: existing.signature(),
                    requested: format!("{type_name}的新输出 {} {}", spec.data_type, spec.shape),
                });
            }
            if !seen.insert(name.as_str()) {
                return Err(ProgramError::InvalidOperation(format!(
                    "{type_name}的输出`{name}`重复"
                )));
            }
        }

        if auto_prefix.is_some() {
            self.unique_name(&type_name);
        }
        let mut output_args: Vec<OpArg> = Vec::new();
        let mut handles = Vec::with_capacity(outputs.len());
        for (name, spec) in names.into_iter().zip(outputs) {
            let desc = VarDesc::new(&name, spec.shape.clone(), spec.data_type, VarRole::Output);
            handles.push(self.push_var(desc));
            match output_args
                .iter_mut()
                .find(|arg| arg.parameter == spec.parameter)
            {
                Some(arg) => arg.arguments.push(name),
                None => output_args.push(OpArg::new(&spec.parameter, vec![name])),
            }
        }

        self.push_op(kind, input_args, output_args)?;
        Ok(handles)
    }

    /// 按变量名追加算子；所引用的变量必须都已存在
    pub(in crate::program) fn push_op(
        &mut self,
        kind: OpKind,
        inputs: Vec<OpArg>,
        outputs: Vec<OpArg>,
    ) -> Result<usize, ProgramError> {
        for name in inputs
            .iter()
            .chain(outputs.iter())
            .flat_map(|arg| arg.arguments.iter())
        {
            if !self.has_var(name) {
                return Err(ProgramError::VariableNotFound(name.clone()));
            }
        }
        let index = self.ops.len();
        let op = OpDesc {
            index,
            kind,
            inputs,
            outputs,
        };
        debug!("{}: 追加算子 {op}", self.name);
        self.ops.push(op);
        Ok(index)
    }

    // ========== 原子性 ==========

    /// 以全有或全无的方式执行一组构建操作
    ///
    /// 闭包返回错误时，撤销其间追加的全部变量、算子与名称计数，程序回到调用前的状态。
    ///
    /// # 示例
    /// ```
    /// use layer_graph::program::{DataType, DynamicShape, Program, VarRole};
    ///
    /// let mut program = Program::new();
    /// let result: Result<(), _> = program.atomic(|p| {
    ///     p.create_variable("a", DynamicShape::fixed(&[2]), DataType::Float32, VarRole::Input)?;
    ///     p.create_variable("a", DynamicShape::fixed(&[3]), DataType::Float32, VarRole::Input)?;
    ///     Ok(())
    /// });
    /// assert!(result.is_err());
    /// assert_eq!(program.var_count(), 0);
    /// ```
    pub fn atomic<R, F>(&mut self, f: F) -> Result<R, ProgramError>
    where
        F: FnOnce(&mut Self) -> Result<R, ProgramError>,
    {
        let checkpoint = self.checkpoint();
        let result = f(self);
        if result.is_err() {
            self.rollback(checkpoint);
        }
        result
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            ops_len: self.ops.len(),
            vars_len: self.vars.len(),
            name_counters: self.name_counters.clone(),
            backward_loss: self.backward_loss.clone(),
        }
    }

    fn rollback(&mut self, checkpoint: Checkpoint) {
        self.ops.truncate(checkpoint.ops_len);
        for removed in self.vars.drain(checkpoint.vars_len..) {
            self.var_index.remove(&removed.name);
        }
        self.name_counters = checkpoint.name_counters;
        self.backward_loss = checkpoint.backward_loss;
        debug!(
            "{}: 回滚至 {} 个算子、{} 个变量",
            self.name,
            self.ops.len(),
            self.vars.len()
        );
    }
}
