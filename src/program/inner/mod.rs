/*
 * @Author       : 老董
 * @Date         : 2026-10-13
 * @Description  : Program 图累积器
 *
 * 各 impl 块分散在子模块中：
 * - core.rs: 变量/参数/算子的注册与原子回滚
 * - backward.rs: 反向子图追加
 * - describe.rs: render/describe/from_descriptor
 */

mod backward;
mod core;
mod describe;

pub use backward::{GRAD_SUFFIX, grad_var_name};

use super::operator::OpDesc;
use super::types::ProgramId;
use super::variable::VarDesc;
use std::collections::HashMap;

/// 程序：有序的算子描述序列 + 命名变量表
///
/// 每次层调用都原地修改传入的 Program；Program 不实现 `Clone`，
/// 共享同一实例的调用总能看到彼此先前追加的节点。
#[derive(Debug)]
pub struct Program {
    pub(in crate::program) id: ProgramId,
    pub(in crate::program) name: String,
    pub(in crate::program) ops: Vec<OpDesc>,
    /// 按声明顺序排列的变量
    pub(in crate::program) vars: Vec<VarDesc>,
    /// 变量名 -> vars 下标
    pub(in crate::program) var_index: HashMap<String, usize>,
    /// 唯一名生成计数：前缀 -> 下一个序号
    pub(in crate::program) name_counters: HashMap<String, usize>,
    /// 已追加反向传播的损失变量名
    pub(in crate::program) backward_loss: Option<String>,
}

/// 原子操作的回滚点
struct Checkpoint {
    ops_len: usize,
    vars_len: usize,
    name_counters: HashMap<String, usize>,
    backward_loss: Option<String>,
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}
