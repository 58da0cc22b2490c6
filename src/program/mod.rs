/*
 * @Author       : 老董
 * @Date         : 2026-10-12
 * @Description  : Program 模块：神经网络计算图的描述与累积
 *
 * 公开 API：
 * - `Program`: 图累积器（变量表 + 有序算子序列）
 * - `VarHandle`: 指向程序内变量的句柄
 * - `OpDesc`/`OpKind`: 算子描述
 * - `ProgramDescriptor`: 可序列化描述
 */

mod attr;
mod default;
mod descriptor;
mod inner;
mod operator;
mod shape;
mod types;
mod variable;

pub use attr::{Initializer, ParamAttr};
pub use default::{reset_default_program, with_default_program};
pub use descriptor::ProgramDescriptor;
pub use inner::{GRAD_SUFFIX, Program, grad_var_name};
pub use operator::{OpArg, OpDesc, OpKind, OutputSpec};
pub use shape::{Dim, DynamicShape};
pub use types::{Activation, DataType, PoolType, ProgramId, VarRole};
pub use variable::{VarDesc, VarHandle};

#[cfg(test)]
mod tests;
