/*
 * @Author       : 老董
 * @Date         : 2026-10-15
 * @Description  : 数据输入层
 */

use crate::errors::ProgramError;
use crate::program::{DataType, DynamicShape, Program, VarHandle, VarRole};

/// 声明一个数据输入变量
///
/// 形状会在最前面补上动态 batch 维：`[13]` → `[?, 13]`。
/// 同名变量以相同形状/类型重复声明时幂等，否则返回 `NameConflict`。
///
/// # 示例
/// ```
/// use layer_graph::layers;
/// use layer_graph::program::{DataType, Program};
///
/// let mut program = Program::new();
/// let x = layers::data(&mut program, "x", &[13], DataType::Float32).unwrap();
/// assert_eq!(x.shape().to_string(), "[?, 13]");
/// ```
pub fn data(
    program: &mut Program,
    name: &str,
    shape: &[usize],
    data_type: DataType,
) -> Result<VarHandle, ProgramError> {
    if shape.contains(&0) {
        return Err(ProgramError::InvalidOperation(format!(
            "数据`{name}`的形状{shape:?}不能含0"
        )));
    }
    program.atomic(|p| {
        p.create_variable(
            name,
            DynamicShape::with_dynamic_batch(shape),
            data_type,
            VarRole::Input,
        )
    })
}
