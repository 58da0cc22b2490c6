/*
 * @Author       : 老董
 * @Date         : 2026-10-15
 * @Description  : 损失相关层：cross_entropy、square_error_cost、mean
 */

use super::{expect_rank, single_output};
use crate::errors::ProgramError;
use crate::program::{DataType, DynamicShape, OpKind, OutputSpec, Program, VarHandle};

/// 交叉熵（硬标签）
///
/// - `input`：[N, C] 浮点概率
/// - `label`：[N, 1] 整数类别
/// - 输出：[N, 1]
pub fn cross_entropy(
    program: &mut Program,
    input: &VarHandle,
    label: &VarHandle,
) -> Result<VarHandle, ProgramError> {
    program.atomic(|p| {
        let x = p.resolve(input)?.clone();
        let y = p.resolve(label)?.clone();
        expect_rank(&x, 2, "cross_entropy")?;
        expect_rank(&y, 2, "cross_entropy")?;
        if !x.data_type.is_float() {
            return Err(ProgramError::DataTypeMismatch {
                expected: DataType::Float32,
                got: x.data_type,
                message: format!("cross_entropy 的输入`{}`须为浮点类型", x.name),
            });
        }
        if !y.data_type.is_integer() {
            return Err(ProgramError::DataTypeMismatch {
                expected: DataType::Int64,
                got: y.data_type,
                message: format!("cross_entropy 的标签`{}`须为整数类型", y.name),
            });
        }
        let expected_label = DynamicShape::new(&[x.shape.dim(0), Some(1)]);
        let batch = expected_label
            .merge(&y.shape)
            .ok_or_else(|| ProgramError::ShapeMismatch {
                expected: expected_label.clone(),
                got: y.shape.clone(),
                message: format!("cross_entropy 的标签`{}`须为 [N, 1]", y.name),
            })?;

        let prefix = p.unique_name("cross_entropy");
        let x_in = [input];
        let y_in = [label];
        let outputs = p.append_operator(
            OpKind::CrossEntropy,
            &[("X", x_in.as_slice()), ("Label", y_in.as_slice())],
            &[OutputSpec::new("Y", batch, x.data_type).named(format!("{prefix}.tmp_0"))],
        )?;
        single_output(outputs)
    })
}

/// 平方误差：`(input - label)^2`，两者形状须兼容
pub fn square_error_cost(
    program: &mut Program,
    input: &VarHandle,
    label: &VarHandle,
) -> Result<VarHandle, ProgramError> {
    program.atomic(|p| {
        let x = p.resolve(input)?.clone();
        let y = p.resolve(label)?.clone();
        if x.data_type != y.data_type {
            return Err(ProgramError::DataTypeMismatch {
                expected: x.data_type,
                got: y.data_type,
                message: format!("square_error_cost 的标签`{}`须与输入同类型", y.name),
            });
        }
        let out_shape = x
            .shape
            .merge(&y.shape)
            .ok_or_else(|| ProgramError::ShapeMismatch {
                expected: x.shape.clone(),
                got: y.shape.clone(),
                message: format!("square_error_cost 的标签`{}`须与输入形状一致", y.name),
            })?;

        let prefix = p.unique_name("square_error_cost");
        let x_in = [input];
        let y_in = [label];
        let outputs = p.append_operator(
            OpKind::SquareErrorCost,
            &[("X", x_in.as_slice()), ("Y", y_in.as_slice())],
            &[OutputSpec::new("Out", out_shape, x.data_type).named(format!("{prefix}.tmp_0"))],
        )?;
        single_output(outputs)
    })
}

/// 全局平均，输出形状为 [1]（可作为反向传播的损失）
pub fn mean(program: &mut Program, x: &VarHandle) -> Result<VarHandle, ProgramError> {
    program.atomic(|p| {
        let desc = p.resolve(x)?.clone();
        let prefix = p.unique_name("mean");
        let x_in = [x];
        let outputs = p.append_operator(
            OpKind::Mean,
            &[("X", x_in.as_slice())],
            &[OutputSpec::new("Out", DynamicShape::scalar(), desc.data_type)
                .named(format!("{prefix}.tmp_0"))],
        )?;
        single_output(outputs)
    })
}
