/*
 * @Author       : 老董
 * @Date         : 2026-10-15
 * @Description  : 多输入张量层：concat、sums
 */

use super::single_output;
use crate::errors::ProgramError;
use crate::program::{Dim, OpKind, OutputSpec, Program, VarDesc, VarHandle};

/// 解析全部输入并检查非空、类型一致
fn resolve_all(
    program: &Program,
    inputs: &[&VarHandle],
    layer: &str,
) -> Result<Vec<VarDesc>, ProgramError> {
    if inputs.is_empty() {
        return Err(ProgramError::InvalidOperation(format!(
            "{layer}至少需要1个输入"
        )));
    }
    let descs = inputs
        .iter()
        .map(|handle| program.resolve(handle).cloned())
        .collect::<Result<Vec<_>, _>>()?;
    let first = &descs[0];
    for other in &descs[1..] {
        if other.data_type != first.data_type {
            return Err(ProgramError::DataTypeMismatch {
                expected: first.data_type,
                got: other.data_type,
                message: format!("{layer}的输入`{}`与`{}`类型不一致", other.name, first.name),
            });
        }
    }
    Ok(descs)
}

/// 沿 `axis` 拼接多个输入
///
/// 除 `axis` 外各维度须一致，否则返回 `ShapeMismatch`；输出在 `axis` 上的尺寸为各输入之和
/// （任一输入在该维为动态则输出也为动态）。
pub fn concat(
    program: &mut Program,
    inputs: &[&VarHandle],
    axis: usize,
) -> Result<VarHandle, ProgramError> {
    program.atomic(|p| {
        let descs = resolve_all(p, inputs, "concat")?;
        let first = &descs[0];
        if axis >= first.shape.ndim() {
            return Err(ProgramError::InvalidOperation(format!(
                "concat 的轴{axis}超出输入`{}`的维度数{}",
                first.name,
                first.shape.ndim()
            )));
        }

        let mut out_shape = first.shape.clone();
        for other in &descs[1..] {
            if other.shape.ndim() != first.shape.ndim() {
                return Err(ProgramError::DimensionMismatch {
                    expected: first.shape.ndim(),
                    got: other.shape.ndim(),
                    message: format!("concat 的输入`{}`维度数与`{}`不一致", other.name, first.name),
                });
            }
            if !first.shape.is_compatible_except(&other.shape, axis) {
                return Err(ProgramError::ShapeMismatch {
                    expected: first.shape.clone(),
                    got: other.shape.clone(),
                    message: format!("concat 的输入除第{axis}维外须形状一致"),
                });
            }
            // 非拼接维取更具体的值
            for (i, dim) in other.shape.dims().iter().enumerate() {
                if i != axis && out_shape.is_dynamic(i) && dim.is_some() {
                    out_shape = out_shape.with_dim(i, *dim);
                }
            }
        }
        let axis_dim: Dim = descs.iter().map(|d| d.shape.dim(axis)).sum();
        let out_shape = out_shape.with_dim(axis, axis_dim);

        let prefix = p.unique_name("concat");
        let outputs = p.append_operator(
            OpKind::Concat { axis },
            &[("X", inputs)],
            &[OutputSpec::new("Out", out_shape, first.data_type).named(format!("{prefix}.tmp_0"))],
        )?;
        single_output(outputs)
    })
}

/// 逐元素求和，所有输入形状须兼容
pub fn sums(program: &mut Program, inputs: &[&VarHandle]) -> Result<VarHandle, ProgramError> {
    program.atomic(|p| {
        let descs = resolve_all(p, inputs, "sums")?;
        let first = &descs[0];
        let mut out_shape = first.shape.clone();
        for other in &descs[1..] {
            out_shape = out_shape
                .merge(&other.shape)
                .ok_or_else(|| ProgramError::ShapeMismatch {
                    expected: first.shape.clone(),
                    got: other.shape.clone(),
                    message: format!("sums 的输入`{}`与`{}`形状不一致", other.name, first.name),
                })?;
        }

        let prefix = p.unique_name("sum");
        let outputs = p.append_operator(
            OpKind::Sum,
            &[("X", inputs)],
            &[OutputSpec::new("Out", out_shape, first.data_type).named(format!("{prefix}.tmp_0"))],
        )?;
        single_output(outputs)
    })
}
