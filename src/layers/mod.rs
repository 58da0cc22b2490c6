/*
 * @Author       : 老董
 * @Date         : 2026-10-15
 * @Description  : Layer 模块 - 向显式传入的 Program 追加算子的层构造函数
 *
 * 层函数本身不持有任何状态：给定输入句柄、结构配置与目标 Program，
 * 追加算子（及所需参数）并返回输出句柄。每个层调用都是原子的，失败时 Program 保持原样。
 */

mod io;
mod loss;
mod nn;
mod tensor;

pub use io::data;
pub use loss::{cross_entropy, mean, square_error_cost};
pub use nn::{
    Conv2dConfig, FcConfig, Pool2dConfig, conv2d, conv2d_with, embedding, fc, fc_with, pool2d,
};
pub use tensor::{concat, sums};

use crate::errors::ProgramError;
use crate::program::{Dim, VarDesc, VarHandle};

/// 取出单输出算子的输出句柄
fn single_output(mut handles: Vec<VarHandle>) -> Result<VarHandle, ProgramError> {
    match (handles.pop(), handles.is_empty()) {
        (Some(handle), true) => Ok(handle),
        _ => Err(ProgramError::InvalidOperation(
            "层算子应恰好产生一个输出".to_string(),
        )),
    }
}

/// 校验输入的维度数
fn expect_rank(desc: &VarDesc, rank: usize, layer: &str) -> Result<(), ProgramError> {
    if desc.shape.ndim() != rank {
        return Err(ProgramError::DimensionMismatch {
            expected: rank,
            got: desc.shape.ndim(),
            message: format!("{layer}的输入`{}`形状为{}", desc.name, desc.shape),
        });
    }
    Ok(())
}

/// 滑窗（卷积/池化）输出尺寸：`(size + 2*padding - kernel) / stride + 1`
///
/// 动态输入尺寸得到动态输出尺寸。
fn window_output_size(
    size: Dim,
    kernel: usize,
    stride: usize,
    padding: usize,
    layer: &str,
) -> Result<Dim, ProgramError> {
    let Some(size) = size else {
        return Ok(None);
    };
    let padded = padding
        .checked_mul(2)
        .and_then(|p| p.checked_add(size))
        .ok_or_else(|| {
            ProgramError::InvalidOperation(format!("{layer}的填充{padding}过大，输出尺寸溢出"))
        })?;
    if padded < kernel {
        return Err(ProgramError::InvalidOperation(format!(
            "{layer}的窗口{kernel}大于填充后的输入尺寸{padded}"
        )));
    }
    Ok(Some((padded - kernel) / stride + 1))
}

#[cfg(test)]
mod tests;
