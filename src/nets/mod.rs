/*
 * @Author       : 老董
 * @Date         : 2026-10-16
 * @Description  : 组合网络 - 依次调用多个层函数，只返回最终输出
 *
 * 组合网络不是新的抽象层，只是语法糖！
 */

use crate::errors::ProgramError;
use crate::layers::{self, Conv2dConfig, Pool2dConfig};
use crate::program::{PoolType, Program, VarHandle};
use serde::{Deserialize, Serialize};

/// 卷积 + 池化块的配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImgConvPoolConfig {
    pub num_filters: usize,
    /// 方形卷积核边长
    pub filter_size: usize,
    pub pool_size: usize,
    pub pool_stride: usize,
    pub pool_type: PoolType,
    /// 卷积后的激活
    pub act: Option<String>,
}

impl ImgConvPoolConfig {
    pub fn new(
        num_filters: usize,
        filter_size: usize,
        pool_size: usize,
        pool_stride: usize,
    ) -> Self {
        Self {
            num_filters,
            filter_size,
            pool_size,
            pool_stride,
            pool_type: PoolType::Max,
            act: None,
        }
    }

    pub fn act(mut self, act: &str) -> Self {
        self.act = Some(act.to_string());
        self
    }

    pub fn pool_type(mut self, pool_type: PoolType) -> Self {
        self.pool_type = pool_type;
        self
    }
}

/// conv2d → pool2d
///
/// 两个层调用共享同一个 Program，整个块是原子的：任一步失败都不会留下半个块。
///
/// # 示例
/// ```
/// use layer_graph::layers;
/// use layer_graph::nets::{simple_img_conv_pool, ImgConvPoolConfig};
/// use layer_graph::program::{DataType, Program};
///
/// let mut program = Program::new();
/// let images = layers::data(&mut program, "pixel", &[1, 28, 28], DataType::Float32).unwrap();
/// let config = ImgConvPoolConfig::new(2, 5, 2, 2).act("relu");
/// let out = simple_img_conv_pool(&mut program, &images, &config).unwrap();
/// assert_eq!(out.shape().to_string(), "[?, 2, 12, 12]");
/// assert_eq!(program.op_count(), 2);
/// ```
pub fn simple_img_conv_pool(
    program: &mut Program,
    input: &VarHandle,
    config: &ImgConvPoolConfig,
) -> Result<VarHandle, ProgramError> {
    let mut conv_config = Conv2dConfig::new(
        config.num_filters,
        &[config.filter_size, config.filter_size],
    );
    conv_config.act = config.act.clone();
    let pool_config = Pool2dConfig::new(config.pool_size)
        .stride(config.pool_stride)
        .pool_type(config.pool_type);

    program.atomic(|p| {
        let conv_out = layers::conv2d_with(p, input, &conv_config)?;
        layers::pool2d(p, &conv_out, &pool_config)
    })
}
