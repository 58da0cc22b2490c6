/*
 * @Author       : 老董
 * @Date         : 2026-10-15
 * @Description  : 带参数的层：fc、conv2d、pool2d、embedding
 *
 * 卷积/池化的输入/输出形状：
 * - 输入：[batch_size, in_channels, H, W]
 * - 输出：[batch_size, out_channels, H', W']
 *
 * H' = (H + 2*padding_h - kernel_h) / stride_h + 1
 * W' = (W + 2*padding_w - kernel_w) / stride_w + 1
 */

use super::{expect_rank, single_output, window_output_size};
use crate::errors::ProgramError;
use crate::program::{
    Activation, DataType, DynamicShape, Initializer, OpKind, OutputSpec, ParamAttr, PoolType,
    Program, VarHandle,
};
use serde::{Deserialize, Serialize};

// ==================== fc ====================

/// fc 层配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FcConfig {
    /// 输出宽度
    pub size: usize,
    /// 激活名称，None 表示不使用激活
    pub act: Option<String>,
    /// 前多少维保留为 batch 维，其余维度展平为输入特征
    pub num_flatten_dims: usize,
    pub param_attr: ParamAttr,
    /// None 表示不使用偏置
    pub bias_attr: Option<ParamAttr>,
}

impl FcConfig {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            act: None,
            num_flatten_dims: 1,
            param_attr: ParamAttr::default(),
            bias_attr: Some(ParamAttr::default()),
        }
    }

    pub fn act(mut self, act: &str) -> Self {
        self.act = Some(act.to_string());
        self
    }

    pub fn num_flatten_dims(mut self, num_flatten_dims: usize) -> Self {
        self.num_flatten_dims = num_flatten_dims;
        self
    }

    pub fn param_attr(mut self, attr: ParamAttr) -> Self {
        self.param_attr = attr;
        self
    }

    pub fn bias_attr(mut self, attr: ParamAttr) -> Self {
        self.bias_attr = Some(attr);
        self
    }

    pub fn no_bias(mut self) -> Self {
        self.bias_attr = None;
        self
    }
}

/// 全连接层：追加一个 `fc` 算子，输出宽度为 `size`
///
/// `act` 为未识别的激活名称时返回 `UnknownActivation`，且不追加任何算子或参数。
pub fn fc(
    program: &mut Program,
    input: &VarHandle,
    size: usize,
    act: Option<&str>,
) -> Result<VarHandle, ProgramError> {
    let mut config = FcConfig::new(size);
    config.act = act.map(str::to_string);
    fc_with(program, input, &config)
}

/// 全连接层（完整配置）
///
/// - 权重：[prod(input.dims[num_flatten_dims..]), size]
/// - 偏置：[size]
/// - 输出：[input.dims[..num_flatten_dims], size]
pub fn fc_with(
    program: &mut Program,
    input: &VarHandle,
    config: &FcConfig,
) -> Result<VarHandle, ProgramError> {
    let activation = Activation::parse(config.act.as_deref())?;
    if config.size == 0 {
        return Err(ProgramError::InvalidOperation(
            "fc 的输出宽度须大于0".to_string(),
        ));
    }

    program.atomic(|p| {
        let x = p.resolve(input)?.clone();
        let flatten = config.num_flatten_dims;
        if flatten == 0 || flatten >= x.shape.ndim() {
            return Err(ProgramError::DimensionMismatch {
                expected: flatten + 1,
                got: x.shape.ndim(),
                message: format!(
                    "fc 的 num_flatten_dims={flatten} 要求输入`{}`至少有{}维",
                    x.name,
                    flatten + 1
                ),
            });
        }
        let in_features = x.shape.numel_from(flatten).ok_or_else(|| {
            ProgramError::InvalidOperation(format!(
                "fc 的输入`{}`在第{flatten}维之后含动态维度：{}",
                x.name, x.shape
            ))
        })?;

        let prefix = p.unique_name("fc");
        let w = p.create_parameter(
            &config.param_attr,
            &format!("{prefix}.w_0"),
            DynamicShape::fixed(&[in_features, config.size]),
            x.data_type,
            Initializer::default_weight(),
        )?;
        let b = match &config.bias_attr {
            Some(attr) => Some(p.create_parameter(
                attr,
                &format!("{prefix}.b_0"),
                DynamicShape::fixed(&[config.size]),
                x.data_type,
                Initializer::default_bias(),
            )?),
            None => None,
        };

        let mut out_dims = x.shape.dims()[..flatten].to_vec();
        out_dims.push(Some(config.size));

        let x_in = [input];
        let w_in = [&w];
        let b_in = b.as_ref().map(|b| [b]);
        let mut inputs: Vec<(&str, &[&VarHandle])> =
            vec![("Input", x_in.as_slice()), ("W", w_in.as_slice())];
        if let Some(b_in) = &b_in {
            inputs.push(("Bias", b_in.as_slice()));
        }

        let outputs = p.append_operator(
            OpKind::Fc {
                size: config.size,
                activation,
            },
            &inputs,
            &[
                OutputSpec::new("Out", DynamicShape::new(&out_dims), x.data_type)
                    .named(format!("{prefix}.tmp_0")),
            ],
        )?;
        single_output(outputs)
    })
}

// ==================== conv2d ====================

/// conv2d 层配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conv2dConfig {
    pub num_filters: usize,
    /// 须为两个正整数 [kh, kw]
    pub filter_size: Vec<usize>,
    pub stride: (usize, usize),
    pub padding: (usize, usize),
    pub groups: usize,
    pub act: Option<String>,
    /// 未指定初始化时使用 N(0, sqrt(2 / (kh*kw*C)))
    pub param_attr: ParamAttr,
    pub bias_attr: Option<ParamAttr>,
}

impl Conv2dConfig {
    pub fn new(num_filters: usize, filter_size: &[usize]) -> Self {
        Self {
            num_filters,
            filter_size: filter_size.to_vec(),
            stride: (1, 1),
            padding: (0, 0),
            groups: 1,
            act: None,
            param_attr: ParamAttr::default(),
            bias_attr: Some(ParamAttr::default()),
        }
    }

    pub fn stride(mut self, stride: (usize, usize)) -> Self {
        self.stride = stride;
        self
    }

    pub fn padding(mut self, padding: (usize, usize)) -> Self {
        self.padding = padding;
        self
    }

    pub fn groups(mut self, groups: usize) -> Self {
        self.groups = groups;
        self
    }

    pub fn act(mut self, act: &str) -> Self {
        self.act = Some(act.to_string());
        self
    }

    pub fn param_attr(mut self, attr: ParamAttr) -> Self {
        self.param_attr = attr;
        self
    }

    pub fn no_bias(mut self) -> Self {
        self.bias_attr = None;
        self
    }
}

/// 2D 卷积层：追加一个 `conv2d` 算子
///
/// `filter_size` 须恰为两个正整数，否则返回 `InvalidFilterSize`。
pub fn conv2d(
    program: &mut Program,
    input: &VarHandle,
    num_filters: usize,
    filter_size: &[usize],
    act: Option<&str>,
) -> Result<VarHandle, ProgramError> {
    let mut config = Conv2dConfig::new(num_filters, filter_size);
    config.act = act.map(str::to_string);
    conv2d_with(program, input, &config)
}

/// 2D 卷积层（完整配置）
pub fn conv2d_with(
    program: &mut Program,
    input: &VarHandle,
    config: &Conv2dConfig,
) -> Result<VarHandle, ProgramError> {
    let (k_h, k_w) = match config.filter_size.as_slice() {
        &[k_h, k_w] if k_h > 0 && k_w > 0 => (k_h, k_w),
        other => return Err(ProgramError::InvalidFilterSize(other.to_vec())),
    };
    let activation = Activation::parse(config.act.as_deref())?;
    if config.num_filters == 0 || config.groups == 0 {
        return Err(ProgramError::InvalidOperation(format!(
            "conv2d 的 num_filters({})与 groups({})须大于0",
            config.num_filters, config.groups
        )));
    }
    if config.stride.0 == 0 || config.stride.1 == 0 {
        return Err(ProgramError::InvalidOperation(format!(
            "conv2d 的步长须大于0，实际为{:?}",
            config.stride
        )));
    }

    program.atomic(|p| {
        let x = p.resolve(input)?.clone();
        expect_rank(&x, 4, "conv2d")?;
        let channels = x.shape.dim(1).ok_or_else(|| {
            ProgramError::InvalidOperation(format!("conv2d 的输入`{}`通道数须确定", x.name))
        })?;
        if channels % config.groups != 0 {
            return Err(ProgramError::InvalidOperation(format!(
                "conv2d 的输入通道数{channels}不能被 groups={} 整除",
                config.groups
            )));
        }
        let out_h = window_output_size(
            x.shape.dim(2),
            k_h,
            config.stride.0,
            config.padding.0,
            "conv2d",
        )?;
        let out_w = window_output_size(
            x.shape.dim(3),
            k_w,
            config.stride.1,
            config.padding.1,
            "conv2d",
        )?;

        let prefix = p.unique_name("conv2d");
        let std = (2.0 / (k_h * k_w * channels) as f32).sqrt();
        let filter = p.create_parameter(
            &config.param_attr,
            &format!("{prefix}.w_0"),
            DynamicShape::fixed(&[config.num_filters, channels / config.groups, k_h, k_w]),
            x.data_type,
            Initializer::Gaussian { mean: 0.0, std },
        )?;
        let bias = match &config.bias_attr {
            Some(attr) => Some(p.create_parameter(
                attr,
                &format!("{prefix}.b_0"),
                DynamicShape::fixed(&[config.num_filters]),
                x.data_type,
                Initializer::default_bias(),
            )?),
            None => None,
        };

        let x_in = [input];
        let filter_in = [&filter];
        let bias_in = bias.as_ref().map(|b| [b]);
        let mut inputs: Vec<(&str, &[&VarHandle])> =
            vec![("Input", x_in.as_slice()), ("Filter", filter_in.as_slice())];
        if let Some(bias_in) = &bias_in {
            inputs.push(("Bias", bias_in.as_slice()));
        }

        let out_shape =
            DynamicShape::new(&[x.shape.dim(0), Some(config.num_filters), out_h, out_w]);
        let outputs = p.append_operator(
            OpKind::Conv2d {
                num_filters: config.num_filters,
                filter_size: (k_h, k_w),
                stride: config.stride,
                padding: config.padding,
                groups: config.groups,
                activation,
            },
            &inputs,
            &[OutputSpec::new("Output", out_shape, x.data_type).named(format!("{prefix}.tmp_0"))],
        )?;
        single_output(outputs)
    })
}

// ==================== pool2d ====================

/// pool2d 层配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool2dConfig {
    pub pool_size: (usize, usize),
    pub pool_type: PoolType,
    pub stride: (usize, usize),
    pub padding: (usize, usize),
    /// 为 true 时忽略窗口配置，输出 [N, C, 1, 1]
    pub global_pooling: bool,
}

impl Pool2dConfig {
    /// 方形窗口、步长 1 的最大池化
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool_size: (pool_size, pool_size),
            pool_type: PoolType::Max,
            stride: (1, 1),
            padding: (0, 0),
            global_pooling: false,
        }
    }

    /// 全局池化
    pub fn global(pool_type: PoolType) -> Self {
        Self {
            pool_type,
            global_pooling: true,
            ..Self::new(1)
        }
    }

    pub fn pool_type(mut self, pool_type: PoolType) -> Self {
        self.pool_type = pool_type;
        self
    }

    pub fn stride(mut self, stride: usize) -> Self {
        self.stride = (stride, stride);
        self
    }

    pub fn padding(mut self, padding: usize) -> Self {
        self.padding = (padding, padding);
        self
    }
}

/// 2D 池化层：追加一个 `pool2d` 算子
pub fn pool2d(
    program: &mut Program,
    input: &VarHandle,
    config: &Pool2dConfig,
) -> Result<VarHandle, ProgramError> {
    let (k_h, k_w) = config.pool_size;
    let (s_h, s_w) = config.stride;
    if !config.global_pooling && (k_h == 0 || k_w == 0 || s_h == 0 || s_w == 0) {
        return Err(ProgramError::InvalidOperation(format!(
            "pool2d 的窗口{:?}与步长{:?}须大于0",
            config.pool_size, config.stride
        )));
    }

    program.atomic(|p| {
        let x = p.resolve(input)?.clone();
        expect_rank(&x, 4, "pool2d")?;
        let (out_h, out_w) = if config.global_pooling {
            (Some(1), Some(1))
        } else {
            (
                window_output_size(x.shape.dim(2), k_h, s_h, config.padding.0, "pool2d")?,
                window_output_size(x.shape.dim(3), k_w, s_w, config.padding.1, "pool2d")?,
            )
        };
        let out_shape = DynamicShape::new(&[x.shape.dim(0), x.shape.dim(1), out_h, out_w]);
        let prefix = p.unique_name("pool2d");
        let x_in = [input];
        let outputs = p.append_operator(
            OpKind::Pool2d {
                pool_type: config.pool_type,
                pool_size: config.pool_size,
                stride: config.stride,
                padding: config.padding,
                global_pooling: config.global_pooling,
            },
            &[("X", x_in.as_slice())],
            &[OutputSpec::new("Out", out_shape, x.data_type).named(format!("{prefix}.tmp_0"))],
        )?;
        single_output(outputs)
    })
}

// ==================== embedding ====================

/// 词嵌入层：追加一个 `lookup_table` 算子
///
/// - `input`：整数类型的 id，最后一维为 1
/// - `size`：[词表大小, 嵌入维度]
/// - `param_attr.name` 指向已有参数时，与之共享同一个嵌入表
///
/// # 示例
/// ```
/// use layer_graph::layers;
/// use layer_graph::program::{DataType, Initializer, ParamAttr, Program};
///
/// let mut program = Program::new();
/// let w1 = layers::data(&mut program, "w1", &[1], DataType::Int64).unwrap();
/// let w2 = layers::data(&mut program, "w2", &[1], DataType::Int64).unwrap();
/// let attr = ParamAttr::named("shared_w")
///     .with_initializer(Initializer::UniformRandom { min: -1.0, max: 1.0 });
/// layers::embedding(&mut program, &w1, [100, 8], DataType::Float32, &attr).unwrap();
/// layers::embedding(&mut program, &w2, [100, 8], DataType::Float32, &ParamAttr::named("shared_w")).unwrap();
/// assert_eq!(program.parameters().len(), 1);
/// ```
pub fn embedding(
    program: &mut Program,
    input: &VarHandle,
    size: [usize; 2],
    data_type: DataType,
    param_attr: &ParamAttr,
) -> Result<VarHandle, ProgramError> {
    if size.contains(&0) {
        return Err(ProgramError::InvalidOperation(format!(
            "embedding 的尺寸{size:?}不能含0"
        )));
    }

    program.atomic(|p| {
        let ids = p.resolve(input)?.clone();
        if !ids.data_type.is_integer() {
            return Err(ProgramError::DataTypeMismatch {
                expected: DataType::Int64,
                got: ids.data_type,
                message: format!("embedding 的输入`{}`须为整数 id", ids.name),
            });
        }
        let last = match ids.shape.ndim() {
            0 => {
                return Err(ProgramError::DimensionMismatch {
                    expected: 2,
                    got: 0,
                    message: format!("embedding 的输入`{}`不能是0维", ids.name),
                });
            }
            n => n - 1,
        };
        if ids.shape.dim(last) != Some(1) {
            return Err(ProgramError::ShapeMismatch {
                expected: ids.shape.with_dim(last, Some(1)),
                got: ids.shape.clone(),
                message: format!("embedding 的输入`{}`最后一维须为1", ids.name),
            });
        }

        let prefix = p.unique_name("embedding");
        let table = p.create_parameter(
            param_attr,
            &format!("{prefix}.w_0"),
            DynamicShape::fixed(&size),
            data_type,
            Initializer::default_weight(),
        )?;
        let out_shape = ids.shape.with_dim(last, Some(size[1]));

        let ids_in = [input];
        let table_in = [&table];
        let outputs = p.append_operator(
            OpKind::LookupTable { is_sparse: false },
            &[("Ids", ids_in.as_slice()), ("W", table_in.as_slice())],
            &[OutputSpec::new("Out", out_shape, data_type).named(format!("{prefix}.tmp_0"))],
        )?;
        single_output(outputs)
    })
}
