use crate::assert_err;
use approx::assert_abs_diff_eq;
use crate::errors::ProgramError;
use crate::layers::{self, Conv2dConfig, Pool2dConfig};
use crate::program::{DataType, DynamicShape, Initializer, OpKind, PoolType, Program};

#[test]
fn test_simple_conv2d() {
    let mut program = Program::new();
    let images = layers::data(&mut program, "pixel", &[3, 48, 48], DataType::Int32).unwrap();
    let conv = layers::conv2d(&mut program, &images, 3, &[4, 4], None).unwrap();

    assert_eq!(program.op_count(), 1);
    assert_eq!(program.ops()[0].type_name(), "conv2d");
    assert_eq!(conv.shape().to_string(), "[?, 3, 45, 45]");
    assert_eq!(conv.data_type(), DataType::Int32);

    let op = &program.ops()[0];
    assert_eq!(op.input("Input").unwrap(), ["pixel".to_string()]);
    assert_eq!(op.input("Filter").unwrap(), ["conv2d_0.w_0".to_string()]);
    assert_eq!(op.input("Bias").unwrap(), ["conv2d_0.b_0".to_string()]);
    assert_eq!(op.output("Output").unwrap(), ["conv2d_0.tmp_0".to_string()]);
    assert_eq!(
        program.var("conv2d_0.w_0").unwrap().shape,
        DynamicShape::fixed(&[3, 3, 4, 4])
    );
}

#[test]
fn test_conv2d_invalid_filter_size() {
    let mut program = Program::new();
    let images = layers::data(&mut program, "pixel", &[3, 48, 48], DataType::Float32).unwrap();

    assert_err!(
        layers::conv2d(&mut program, &images, 3, &[4], None),
        ProgramError::InvalidFilterSize(size) if size == &vec![4]
    );
    assert_err!(
        layers::conv2d(&mut program, &images, 3, &[4, 4, 4], None),
        ProgramError::InvalidFilterSize(_)
    );
    assert_err!(
        layers::conv2d(&mut program, &images, 3, &[0, 4], None),
        ProgramError::InvalidFilterSize(_)
    );
    assert_err!(
        layers::conv2d(&mut program, &images, 3, &[], None),
        ProgramError::InvalidFilterSize(_)
    );
    assert_eq!(program.op_count(), 0);
    assert_eq!(program.var_count(), 1);
}

#[test]
fn test_conv2d_requires_4d_input() {
    let mut program = Program::new();
    let x = layers::data(&mut program, "x", &[13], DataType::Float32).unwrap();
    assert_err!(
        layers::conv2d(&mut program, &x, 3, &[3, 3], None),
        ProgramError::DimensionMismatch(4, 2)
    );
    assert_eq!(program.var_count(), 1);
}

#[test]
fn test_conv2d_stride_padding_groups() {
    let mut program = Program::new();
    let images = layers::data(&mut program, "pixel", &[4, 28, 28], DataType::Float32).unwrap();
    let config = Conv2dConfig::new(8, &[5, 3])
        .stride((2, 1))
        .padding((2, 1))
        .groups(2)
        .act("relu");
    let out = layers::conv2d_with(&mut program, &images, &config).unwrap();

    // h: (28 + 4 - 5) / 2 + 1 = 14，w: (28 + 2 - 3) / 1 + 1 = 28
    assert_eq!(out.shape().to_string(), "[?, 8, 14, 28]");
    assert_eq!(
        program.var("conv2d_0.w_0").unwrap().shape,
        DynamicShape::fixed(&[8, 2, 5, 3])
    );
    assert!(matches!(
        program.ops()[0].kind,
        OpKind::Conv2d { stride: (2, 1), padding: (2, 1), groups: 2, .. }
    ));

    // 通道数不能被 groups 整除
    let config = Conv2dConfig::new(8, &[3, 3]).groups(3);
    assert_err!(
        layers::conv2d_with(&mut program, &images, &config),
        ProgramError::InvalidOperation(msg) if msg.contains("groups")
    );
    assert_eq!(program.op_count(), 1);
}

#[test]
fn test_conv2d_default_filter_initializer() {
    let mut program = Program::new();
    let images = layers::data(&mut program, "pixel", &[3, 48, 48], DataType::Float32).unwrap();
    layers::conv2d(&mut program, &images, 3, &[4, 4], None).unwrap();

    let expected_std = (2.0_f32 / 48.0).sqrt();
    match program.var("conv2d_0.w_0").unwrap().initializer {
        Some(Initializer::Gaussian { mean, std }) => {
            assert_abs_diff_eq!(mean, 0.0);
            assert_abs_diff_eq!(std, expected_std, epsilon = 1e-6);
        }
        other => panic!("预期正态分布初始化，实际得到 {other:?}"),
    }
}

#[test]
fn test_conv2d_kernel_larger_than_input() {
    let mut program = Program::new();
    let images = layers::data(&mut program, "pixel", &[1, 3, 3], DataType::Float32).unwrap();
    assert_err!(
        layers::conv2d(&mut program, &images, 2, &[5, 5], None),
        ProgramError::InvalidOperation(msg) if msg.contains("conv2d")
    );
    assert_eq!(program.var_count(), 1);
}

#[test]
fn test_pool2d() {
    let mut program = Program::new();
    let images = layers::data(&mut program, "pixel", &[2, 24, 24], DataType::Float32).unwrap();

    let max_pool = layers::pool2d(&mut program, &images, &Pool2dConfig::new(2).stride(2)).unwrap();
    assert_eq!(max_pool.shape().to_string(), "[?, 2, 12, 12]");

    let avg_pool = layers::pool2d(
        &mut program,
        &images,
        &Pool2dConfig::new(3).pool_type(PoolType::Avg).padding(1),
    )
    .unwrap();
    assert_eq!(avg_pool.shape().to_string(), "[?, 2, 24, 24]");

    let global =
        layers::pool2d(&mut program, &images, &Pool2dConfig::global(PoolType::Avg)).unwrap();
    assert_eq!(global.shape().to_string(), "[?, 2, 1, 1]");

    assert_eq!(program.ops_of_type("pool2d").len(), 3);
    assert!(program.ops()[2].to_string().contains("pool_type=avg"));
    assert!(program.ops()[2].to_string().contains("global=true"));
    assert!(program.parameters().is_empty());
}

#[test]
fn test_window_padding_overflow() {
    let mut program = Program::new();
    let images = layers::data(&mut program, "pixel", &[2, 8, 8], DataType::Float32).unwrap();

    let config = Conv2dConfig::new(2, &[3, 3]).padding((usize::MAX / 2 + 1, 0));
    assert_err!(
        layers::conv2d_with(&mut program, &images, &config),
        ProgramError::InvalidOperation(msg) if msg.contains("溢出")
    );
    assert_err!(
        layers::pool2d(&mut program, &images, &Pool2dConfig::new(2).padding(usize::MAX)),
        ProgramError::InvalidOperation(msg) if msg.contains("溢出")
    );
    assert_eq!(program.op_count(), 0);
    assert_eq!(program.var_count(), 1);
}
