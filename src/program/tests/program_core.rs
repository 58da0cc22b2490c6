use crate::assert_err;
use crate::errors::ProgramError;
use crate::layers::{self, FcConfig};
use crate::program::{
    DataType, DynamicShape, Initializer, OpKind, OutputSpec, ParamAttr, Program, VarRole,
};

#[test]
fn test_program_creation() {
    let program = Program::new();
    assert_eq!(program.name(), "main_program");
    assert_eq!(program.op_count(), 0);
    assert_eq!(program.var_count(), 0);
    assert!(program.backward_loss().is_none());

    let named = Program::with_name("custom_program");
    assert_eq!(named.name(), "custom_program");
    // 每个程序的 ID 进程内唯一
    assert_ne!(program.id(), named.id());
}

#[test]
fn test_create_variable_idempotent_and_conflict() {
    let mut program = Program::new();
    let shape = DynamicShape::with_dynamic_batch(&[13]);

    // 1. 同名同形状同类型：幂等
    let first = program
        .create_variable("x", shape.clone(), DataType::Float32, VarRole::Input)
        .unwrap();
    let again = program
        .create_variable("x", shape.clone(), DataType::Float32, VarRole::Input)
        .unwrap();
    assert_eq!(first, again);
    assert_eq!(program.var_count(), 1);

    // 2. 形状冲突
    assert_err!(
        program.create_variable(
            "x",
            DynamicShape::with_dynamic_batch(&[14]),
            DataType::Float32,
            VarRole::Input
        ),
        ProgramError::NameConflict { name, .. } if name == "x"
    );

    // 3. 类型冲突
    assert_err!(
        program.create_variable("x", shape, DataType::Int32, VarRole::Input),
        ProgramError::NameConflict { .. }
    );
    assert_eq!(program.var_count(), 1);

    // 4. 空名
    assert_err!(
        program.create_variable("", DynamicShape::scalar(), DataType::Float32, VarRole::Input),
        ProgramError::InvalidOperation("变量名不能为空")
    );
}

#[test]
fn test_handle_lookup() {
    let mut program = Program::new();
    let x = layers::data(&mut program, "x", &[13], DataType::Float32).unwrap();

    assert_eq!(program.handle("x").unwrap(), x);
    assert_eq!(x.program_id(), program.id());
    assert_eq!(program.resolve(&x).unwrap().role, VarRole::Input);
    assert!(program.resolve(&x).unwrap().stop_gradient);
    assert_err!(program.handle("ghost"), ProgramError::VariableNotFound("ghost"));
}

#[test]
fn test_append_operator_rejects_foreign_handle() {
    let mut program1 = Program::new();
    let mut program2 = Program::new();
    let x = layers::data(&mut program1, "x", &[13], DataType::Float32).unwrap();
    // program2 中存在同名变量也不行：句柄归属由程序 ID 决定
    layers::data(&mut program2, "x", &[13], DataType::Float32).unwrap();

    let result = program2.append_operator(
        OpKind::Mean,
        &[("X", &[&x])],
        &[OutputSpec::new("Out", DynamicShape::scalar(), DataType::Float32)],
    );
    let (owner, target) = (program1.id(), program2.id());
    assert_err!(
        result,
        ProgramError::ForeignHandle { owner: o, target: t, .. } if *o == owner && *t == target
    );
    assert_eq!(program2.op_count(), 0);
    assert_eq!(program2.var_count(), 1);

    // 层函数同样拒绝
    assert_err!(
        layers::fc(&mut program2, &x, 1, None),
        ProgramError::ForeignHandle { .. }
    );
    assert_eq!(program2.op_count(), 0);
    assert_eq!(program2.var_count(), 1);
}

#[test]
fn test_append_operator_does_not_deduplicate() {
    let mut program = Program::new();
    let x = layers::data(&mut program, "x", &[13], DataType::Float32).unwrap();
    let spec = [OutputSpec::new("Out", DynamicShape::scalar(), DataType::Float32)];

    let out1 = program
        .append_operator(OpKind::Mean, &[("X", &[&x])], &spec)
        .unwrap();
    let out2 = program
        .append_operator(OpKind::Mean, &[("X", &[&x])], &spec)
        .unwrap();

    assert_eq!(program.op_count(), 2);
    assert_eq!(out1[0].name(), "mean_0.tmp_0");
    assert_eq!(out2[0].name(), "mean_1.tmp_0");
    assert_eq!(program.ops()[0].index, 0);
    assert_eq!(program.ops()[1].index, 1);
    assert_eq!(program.ops()[1].input("X").unwrap(), ["x".to_string()]);
    assert_eq!(program.var("mean_1.tmp_0").unwrap().role, VarRole::Output);
}

#[test]
fn test_append_operator_output_must_be_fresh() {
    let mut program = Program::new();
    let x = layers::data(&mut program, "x", &[13], DataType::Float32).unwrap();
    let spec = [
        OutputSpec::new("Out", DynamicShape::scalar(), DataType::Float32).named("x".to_string()),
    ];

    assert_err!(
        program.append_operator(OpKind::Mean, &[("X", &[&x])], &spec),
        ProgramError::NameConflict { name, .. } if name == "x"
    );
    assert_eq!(program.op_count(), 0);
    assert_eq!(program.var_count(), 1);
}

#[test]
fn test_op_count_grows_monotonically() {
    let mut program = Program::new();
    let images = layers::data(&mut program, "pixel", &[784], DataType::Float32).unwrap();
    let label = layers::data(&mut program, "label", &[1], DataType::Int32).unwrap();
    assert_eq!(program.op_count(), 0);

    let hidden1 = layers::fc(&mut program, &images, 128, Some("relu")).unwrap();
    assert_eq!(program.op_count(), 1);
    let first_op = program.ops()[0].clone();

    let hidden2 = layers::fc(&mut program, &hidden1, 64, Some("relu")).unwrap();
    let predict = layers::fc(&mut program, &hidden2, 10, Some("softmax")).unwrap();
    assert_eq!(program.op_count(), 3);

    let cost = layers::cross_entropy(&mut program, &predict, &label).unwrap();
    let avg_cost = layers::mean(&mut program, &cost).unwrap();
    assert_eq!(program.op_count(), 5);
    assert_eq!(avg_cost.shape(), &DynamicShape::scalar());

    // 先前追加的算子不会被后续调用修改
    assert_eq!(program.ops()[0], first_op);
}

#[test]
fn test_atomic_rolls_back_vars_ops_and_counters() {
    let mut program = Program::new();
    let x = layers::data(&mut program, "x", &[13], DataType::Float32).unwrap();

    // 权重名与数据变量冲突：fc 已生成前缀并创建了部分参数后才失败
    let config = FcConfig::new(1).bias_attr(ParamAttr::named("x"));
    assert_err!(
        layers::fc_with(&mut program, &x, &config),
        ProgramError::NameConflict { name, .. } if name == "x"
    );
    assert_eq!(program.op_count(), 0);
    assert_eq!(program.var_count(), 1);
    assert!(!program.has_var("fc_0.w_0"));

    // 名称计数也已回滚
    let out = layers::fc(&mut program, &x, 1, None).unwrap();
    assert_eq!(out.name(), "fc_0.tmp_0");
}

#[test]
fn test_create_parameter_sharing_and_conflicts() {
    let mut program = Program::new();
    layers::data(&mut program, "x", &[4], DataType::Float32).unwrap();
    let shape = DynamicShape::fixed(&[4, 2]);
    let f32_ty = DataType::Float32;
    let default_init = Initializer::default_weight();
    let attr = ParamAttr::named("w")
        .with_initializer(Initializer::Gaussian { mean: 0.0, std: 0.1 });

    let w1 = program
        .create_parameter(&attr, "fc_0.w_0", shape.clone(), f32_ty, default_init)
        .unwrap();
    let w2 = program
        .create_parameter(&ParamAttr::named("w"), "fc_1.w_0", shape.clone(), f32_ty, default_init)
        .unwrap();
    assert_eq!(w1, w2);
    assert_eq!(program.parameters().len(), 1);
    assert_eq!(
        program.var("w").unwrap().initializer,
        Some(Initializer::Gaussian { mean: 0.0, std: 0.1 })
    );

    // 与非参数变量同名
    assert_err!(
        program.create_parameter(&ParamAttr::named("x"), "p", shape.clone(), f32_ty, default_init),
        ProgramError::NameConflict { .. }
    );
    // 共享时形状不一致
    let wider = DynamicShape::fixed(&[4, 3]);
    assert_err!(
        program.create_parameter(&ParamAttr::named("w"), "p", wider, f32_ty, default_init),
        ProgramError::NameConflict { .. }
    );
    // 非法初始化范围
    let bad = ParamAttr::new().with_initializer(Initializer::UniformRandom { min: 1.0, max: -1.0 });
    assert_err!(
        program.create_parameter(&bad, "p", shape, f32_ty, default_init),
        ProgramError::InvalidOperation(msg) if msg.contains("min")
    );
    // 动态形状参数
    let dynamic = DynamicShape::with_dynamic_batch(&[2]);
    assert_err!(
        program.create_parameter(&ParamAttr::new(), "q", dynamic, f32_ty, default_init),
        ProgramError::InvalidOperation(_)
    );
    assert_eq!(program.parameters().len(), 1);
}

#[test]
fn test_unique_name_counters() {
    let mut program = Program::new();
    assert_eq!(program.unique_name("fc"), "fc_0");
    assert_eq!(program.unique_name("fc"), "fc_1");
    assert_eq!(program.unique_name("conv2d"), "conv2d_0");
}
