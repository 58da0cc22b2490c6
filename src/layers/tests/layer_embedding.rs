use crate::assert_err;
use crate::errors::ProgramError;
use crate::layers;
use crate::program::{DataType, DynamicShape, Initializer, ParamAttr, Program};

#[test]
fn test_embedding_shares_table_across_calls() {
    let mut program = Program::new();
    let attr = ParamAttr::named("shared_w")
        .with_initializer(Initializer::UniformRandom { min: -0.5, max: 0.5 });

    let mut outputs = Vec::new();
    for name in ["firstw", "secondw", "thirdw", "forthw"] {
        let ids = layers::data(&mut program, name, &[1], DataType::Int64).unwrap();
        let embed = layers::embedding(&mut program, &ids, [2073, 32], DataType::Float32, &attr);
        outputs.push(embed.unwrap());
    }

    // 四次调用只有一个嵌入表
    assert_eq!(program.parameters().len(), 1);
    assert_eq!(program.ops_of_type("lookup_table").len(), 4);
    for op in program.ops_of_type("lookup_table") {
        assert_eq!(op.input("W").unwrap(), ["shared_w".to_string()]);
    }
    let table = program.var("shared_w").unwrap();
    assert_eq!(table.shape, DynamicShape::fixed(&[2073, 32]));
    assert_eq!(
        table.initializer,
        Some(Initializer::UniformRandom { min: -0.5, max: 0.5 })
    );

    // 各输出名称互不相同
    let names: Vec<_> = outputs.iter().map(|o| o.name().to_string()).collect();
    assert_eq!(
        names,
        [
            "embedding_0.tmp_0",
            "embedding_1.tmp_0",
            "embedding_2.tmp_0",
            "embedding_3.tmp_0"
        ]
    );
    assert!(outputs.iter().all(|o| o.shape().to_string() == "[?, 32]"));
}

#[test]
fn test_embedding_without_name_creates_separate_tables() {
    let mut program = Program::new();
    let ids = layers::data(&mut program, "ids", &[1], DataType::Int64).unwrap();
    layers::embedding(&mut program, &ids, [10, 4], DataType::Float32, &ParamAttr::new()).unwrap();
    layers::embedding(&mut program, &ids, [10, 4], DataType::Float32, &ParamAttr::new()).unwrap();

    assert!(program.has_var("embedding_0.w_0"));
    assert!(program.has_var("embedding_1.w_0"));
    assert_eq!(program.parameters().len(), 2);
}

#[test]
fn test_embedding_shared_table_shape_conflict() {
    let mut program = Program::new();
    let ids = layers::data(&mut program, "ids", &[1], DataType::Int64).unwrap();
    let attr = ParamAttr::named("shared_w");
    layers::embedding(&mut program, &ids, [100, 8], DataType::Float32, &attr).unwrap();

    assert_err!(
        layers::embedding(&mut program, &ids, [100, 16], DataType::Float32, &attr),
        ProgramError::NameConflict { name, .. } if name == "shared_w"
    );
    assert_eq!(program.op_count(), 1);
}

#[test]
fn test_embedding_input_checks() {
    let mut program = Program::new();
    let float_ids = layers::data(&mut program, "f", &[1], DataType::Float32).unwrap();
    assert_err!(
        layers::embedding(&mut program, &float_ids, [10, 4], DataType::Float32, &ParamAttr::new()),
        ProgramError::DataTypeMismatch { got: DataType::Float32, .. }
    );

    let wide_ids = layers::data(&mut program, "w", &[3], DataType::Int64).unwrap();
    assert_err!(
        layers::embedding(&mut program, &wide_ids, [10, 4], DataType::Float32, &ParamAttr::new()),
        ProgramError::ShapeMismatch { .. }
    );

    let ids = layers::data(&mut program, "ids", &[1], DataType::Int32).unwrap();
    assert_err!(
        layers::embedding(&mut program, &ids, [0, 4], DataType::Float32, &ParamAttr::new()),
        ProgramError::InvalidOperation(_)
    );
    assert_eq!(program.op_count(), 0);
    assert!(program.parameters().is_empty());
}
