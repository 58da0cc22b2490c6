//! # Layer Graph
//!
//! `layer_graph` 用于以层函数逐步构建神经网络的计算图描述（Program），
//! 并可为标量损失追加反向（梯度）子图。本库只产出图描述，不执行张量计算。
//!
//! ```
//! use layer_graph::layers;
//! use layer_graph::program::{DataType, Program};
//!
//! let mut program = Program::new();
//! let x = layers::data(&mut program, "x", &[13], DataType::Float32).unwrap();
//! let y_predict = layers::fc(&mut program, &x, 1, None).unwrap();
//! let y = layers::data(&mut program, "y", &[1], DataType::Float32).unwrap();
//! let cost = layers::square_error_cost(&mut program, &y_predict, &y).unwrap();
//! let avg_cost = layers::mean(&mut program, &cost).unwrap();
//! program.append_backward(&avg_cost).unwrap();
//! assert_eq!(program.op_count(), 6);
//! ```

pub mod errors;
pub mod layers;
pub mod nets;
pub mod program;
pub mod utils;

pub use errors::ProgramError;
