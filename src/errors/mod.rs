/*
 * @Author       : 老董
 * @Date         : 2026-10-12
 * @Description  : Program 构建期的错误类型
 *
 * 所有错误均为构建期校验失败：立即返回给调用方，且触发错误的调用不会在 Program 中留下任何痕迹。
 */

use crate::program::{DataType, DynamicShape, ProgramId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProgramError {
    #[error("变量`{name}`已声明为{existing}，无法重新声明为{requested}")]
    NameConflict {
        name: String,
        existing: String,
        requested: String,
    },
    #[error("变量`{name}`属于{owner}，不能用于{target}")]
    ForeignHandle {
        name: String,
        owner: ProgramId,
        target: ProgramId,
    },
    #[error("变量`{0}`不存在")]
    VariableNotFound(String),
    #[error("反向传播要求损失为标量，但`{name}`的形状为{shape}")]
    NonScalarLoss { name: String, shape: DynamicShape },
    #[error("未知的激活函数`{0}`")]
    UnknownActivation(String),
    #[error("未知的数据类型`{0}`")]
    UnknownDataType(String),
    #[error("卷积核尺寸须为2个正整数，实际得到{0:?}")]
    InvalidFilterSize(Vec<usize>),
    #[error("形状不匹配：预期{expected}，实际{got}。{message}")]
    ShapeMismatch {
        expected: DynamicShape,
        got: DynamicShape,
        message: String,
    },
    #[error("维度数不匹配：预期{expected}维，实际{got}维。{message}")]
    DimensionMismatch {
        expected: usize,
        got: usize,
        message: String,
    },
    #[error("数据类型不匹配：预期{expected}，实际{got}。{message}")]
    DataTypeMismatch {
        expected: DataType,
        got: DataType,
        message: String,
    },
    #[error("程序已对损失`{0}`追加过反向传播")]
    AlreadyDifferentiated(String),
    #[error("{0}")]
    InvalidOperation(String),
    #[error("描述符（反）序列化失败：{0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ProgramError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
