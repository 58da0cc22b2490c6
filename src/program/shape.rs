/*
 * @Author       : 老董
 * @Date         : 2026-10-12
 * @Description  : 变量形状：支持动态维度（如 batch 维）的形状描述
 *
 * 类似 Keras/TensorFlow 的 (None, 128) 设计，数据层声明的 batch 维在建图时未知，
 * 显示为 `?`。
 *
 * # 示例
 * ```
 * use layer_graph::program::DynamicShape;
 *
 * let fixed = DynamicShape::fixed(&[32, 128]);
 * assert_eq!(fixed.to_string(), "[32, 128]");
 *
 * let dynamic_batch = DynamicShape::with_dynamic_batch(&[13]);
 * assert_eq!(dynamic_batch.to_string(), "[?, 13]");
 * ```
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// 维度值：Some(n) 表示固定值 n，None 表示动态（任意值）
pub type Dim = Option<usize>;

/// 动态形状
///
/// 序列化为 `[null, 13]` 形式的数组，null 即动态维度。
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DynamicShape {
    dims: Vec<Dim>,
}

impl DynamicShape {
    /// 创建一个动态形状
    pub fn new(dims: &[Dim]) -> Self {
        Self {
            dims: dims.to_vec(),
        }
    }

    /// 从固定形状创建（所有维度都是确定的）
    pub fn fixed(dims: &[usize]) -> Self {
        Self {
            dims: dims.iter().map(|&d| Some(d)).collect(),
        }
    }

    /// 创建一个动态 batch 的形状：第一维是 None，其余维度固定
    ///
    /// # 示例
    /// ```
    /// use layer_graph::program::DynamicShape;
    ///
    /// let shape = DynamicShape::with_dynamic_batch(&[3, 48, 48]);
    /// assert_eq!(shape.to_string(), "[?, 3, 48, 48]");
    /// ```
    pub fn with_dynamic_batch(feature_dims: &[usize]) -> Self {
        let mut dims = vec![None];
        dims.extend(feature_dims.iter().map(|&d| Some(d)));
        Self { dims }
    }

    /// 标量形状 `[1]`（如 mean 的输出）
    pub fn scalar() -> Self {
        Self::fixed(&[1])
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// 获取指定维度的值，越界或动态时返回 None
    pub fn dim(&self, index: usize) -> Dim {
        self.dims.get(index).copied().flatten()
    }

    pub fn dims(&self) -> &[Dim] {
        &self.dims
    }

    pub fn is_dynamic(&self, index: usize) -> bool {
        self.dims.get(index).is_some_and(|d| d.is_none())
    }

    pub fn has_dynamic_dims(&self) -> bool {
        self.dims.iter().any(|d| d.is_none())
    }

    /// 元素总数；含动态维度时无法确定，返回 None
    pub fn numel(&self) -> Option<usize> {
        self.dims.iter().copied().product()
    }

    /// 从第 `start` 维起（含）的元素数，用于 fc 展平输入
    ///
    /// # 示例
    /// ```
    /// use layer_graph::program::DynamicShape;
    ///
    /// let shape = DynamicShape::with_dynamic_batch(&[4, 4, 4]);
    /// assert_eq!(shape.numel_from(1), Some(64));
    /// assert_eq!(shape.numel_from(0), None);
    /// ```
    pub fn numel_from(&self, start: usize) -> Option<usize> {
        self.dims.iter().skip(start).copied().product()
    }

    /// 是否为静态大小为 1 的形状（可作为损失）
    pub fn is_scalar(&self) -> bool {
        self.numel() == Some(1)
    }

    /// 检查此形状是否与另一个形状兼容
    ///
    /// 兼容规则：维度数量相同，且每个维度至少有一方是 None 或值相等。
    pub fn is_compatible(&self, other: &DynamicShape) -> bool {
        if self.dims.len() != other.dims.len() {
            return false;
        }
        self.dims
            .iter()
            .zip(other.dims.iter())
            .all(|(a, b)| match (a, b) {
                (None, _) | (_, None) => true,
                (Some(x), Some(y)) => x == y,
            })
    }

    /// 除 `axis` 外其余维度是否兼容（concat 用）
    pub fn is_compatible_except(&self, other: &DynamicShape, axis: usize) -> bool {
        if self.dims.len() != other.dims.len() {
            return false;
        }
        self.dims
            .iter()
            .zip(other.dims.iter())
            .enumerate()
            .filter(|(i, _)| *i != axis)
            .all(|(_, (a, b))| match (a, b) {
                (None, _) | (_, None) => true,
                (Some(x), Some(y)) => x == y,
            })
    }

    /// 合并两个形状，取更具体的值；不兼容时返回 None
    pub fn merge(&self, other: &DynamicShape) -> Option<DynamicShape> {
        if self.dims.len() != other.dims.len() {
            return None;
        }

        let merged: Option<Vec<Dim>> = self
            .dims
            .iter()
            .zip(other.dims.iter())
            .map(|(a, b)| match (a, b) {
                (None, None) => Some(None),
                (Some(x), None) | (None, Some(x)) => Some(Some(*x)),
                (Some(x), Some(y)) => (x == y).then_some(Some(*x)),
            })
            .collect();

        merged.map(|dims| DynamicShape { dims })
    }

    /// 替换第 `index` 维，返回新形状
    pub fn with_dim(&self, index: usize, dim: Dim) -> DynamicShape {
        let mut dims = self.dims.clone();
        if let Some(d) = dims.get_mut(index) {
            *d = dim;
        }
        DynamicShape { dims }
    }

    /// 转换为用于显示的字符串（动态维度显示为 ?）
    pub fn to_display_string(&self) -> String {
        let parts: Vec<String> = self
            .dims
            .iter()
            .map(|d| match d {
                Some(n) => n.to_string(),
                None => "?".to_string(),
            })
            .collect();
        format!("[{}]", parts.join(", "))
    }
}

impl fmt::Display for DynamicShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}
