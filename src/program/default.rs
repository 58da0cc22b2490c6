/*
 * @Author       : 老董
 * @Date         : 2026-10-15
 * @Description  : 默认程序：仅在调用边界绑定的线程内便捷实例
 *
 * 核心 API 一律显式接收 `&mut Program`，从不读取这里的默认实例。
 */

use super::Program;
use crate::errors::ProgramError;
use std::cell::RefCell;

thread_local! {
    static DEFAULT_PROGRAM: RefCell<Program> = RefCell::new(Program::with_name("default_program"));
}

/// 在当前线程的默认程序上执行闭包
///
/// 嵌套调用（闭包内再次调用本函数）返回 `InvalidOperation`。
///
/// # 示例
/// ```
/// use layer_graph::layers;
/// use layer_graph::program::{reset_default_program, with_default_program, DataType};
///
/// with_default_program(|p| layers::data(p, "x", &[13], DataType::Float32)).unwrap();
/// let program = reset_default_program().unwrap();
/// assert!(program.has_var("x"));
/// ```
pub fn with_default_program<R, F>(f: F) -> Result<R, ProgramError>
where
    F: FnOnce(&mut Program) -> Result<R, ProgramError>,
{
    DEFAULT_PROGRAM.with(|cell| {
        let mut program = cell.try_borrow_mut().map_err(|_| {
            ProgramError::InvalidOperation("默认程序正在使用中，不能嵌套访问".to_string())
        })?;
        f(&mut program)
    })
}

/// 以新的空程序替换当前线程的默认程序，并返回旧程序
///
/// 在 `with_default_program` 的闭包内调用返回 `InvalidOperation`。
pub fn reset_default_program() -> Result<Program, ProgramError> {
    DEFAULT_PROGRAM.with(|cell| {
        let mut program = cell.try_borrow_mut().map_err(|_| {
            ProgramError::InvalidOperation("默认程序正在使用中，不能在访问期间重置".to_string())
        })?;
        Ok(std::mem::replace(
            &mut *program,
            Program::with_name("default_program"),
        ))
    })
}
