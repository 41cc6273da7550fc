//! Xweb 消息 crate
//!
//! 本地化消息目录与错误投影
//!
//! ## 模块结构
//!
//! - `format` - `{0}` 占位符参数格式化
//! - `properties` - properties 资源包解析
//! - `projection` - 校验错误与提示消息解析为文档条目
//! - `source` - 消息目录接口与资源包实现

mod format;
mod properties;
mod projection;
mod source;

// 重新导出
pub use format::format_message;
pub use properties::parse_properties;
pub use projection::{project_error, resolve_alert, resolve_message};
pub use source::{BundleMessagesSource, MessagesError, MessagesSource};
