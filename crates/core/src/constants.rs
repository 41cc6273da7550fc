//! 保留键与固定名称
//!
//! 模型 Map、会话属性中约定使用的键，以及文档中固定的标记值。

/// 首选模型对象键，存在时优先于调用方传入的根名称
pub const DEFAULT_MODEL_OBJECT: &str = "xweb.MODEL";

/// 参考数据对象键（即使带有 `xweb.` 前缀也会进入辅助块）
pub const REFERENCE_DATA_OBJECT: &str = "xweb.REF_DATA";

/// 请求级提示消息对象键
pub const ALERT_MESSAGES_OBJECT: &str = "xweb.ALERT";

/// 按对象名称分组的校验错误
pub const ERRORS_OBJECT: &str = "xweb.ERRORS";

/// 会话中保存的一次性提示消息
pub const SES_KEY_SAVED_MESSAGE: &str = "xweb.MSG";

/// 会话中保存的请求 URL
pub const SES_KEY_SAVED_URL: &str = "xweb.URL";

/// 会话中保存的用户区域设置
pub const SES_KEY_LOCALE: &str = "xweb.LOCALE";

/// 无模型时的占位参数
pub const NO_MODEL_KEY: &str = "no.model";
pub const NO_MODEL_VALUE: &str = "no model";

/// Xweb 文档命名空间
pub const XWEB_NAMESPACE: &str = "http://msqr.us/xsd/jaxb-web";

/// 需要查找字段显示名称的错误码
pub const ERROR_CODE_REQUIRED: &str = "error.required";

/// 类型转换失败错误码（不向用户展示）
pub const ERROR_CODE_TYPE_MISMATCH: &str = "typeMismatch";

/// 默认的框架内部键前缀，不进入辅助块
pub const DEFAULT_AUXILIARY_EXCLUDED_PREFIXES: &[&str] = &["xweb.", "framework."];
