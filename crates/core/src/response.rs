//! 视图响应

/// 渲染结果：内容类型与响应体
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewResponse {
    pub content_type: String,
    pub character_encoding: String,
    pub body: Vec<u8>,
}

impl ViewResponse {
    pub fn new(content_type: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            content_type: content_type.into(),
            character_encoding: "UTF-8".to_string(),
            body,
        }
    }

    /// `Content-Type` 头的值，已含 charset 时不重复追加
    pub fn content_type_header(&self) -> String {
        if self.content_type.to_ascii_lowercase().contains("charset=") {
            self.content_type.clone()
        } else {
            format!("{};charset={}", self.content_type, self.character_encoding)
        }
    }

    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// 重定向结果：状态码与目标地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectResponse {
    pub status: u16,
    pub location: String,
}

impl RedirectResponse {
    /// 302，HTTP/1.0 客户端也能识别
    pub fn found(location: impl Into<String>) -> Self {
        Self {
            status: 302,
            location: location.into(),
        }
    }

    /// 303，POST 之后改用 GET 获取目标
    pub fn see_other(location: impl Into<String>) -> Self {
        Self {
            status: 303,
            location: location.into(),
        }
    }
}
