//! 消息参数格式化
//!
//! `{0}`、`{1}` 占位符替换为参数；单引号内的文本原样输出，`''` 输出一个单引号。

/// 格式化消息
///
/// 没有参数时原样返回模式串（不处理引号）。
pub fn format_message(pattern: &str, args: &[String]) -> String {
    if args.is_empty() {
        return pattern.to_string();
    }

    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    let mut quoted = false;

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    out.push('\'');
                } else {
                    quoted = !quoted;
                }
            }
            '{' if !quoted => {
                let mut placeholder = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == '}' {
                        closed = true;
                        break;
                    }
                    placeholder.push(next);
                }
                let index = placeholder
                    .split(',')
                    .next()
                    .and_then(|i| i.trim().parse::<usize>().ok());
                match (closed, index.and_then(|i| args.get(i))) {
                    (true, Some(arg)) => out.push_str(arg),
                    _ => {
                        out.push('{');
                        out.push_str(&placeholder);
                        if closed {
                            out.push('}');
                        }
                    }
                }
            }
            _ => out.push(c),
        }
    }
    out
}
