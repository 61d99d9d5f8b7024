//! Locale-aware message and label catalog.
//!
//! Schemas resolve their error text through a [`LocaleContext`] when they are
//! built, so switching locale changes wording but never schema structure.

use certloom_types::Locale;

/// Built-in validation messages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message<'a> {
    Required,
    InvalidType { expected: &'a str },
    TooShort { min: usize },
    TooLong { max: usize },
    InvalidEnum { options: &'a [String] },
    InvalidUrl,
    InvalidHostname,
    PatternMismatch,
    NotInteger,
    TooSmall { min: f64 },
    TooBig { max: f64 },
    TooFewItems { min: usize },
    /// A `Name: value` header line without a name or colon; `line` is 1-based.
    InvalidHeaderLine { line: usize },
    WildcardDomainExpected,
}

/// Label table: `(key, en-US, zh-CN)`.
const LABELS: &[(&str, &str, &str)] = &[
    ("provider", "provider", "提供商"),
    ("credential", "credential", "授权凭证"),
    ("name", "name", "名称"),
    ("webhook.url", "webhook URL", "Webhook 回调地址"),
    ("webhook.method", "HTTP method", "HTTP 请求方法"),
    ("webhook.headers", "HTTP headers", "HTTP 请求头"),
    ("webhook.allow_insecure", "insecure SSL/TLS connections", "不安全的 SSL/TLS 连接"),
    ("webhook.payload_template", "message body template", "消息体模板"),
    ("ssh.host", "SSH host", "SSH 主机地址"),
    ("ssh.port", "SSH port", "SSH 端口"),
    ("ssh.username", "SSH username", "SSH 用户名"),
    ("ssh.auth_method", "authentication method", "认证方式"),
    ("ssh.password", "SSH password", "SSH 登录密码"),
    ("ssh.key", "SSH private key", "SSH 私钥"),
    ("ssh.key_passphrase", "private key passphrase", "私钥口令"),
    ("ssh.jump_servers", "jump servers", "跳板机"),
    ("local.format", "file format", "文件格式"),
    ("local.cert_path", "certificate file path", "证书文件路径"),
    ("local.key_path", "private key file path", "私钥文件路径"),
    ("local.pfx_password", "PFX password", "PFX 密码"),
    ("local.pre_command", "pre-deployment command", "前置命令"),
    ("local.post_command", "post-deployment command", "后置命令"),
    ("aliyun_cdn.resource_type", "resource type", "替换方式"),
    ("aliyun_cdn.domain_match_pattern", "domain match pattern", "域名匹配模式"),
    ("aliyun_cdn.domain", "CDN domain", "CDN 加速域名"),
    ("aliyun_cdn.certificate_id", "certificate ID", "证书 ID"),
    ("telegram.bot_token", "bot token", "机器人 Token"),
    ("telegram.chat_id", "chat ID", "会话 ID"),
];

/// Resolves message keys and labels for one locale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LocaleContext {
    locale: Locale,
}

impl LocaleContext {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Returns the label for `key`, or the key itself when it is not in the table.
    pub fn label(&self, key: &str) -> String {
        LABELS
            .iter()
            .find(|(candidate, _, _)| *candidate == key)
            .map(|(_, english, chinese)| match self.locale {
                Locale::EnUs => (*english).to_string(),
                Locale::ZhCn => (*chinese).to_string(),
            })
            .unwrap_or_else(|| key.to_string())
    }

    /// "Please enter ..." prompt used as the required message of free-text fields.
    pub fn please_enter(&self, label_key: &str) -> String {
        let label = self.label(label_key);
        match self.locale {
            Locale::EnUs => format!("Please enter {label}"),
            Locale::ZhCn => format!("请输入{label}"),
        }
    }

    /// "Please select ..." prompt used as the required message of choice fields.
    pub fn please_select(&self, label_key: &str) -> String {
        let label = self.label(label_key);
        match self.locale {
            Locale::EnUs => format!("Please select {label}"),
            Locale::ZhCn => format!("请选择{label}"),
        }
    }

    pub fn message(&self, message: Message<'_>) -> String {
        match self.locale {
            Locale::EnUs => english(message),
            Locale::ZhCn => chinese(message),
        }
    }
}

fn english(message: Message<'_>) -> String {
    match message {
        Message::Required => "This field is required".to_string(),
        Message::InvalidType { expected } => format!("Expected {expected}"),
        Message::TooShort { min } => format!("Must be at least {min} characters"),
        Message::TooLong { max } => format!("Must be at most {max} characters"),
        Message::InvalidEnum { options } => format!("Must be one of: {}", options.join(", ")),
        Message::InvalidUrl => "Please enter a valid URL".to_string(),
        Message::InvalidHostname => "Please enter a valid host name or IP address".to_string(),
        Message::PatternMismatch => "Value has an invalid format".to_string(),
        Message::NotInteger => "Must be a whole number".to_string(),
        Message::TooSmall { min } => format!("Must be greater than or equal to {min}"),
        Message::TooBig { max } => format!("Must be less than or equal to {max}"),
        Message::TooFewItems { min } => format!("Must contain at least {min} items"),
        Message::InvalidHeaderLine { line } => format!("Line {line} must look like `Name: value`"),
        Message::WildcardDomainExpected => "Please enter a wildcard domain such as *.example.com".to_string(),
    }
}

fn chinese(message: Message<'_>) -> String {
    match message {
        Message::Required => "此项为必填项".to_string(),
        Message::InvalidType { expected } => format!("类型错误，应为 {expected}"),
        Message::TooShort { min } => format!("长度不能少于 {min} 个字符"),
        Message::TooLong { max } => format!("长度不能超过 {max} 个字符"),
        Message::InvalidEnum { options } => format!("取值必须为以下之一：{}", options.join(", ")),
        Message::InvalidUrl => "请输入正确的 URL".to_string(),
        Message::InvalidHostname => "请输入正确的主机名或 IP 地址".to_string(),
        Message::PatternMismatch => "格式不正确".to_string(),
        Message::NotInteger => "必须为整数".to_string(),
        Message::TooSmall { min } => format!("不能小于 {min}"),
        Message::TooBig { max } => format!("不能大于 {max}"),
        Message::TooFewItems { min } => format!("至少需要 {min} 项"),
        Message::InvalidHeaderLine { line } => format!("第 {line} 行格式应为 `Name: value`"),
        Message::WildcardDomainExpected => "请输入泛域名，例如 *.example.com".to_string(),
    }
}
